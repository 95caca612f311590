// ABOUTME: Task records and the TaskStore trait for persisting background runs,
// ABOUTME: with an in-memory store for tests and single-process deployments.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::coordinator::WorkflowKind;
use crate::dispatch::DispatchOutcome;

/// Lifecycle of a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Completed or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One timestamped progress report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub percent: u8,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn now(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Everything a polling client can see about a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub user_id: String,
    pub kind: WorkflowKind,
    pub status: TaskStatus,
    /// Latest reported percent.
    pub progress: u8,
    pub events: Vec<ProgressEvent>,
    pub outcome: Option<DispatchOutcome>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// A fresh pending record with a new id.
    pub fn new(user_id: impl Into<String>, kind: WorkflowKind) -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            kind,
            status: TaskStatus::Pending,
            progress: 0,
            events: Vec::new(),
            outcome: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Storage for task records.
///
/// Implement this trait to keep tasks somewhere other than memory
/// (a database, a cache shared between processes).
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert or replace a record.
    async fn save(&self, record: &TaskRecord) -> Result<(), anyhow::Error>;

    /// Load a record. Returns None for unknown ids.
    async fn load(&self, task_id: &str) -> Result<Option<TaskRecord>, anyhow::Error>;

    /// Append a progress event and update the record's percent.
    async fn append_event(&self, task_id: &str, event: ProgressEvent)
    -> Result<(), anyhow::Error>;

    async fn delete(&self, task_id: &str) -> Result<(), anyhow::Error>;

    /// Ids of every stored task.
    async fn list(&self) -> Result<Vec<String>, anyhow::Error>;
}

/// In-memory task store.
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<String, TaskRecord>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new store wrapped in Arc for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn save(&self, record: &TaskRecord) -> Result<(), anyhow::Error> {
        self.tasks
            .write()
            .await
            .insert(record.task_id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, task_id: &str) -> Result<Option<TaskRecord>, anyhow::Error> {
        Ok(self.tasks.read().await.get(task_id).cloned())
    }

    async fn append_event(
        &self,
        task_id: &str,
        event: ProgressEvent,
    ) -> Result<(), anyhow::Error> {
        let mut tasks = self.tasks.write().await;
        let record = tasks
            .get_mut(task_id)
            .ok_or_else(|| anyhow!("unknown task '{}'", task_id))?;
        record.progress = event.percent;
        record.events.push(event);
        Ok(())
    }

    async fn delete(&self, task_id: &str) -> Result<(), anyhow::Error> {
        self.tasks.write().await.remove(task_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, anyhow::Error> {
        Ok(self.tasks.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_and_terminal() {
        assert_eq!(TaskStatus::Pending.to_string(), "pending");
        assert_eq!(TaskStatus::Failed.to_string(), "failed");
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
    }

    #[tokio::test]
    async fn test_memory_store_save_load() {
        let store = MemoryTaskStore::new();
        let record = TaskRecord::new("u1", WorkflowKind::MultiFactor);

        store.save(&record).await.unwrap();

        let loaded = store.load(&record.task_id).await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(store.load("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_event_updates_progress() {
        let store = MemoryTaskStore::new();
        let record = TaskRecord::new("u1", WorkflowKind::Screening);
        store.save(&record).await.unwrap();

        store
            .append_event(&record.task_id, ProgressEvent::now(10, "Screening candidates"))
            .await
            .unwrap();
        store
            .append_event(&record.task_id, ProgressEvent::now(60, "Analyzing"))
            .await
            .unwrap();

        let loaded = store.load(&record.task_id).await.unwrap().unwrap();
        assert_eq!(loaded.progress, 60);
        assert_eq!(loaded.events.len(), 2);
        assert!(loaded.events[0].at <= loaded.events[1].at);
    }

    #[tokio::test]
    async fn test_append_event_unknown_task() {
        let store = MemoryTaskStore::new();
        let err = store
            .append_event("missing", ProgressEvent::now(10, "x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_memory_store_delete_and_list() {
        let store = MemoryTaskStore::new();
        let a = TaskRecord::new("u1", WorkflowKind::MultiFactor);
        let b = TaskRecord::new("u2", WorkflowKind::MultiFactor);
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        store.delete(&a.task_id).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec![b.task_id.clone()]);
    }
}
