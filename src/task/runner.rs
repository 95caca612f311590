// ABOUTME: TaskRunner - runs dispatches on spawned tokio tasks, persisting a
// ABOUTME: progress log and terminal status that clients poll or wait on.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::store::{ProgressEvent, TaskRecord, TaskStatus, TaskStore};
use crate::coordinator::ProgressSink;
use crate::dispatch::{DispatchOutcome, DispatchRequest, Dispatcher};
use crate::error::TaskError;

/// Runs report requests in the background.
///
/// `submit` returns as soon as the task is recorded. The dispatch runs on
/// its own tokio task; a panic there marks the task failed instead of
/// leaving it running forever.
#[derive(Clone)]
pub struct TaskRunner {
    dispatcher: Dispatcher,
    store: Arc<dyn TaskStore>,
    /// Wakers for tasks still in flight, removed on completion.
    waiters: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
}

impl TaskRunner {
    pub fn new(dispatcher: Dispatcher, store: Arc<dyn TaskStore>) -> Self {
        Self {
            dispatcher,
            store,
            waiters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Record a pending task, start it, and return its id.
    pub async fn submit(&self, request: DispatchRequest) -> Result<String, TaskError> {
        let record = TaskRecord::new(request.user_id.clone(), request.kind);
        let task_id = record.task_id.clone();
        self.store.save(&record).await?;

        let notify = Arc::new(Notify::new());
        if let Ok(mut waiters) = self.waiters.lock() {
            waiters.insert(task_id.clone(), Arc::clone(&notify));
        }

        tracing::info!(%task_id, user_id = %request.user_id, kind = %request.kind, "task submitted");

        let runner = self.clone();
        let id = task_id.clone();
        tokio::spawn(async move {
            runner.run(id, record, request, notify).await;
        });

        Ok(task_id)
    }

    /// Current record for a task, if it exists.
    pub async fn status(&self, task_id: &str) -> Result<Option<TaskRecord>, TaskError> {
        Ok(self.store.load(task_id).await?)
    }

    /// Wait until the task reaches a terminal status or `timeout` passes.
    pub async fn wait(&self, task_id: &str, timeout: Duration) -> Result<TaskRecord, TaskError> {
        let deadline = Instant::now() + timeout;
        loop {
            let notify = self
                .waiters
                .lock()
                .ok()
                .and_then(|waiters| waiters.get(task_id).cloned())
                .unwrap_or_default();
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let record = self
                .store
                .load(task_id)
                .await?
                .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
            if record.status.is_terminal() {
                return Ok(record);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(TaskError::Timeout {
                    task_id: task_id.to_string(),
                    timeout_ms: timeout.as_millis(),
                });
            }
        }
    }

    async fn run(
        &self,
        task_id: String,
        mut record: TaskRecord,
        request: DispatchRequest,
        notify: Arc<Notify>,
    ) {
        record.status = TaskStatus::Running;
        if let Err(err) = self.store.save(&record).await {
            tracing::warn!(%task_id, error = %err, "failed to mark task running");
        }

        let sink = StoreProgress {
            store: Arc::clone(&self.store),
            task_id: task_id.clone(),
        };
        let dispatched = AssertUnwindSafe(self.dispatcher.dispatch(request, &sink))
            .catch_unwind()
            .await;

        // Reload so the progress log written by the sink is kept.
        let mut record = match self.store.load(&task_id).await {
            Ok(Some(latest)) => latest,
            _ => record,
        };
        match dispatched {
            Ok(outcome) => settle(&mut record, outcome),
            Err(_) => {
                record.status = TaskStatus::Failed;
                record.error = Some("task panicked".to_string());
            }
        }
        record.finished_at = Some(Utc::now());

        match record.status {
            TaskStatus::Completed => tracing::info!(%task_id, "task completed"),
            _ => tracing::warn!(%task_id, error = record.error.as_deref().unwrap_or_default(), "task failed"),
        }
        if let Err(err) = self.store.save(&record).await {
            tracing::warn!(%task_id, error = %err, "failed to persist finished task");
        }

        if let Ok(mut waiters) = self.waiters.lock() {
            waiters.remove(&task_id);
        }
        notify.notify_waiters();
    }
}

/// Terminal status from a dispatch outcome. A degraded outcome still
/// completes; only an outcome whose producing path failed is a failure.
fn settle(record: &mut TaskRecord, outcome: DispatchOutcome) {
    if outcome.is_success() {
        record.status = TaskStatus::Completed;
    } else {
        record.status = TaskStatus::Failed;
        record.error = Some(
            outcome
                .error()
                .unwrap_or("no result was produced")
                .to_string(),
        );
    }
    record.outcome = Some(outcome);
}

/// Writes workflow progress into the task's event log.
struct StoreProgress {
    store: Arc<dyn TaskStore>,
    task_id: String,
}

#[async_trait]
impl ProgressSink for StoreProgress {
    async fn on_progress(&self, percent: u8, message: &str) {
        let event = ProgressEvent::now(percent, message);
        if let Err(err) = self.store.append_event(&self.task_id, event).await {
            tracing::warn!(task_id = %self.task_id, error = %err, "failed to record progress");
        }
    }
}
