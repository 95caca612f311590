// ABOUTME: Dispatcher - picks the multi-agent workflow or the single-agent advisory
// ABOUTME: path from the user's quota, one request per user at a time, and charges afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use super::quota::QuotaAccessor;
use crate::agent::{AgentResult, Category, Data, ExecutionContext};
use crate::coordinator::{Coordinator, ProgressSink, WorkflowKind, WorkflowRequest, WorkflowResult};

/// Metadata key naming the path that produced the output.
pub const MODE_KEY: &str = "mode";
/// Metadata key present whenever the request was degraded.
pub const FALLBACK_REASON_KEY: &str = "fallback_reason";
/// Metadata key present when charging the user failed.
pub const CHARGE_ERROR_KEY: &str = "charge_error";

/// Units charged per execution path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostSchedule {
    pub multi_agent: u64,
    pub single_agent: u64,
}

impl Default for CostSchedule {
    fn default() -> Self {
        Self {
            multi_agent: 5,
            single_agent: 1,
        }
    }
}

/// Which path served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    MultiAgent,
    SingleAgent,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::MultiAgent => "multi_agent",
            ExecutionMode::SingleAgent => "single_agent",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request was served by the single-agent path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Remaining quota is below the multi-agent cost.
    InsufficientQuota,
    /// The quota accessor could not be queried.
    QuotaUnavailable,
    /// The workflow ran but its terminal agent failed.
    WorkflowFailed,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::InsufficientQuota => "insufficient_quota",
            FallbackReason::QuotaUnavailable => "quota_unavailable",
            FallbackReason::WorkflowFailed => "workflow_failed",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    pub costs: CostSchedule,
    /// Agent run once on the single-agent path.
    pub fallback_agent: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            costs: CostSchedule::default(),
            fallback_agent: "strategy_advisor".to_string(),
        }
    }
}

/// A report request from one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub user_id: String,
    pub kind: WorkflowKind,
    pub input: Data,
}

impl DispatchRequest {
    pub fn new(user_id: impl Into<String>, kind: WorkflowKind, input: Data) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            input,
        }
    }
}

/// What the dispatcher produced for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub mode: ExecutionMode,
    /// Present whenever the workflow ran, including when it failed and was
    /// replaced by the single-agent path.
    pub workflow: Option<WorkflowResult>,
    /// Present when the single-agent path ran.
    pub single: Option<AgentResult>,
    pub narrative: Option<String>,
    pub fallback_reason: Option<FallbackReason>,
    /// Units actually deducted.
    pub charged: u64,
    pub metadata: Data,
}

impl DispatchOutcome {
    /// Whether the path named by `mode` produced a successful result.
    pub fn is_success(&self) -> bool {
        match self.mode {
            ExecutionMode::MultiAgent => self.workflow.as_ref().is_some_and(|w| w.is_success()),
            ExecutionMode::SingleAgent => self.single.as_ref().is_some_and(|r| r.is_success()),
        }
    }

    /// Error text of the producing path, if it failed.
    pub fn error(&self) -> Option<&str> {
        match self.mode {
            ExecutionMode::MultiAgent => self.workflow.as_ref().and_then(|w| w.outcome.error()),
            ExecutionMode::SingleAgent => self.single.as_ref().and_then(|r| r.error()),
        }
    }
}

/// Chooses between the workflow and the cheaper single-agent path.
///
/// Quota exhaustion and workflow failure are ordinary branches here: the
/// request degrades to the single-agent path and the reason is attached to
/// the outcome. Nothing in `dispatch` returns an error.
///
/// Requests from the same user are served one at a time, so the balance a
/// request checks is the balance it is charged against. Clones share the
/// per-user locks.
#[derive(Clone)]
pub struct Dispatcher {
    coordinator: Coordinator,
    quota: Arc<dyn QuotaAccessor>,
    config: DispatcherConfig,
    user_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl Dispatcher {
    pub fn new(coordinator: Coordinator, quota: Arc<dyn QuotaAccessor>) -> Self {
        Self {
            coordinator,
            quota,
            config: DispatcherConfig::default(),
            user_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Serve one request.
    pub async fn dispatch(
        &self,
        request: DispatchRequest,
        progress: &dyn ProgressSink,
    ) -> DispatchOutcome {
        let costs = self.config.costs;
        let user_id = request.user_id.clone();
        let user_lock = self.user_lock(&user_id).await;
        let _serialized = user_lock.lock().await;

        let fallback = match self.quota.remaining(&user_id).await {
            Ok(remaining) if remaining >= costs.multi_agent => None,
            Ok(remaining) => {
                tracing::warn!(
                    user_id = %user_id,
                    remaining,
                    required = costs.multi_agent,
                    "insufficient quota for multi-agent workflow, using single agent"
                );
                Some(FallbackReason::InsufficientQuota)
            }
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "quota lookup failed, using single agent");
                Some(FallbackReason::QuotaUnavailable)
            }
        };

        if let Some(reason) = fallback {
            progress
                .on_progress(10, &format!("Running {}", self.config.fallback_agent))
                .await;
            let single = self.run_single(&request).await;
            let message = if single.is_success() {
                "Analysis complete".to_string()
            } else {
                format!(
                    "Analysis failed: {}",
                    single.error().unwrap_or("agent failed")
                )
            };
            progress.on_progress(100, &message).await;
            return self.single_outcome(&user_id, None, single, reason).await;
        }

        let workflow = self
            .coordinator
            .run(
                request.kind,
                WorkflowRequest::new(request.input.clone()).with_user(user_id.clone()),
                progress,
            )
            .await;

        if !workflow.is_success() {
            tracing::warn!(
                user_id = %user_id,
                workflow_id = %workflow.workflow_id,
                summary = %workflow.summary,
                "workflow failed, falling back to single agent"
            );
            let single = self.run_single(&request).await;
            return self
                .single_outcome(&user_id, Some(workflow), single, FallbackReason::WorkflowFailed)
                .await;
        }

        let mut metadata = Data::new();
        metadata.insert(MODE_KEY.to_string(), json!(ExecutionMode::MultiAgent.as_str()));
        metadata.insert("workflow_id".to_string(), json!(workflow.workflow_id));
        metadata.insert("summary".to_string(), json!(workflow.summary.to_string()));
        let charged = self
            .charge(&user_id, costs.multi_agent, &mut metadata)
            .await;

        DispatchOutcome {
            mode: ExecutionMode::MultiAgent,
            narrative: workflow.narrative().map(str::to_string),
            workflow: Some(workflow),
            single: None,
            fallback_reason: None,
            charged,
            metadata,
        }
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        Arc::clone(locks.entry(user_id.to_string()).or_default())
    }

    async fn run_single(&self, request: &DispatchRequest) -> AgentResult {
        let ctx = ExecutionContext::new(Category::Advisory, request.input.clone())
            .with_user(Some(request.user_id.clone()));
        self.coordinator
            .executor()
            .execute_single(&self.config.fallback_agent, &ctx)
            .await
    }

    async fn single_outcome(
        &self,
        user_id: &str,
        workflow: Option<WorkflowResult>,
        single: AgentResult,
        reason: FallbackReason,
    ) -> DispatchOutcome {
        let mut metadata = Data::new();
        metadata.insert(MODE_KEY.to_string(), json!(ExecutionMode::SingleAgent.as_str()));
        metadata.insert(FALLBACK_REASON_KEY.to_string(), json!(reason.as_str()));
        if let Some(workflow) = &workflow {
            metadata.insert("workflow_id".to_string(), json!(workflow.workflow_id));
            metadata.insert("summary".to_string(), json!(workflow.summary.to_string()));
        }

        let charged = if single.is_success() {
            self.charge(user_id, self.config.costs.single_agent, &mut metadata)
                .await
        } else {
            tracing::warn!(
                user_id = %user_id,
                agent = %self.config.fallback_agent,
                error = single.error().unwrap_or_default(),
                "single-agent path failed"
            );
            0
        };

        DispatchOutcome {
            mode: ExecutionMode::SingleAgent,
            workflow,
            narrative: single.data_str("narrative").map(str::to_string),
            single: Some(single),
            fallback_reason: Some(reason),
            charged,
            metadata,
        }
    }

    /// Charge the user; failures are recorded in `metadata`, never returned.
    async fn charge(&self, user_id: &str, units: u64, metadata: &mut Data) -> u64 {
        match self.quota.charge(user_id, units).await {
            Ok(()) => {
                tracing::debug!(user_id = %user_id, units, "charged quota");
                metadata.insert("charged".to_string(), json!(units));
                units
            }
            Err(err) => {
                tracing::warn!(user_id = %user_id, units, error = %err, "failed to charge quota");
                metadata.insert("charged".to_string(), json!(0));
                metadata.insert(CHARGE_ERROR_KEY.to_string(), json!(err.to_string()));
                0
            }
        }
    }
}
