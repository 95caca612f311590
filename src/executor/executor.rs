// ABOUTME: Executor - runs registered agents singly, in parallel, or in sequence.
// ABOUTME: Owns timing, timeouts, panic isolation, and progress callbacks.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use tokio::time::Instant;

use crate::agent::{AgentRegistry, AgentResult, Dependencies, ExecutionContext};

/// Default upper bound for a single agent invocation.
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Upper bound for one agent invocation.
    pub agent_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
        }
    }
}

/// A progress notification from the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Steps finished (parallel) or the step about to run (sequential), 1-based.
    pub current: usize,
    /// Total number of steps.
    pub total: usize,
    /// Human-readable message.
    pub message: String,
}

/// Callback invoked with executor progress.
pub type ProgressFn = dyn Fn(&ProgressUpdate) + Send + Sync;

/// Runs agents resolved from a registry.
///
/// Every failure mode (unknown name, construction error, panic, timeout,
/// agent-reported failure) comes back as a failed [`AgentResult`]; no method
/// here returns an error. Cloning is cheap.
#[derive(Clone)]
pub struct Executor {
    registry: AgentRegistry,
    dependencies: Dependencies,
    config: ExecutorConfig,
    deadline: Option<Instant>,
}

impl Executor {
    /// Create an executor over a registry and dependency set.
    pub fn new(registry: AgentRegistry, dependencies: Dependencies) -> Self {
        Self {
            registry,
            dependencies,
            config: ExecutorConfig::default(),
            deadline: None,
        }
    }

    /// Set the executor configuration.
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Return a copy whose invocations all end by `deadline`.
    ///
    /// Agents still running when the deadline passes are dropped and
    /// reported as failures.
    pub fn with_deadline(&self, deadline: Option<Instant>) -> Self {
        let mut bounded = self.clone();
        bounded.deadline = deadline;
        bounded
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    /// Run one agent by name.
    pub async fn execute_single(&self, name: &str, ctx: &ExecutionContext) -> AgentResult {
        let started = Instant::now();
        let result = self.run_agent(name, ctx).await;
        let elapsed = started.elapsed();

        if result.is_success() {
            tracing::debug!(
                agent = name,
                workflow_id = %ctx.workflow_id,
                elapsed_ms = elapsed.as_millis() as u64,
                "agent succeeded"
            );
        } else {
            tracing::warn!(
                agent = name,
                workflow_id = %ctx.workflow_id,
                elapsed_ms = elapsed.as_millis() as u64,
                error = result.error().unwrap_or_default(),
                "agent failed"
            );
        }

        result.with_duration(elapsed)
    }

    async fn run_agent(&self, name: &str, ctx: &ExecutionContext) -> AgentResult {
        let entry = match self.registry.resolve_entry(name).await {
            Ok(entry) => entry,
            Err(err) => return AgentResult::failure(name, ctx.category, err.to_string()),
        };
        let category = entry.descriptor.category;

        let agent = match (entry.factory)(&self.dependencies) {
            Ok(agent) => agent,
            Err(err) => {
                return AgentResult::failure(
                    name,
                    category,
                    format!("failed to construct agent '{}': {}", name, err),
                );
            }
        };

        let Some(budget) = self.time_budget() else {
            return AgentResult::failure(
                name,
                category,
                format!("workflow deadline exceeded before agent '{}' started", name),
            );
        };

        tracing::debug!(agent = name, workflow_id = %ctx.workflow_id, "agent starting");

        let run = AssertUnwindSafe(agent.execute(ctx)).catch_unwind();
        match tokio::time::timeout(budget, run).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => AgentResult::failure(
                name,
                category,
                format!("agent '{}' panicked: {}", name, panic_message(panic.as_ref())),
            ),
            Err(_) => AgentResult::failure(
                name,
                category,
                format!("agent '{}' timed out after {}ms", name, budget.as_millis()),
            ),
        }
    }

    /// Time left for the next invocation, or `None` if the deadline has passed.
    fn time_budget(&self) -> Option<Duration> {
        match self.deadline {
            None => Some(self.config.agent_timeout),
            Some(deadline) => {
                let remaining = deadline.checked_duration_since(Instant::now())?;
                if remaining.is_zero() {
                    return None;
                }
                Some(remaining.min(self.config.agent_timeout))
            }
        }
    }

    /// Run agents concurrently against the same context and wait for all of them.
    ///
    /// Names are treated as a set: duplicates run once. The returned map has
    /// one entry per distinct name, whatever happened to each branch. The
    /// progress callback fires once, after every branch has finished.
    pub async fn execute_parallel(
        &self,
        names: &[String],
        ctx: &ExecutionContext,
        progress: Option<&ProgressFn>,
    ) -> HashMap<String, AgentResult> {
        let mut seen = HashSet::new();
        let distinct: Vec<&String> = names.iter().filter(|n| seen.insert(n.as_str())).collect();
        if distinct.len() < names.len() {
            tracing::warn!(
                requested = names.len(),
                distinct = distinct.len(),
                "duplicate agent names in parallel execution"
            );
        }

        let shared = Arc::new(ctx.clone());
        let handles: Vec<_> = distinct
            .iter()
            .map(|name| {
                let executor = self.clone();
                let ctx = Arc::clone(&shared);
                let name = (*name).clone();
                tokio::spawn(async move { executor.execute_single(&name, &ctx).await })
            })
            .collect();

        let joined = join_all(handles).await;

        let mut results = HashMap::with_capacity(distinct.len());
        for (name, joined) in distinct.into_iter().zip(joined) {
            let result = joined.unwrap_or_else(|err| {
                let category = ctx.category;
                AgentResult::failure(
                    name.as_str(),
                    category,
                    format!("agent '{}' task aborted: {}", name, err),
                )
            });
            results.insert(name.clone(), result);
        }

        if let Some(progress) = progress {
            let succeeded = results.values().filter(|r| r.is_success()).count();
            progress(&ProgressUpdate {
                current: results.len(),
                total: results.len(),
                message: format!(
                    "Parallel execution complete: {}/{} succeeded",
                    succeeded,
                    results.len()
                ),
            });
        }

        results
    }

    /// Run agents one after another, publishing each success into the context.
    ///
    /// After a successful step its data is written under `_result_<name>`.
    /// After a failed step that key is absent. With `stop_on_error` the
    /// returned list ends at the first failure (inclusive).
    pub async fn execute_sequential(
        &self,
        names: &[String],
        ctx: &mut ExecutionContext,
        stop_on_error: bool,
        progress: Option<&ProgressFn>,
    ) -> Vec<AgentResult> {
        let total = names.len();
        let mut results = Vec::with_capacity(total);

        for (index, name) in names.iter().enumerate() {
            if let Some(progress) = progress {
                progress(&ProgressUpdate {
                    current: index + 1,
                    total,
                    message: format!("Running {} ({}/{})", name, index + 1, total),
                });
            }

            let result = self.execute_single(name, ctx).await;
            if result.is_success() {
                ctx.set_result(name, result.data().clone());
            } else {
                ctx.clear_result(name);
            }

            let failed = !result.is_success();
            results.push(result);

            if failed && stop_on_error {
                tracing::info!(
                    agent = name.as_str(),
                    step = index + 1,
                    total,
                    "stopping sequential execution after failure"
                );
                break;
            }
        }

        results
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
