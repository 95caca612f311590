// ABOUTME: Coordinator - composes executor calls into the fixed multi-phase
// ABOUTME: workflows, forwarding partial results and reporting coarse progress.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{Value, json};
use tokio::time::Instant;

use super::progress::ProgressSink;
use super::workflow::{
    MultiFactorPlan, PhaseResult, ScreeningPlan, WorkflowKind, WorkflowRequest, WorkflowResult,
};
use crate::agent::{ALL_RESULTS_KEY, AgentResult, CANDIDATE_KEY, Category, Data, ExecutionContext};
use crate::executor::Executor;

/// Input key listing the candidates handed to the ranking phase.
pub const CANDIDATES_KEY: &str = "candidates";

/// Metadata key carrying the "k/n succeeded" summary of earlier phases.
pub const PHASE_SUMMARY_KEY: &str = "phase_summary";

const PROGRESS_STARTED: u8 = 10;
const PROGRESS_DEPENDENT: u8 = 60;
const PROGRESS_TERMINAL: u8 = 85;
const PROGRESS_DONE: u8 = 100;

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Overall bound on every phase before the terminal one.
    ///
    /// When it passes, still-running agents are dropped and the terminal
    /// phase runs over whatever succeeded.
    pub workflow_timeout: Option<Duration>,
    pub multi_factor: MultiFactorPlan,
    pub screening: ScreeningPlan,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            workflow_timeout: Some(Duration::from_secs(120)),
            multi_factor: MultiFactorPlan::default(),
            screening: ScreeningPlan::default(),
        }
    }
}

/// Runs the fixed workflows.
///
/// Never halts on a partial phase failure: each phase receives only the
/// successful subset of what came before, and every phase runs. A workflow
/// fails only if its terminal agent fails.
#[derive(Clone)]
pub struct Coordinator {
    executor: Executor,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Create a coordinator over an executor.
    pub fn new(executor: Executor, config: CoordinatorConfig) -> Self {
        Self { executor, config }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run a workflow by kind.
    pub async fn run(
        &self,
        kind: WorkflowKind,
        request: WorkflowRequest,
        progress: &dyn ProgressSink,
    ) -> WorkflowResult {
        match kind {
            WorkflowKind::MultiFactor => self.run_multi_factor(request, progress).await,
            WorkflowKind::Screening => self.run_screening(request, progress).await,
        }
    }

    fn bounded_executor(&self) -> Executor {
        let deadline = self
            .config
            .workflow_timeout
            .map(|timeout| Instant::now() + timeout);
        self.executor.with_deadline(deadline)
    }

    /// Parallel analysts, then the dependent strategist, then synthesis.
    pub async fn run_multi_factor(
        &self,
        request: WorkflowRequest,
        progress: &dyn ProgressSink,
    ) -> WorkflowResult {
        let plan = &self.config.multi_factor;
        let bounded = self.bounded_executor();
        let mut ctx =
            ExecutionContext::new(Category::Analysis, request.input).with_user(request.user_id);
        let workflow_id = ctx.workflow_id.clone();

        tracing::info!(%workflow_id, kind = "multi_factor", analysts = plan.analysts.len(), "workflow starting");

        // Phase 1: independent analysts.
        progress
            .on_progress(
                PROGRESS_STARTED,
                &format!("Running {} analysts in parallel", plan.analysts.len()),
            )
            .await;
        let analysis = in_plan_order(
            &plan.analysts,
            bounded.execute_parallel(&plan.analysts, &ctx, None).await,
        );
        let analysis_phase = PhaseResult {
            name: "analysis".to_string(),
            results: analysis,
        };
        let analysis_summary = format!(
            "{}/{} succeeded",
            analysis_phase.succeeded(),
            analysis_phase.results.len()
        );
        tracing::info!(%workflow_id, phase = "analysis", summary = %analysis_summary, "phase complete");

        // Phase 2: dependent step over the successful subset.
        for (name, result) in &analysis_phase.results {
            if result.is_success() {
                ctx.set_result(name, result.data().clone());
            }
        }
        ctx.category = Category::Risk;
        ctx.metadata
            .insert(PHASE_SUMMARY_KEY.to_string(), json!(analysis_summary));
        progress
            .on_progress(
                PROGRESS_DEPENDENT,
                &format!("Analysis {}; running {}", analysis_summary, plan.strategist),
            )
            .await;
        let strategy = bounded.execute_single(&plan.strategist, &ctx).await;
        if strategy.is_success() {
            ctx.set_result(&plan.strategist, strategy.data().clone());
        }
        let strategy_phase = PhaseResult {
            name: "strategy".to_string(),
            results: vec![(plan.strategist.clone(), strategy)],
        };

        // Phase 3: synthesis over everything that exists.
        let all_results = successful_data(&[&analysis_phase, &strategy_phase]);
        ctx.category = Category::Synthesis;
        ctx.set_input(ALL_RESULTS_KEY, Value::Object(all_results));
        progress
            .on_progress(PROGRESS_TERMINAL, "Synthesizing final report")
            .await;
        let synthesis = self.executor.execute_single(&plan.synthesizer, &ctx).await;

        self.finish(
            workflow_id,
            WorkflowKind::MultiFactor,
            vec![analysis_phase, strategy_phase],
            "synthesis",
            (plan.synthesizer.clone(), synthesis),
            progress,
        )
        .await
    }

    /// Candidate filter, a parallel agent group per candidate, then ranking.
    pub async fn run_screening(
        &self,
        request: WorkflowRequest,
        progress: &dyn ProgressSink,
    ) -> WorkflowResult {
        let plan = &self.config.screening;
        let bounded = self.bounded_executor();
        let mut ctx =
            ExecutionContext::new(Category::Screening, request.input).with_user(request.user_id);
        let workflow_id = ctx.workflow_id.clone();

        tracing::info!(%workflow_id, kind = "screening", "workflow starting");

        // Phase 1: produce the candidate list.
        progress
            .on_progress(PROGRESS_STARTED, "Screening candidates")
            .await;
        let filter = bounded.execute_single(&plan.filter, &ctx).await;
        let candidates = if filter.is_success() {
            ctx.set_result(&plan.filter, filter.data().clone());
            extract_candidates(filter.data(), plan.max_candidates)
        } else {
            Vec::new()
        };
        let screening_phase = PhaseResult {
            name: "screening".to_string(),
            results: vec![(plan.filter.clone(), filter)],
        };

        // Phase 2: candidates x agent group, all concurrently.
        progress
            .on_progress(
                PROGRESS_DEPENDENT,
                &format!(
                    "Analyzing {} candidates with {} agents each",
                    candidates.len(),
                    plan.per_candidate.len()
                ),
            )
            .await;
        let branches = candidates.iter().map(|candidate| {
            let mut candidate_ctx = ctx.clone();
            candidate_ctx.category = Category::Analysis;
            candidate_ctx.set_input(CANDIDATE_KEY, json!(candidate));
            let bounded = &bounded;
            async move {
                let results = bounded
                    .execute_parallel(&plan.per_candidate, &candidate_ctx, None)
                    .await;
                (candidate.clone(), in_plan_order(&plan.per_candidate, results))
            }
        });
        let per_candidate = join_all(branches).await;

        let mut analyses = Data::new();
        let mut candidate_results = Vec::new();
        for (candidate, results) in per_candidate {
            let mut produced = Data::new();
            for (agent, result) in results {
                if result.is_success() {
                    produced.insert(agent.clone(), Value::Object(result.data().clone()));
                }
                candidate_results.push((format!("{}/{}", candidate, agent), result));
            }
            if !produced.is_empty() {
                analyses.insert(candidate, Value::Object(produced));
            }
        }
        let analysis_phase = PhaseResult {
            name: "candidate_analysis".to_string(),
            results: candidate_results,
        };
        tracing::info!(
            %workflow_id,
            phase = "candidate_analysis",
            candidates = candidates.len(),
            succeeded = analysis_phase.succeeded(),
            total = analysis_phase.results.len(),
            "phase complete"
        );

        // Phase 3: ranking over every per-candidate analysis.
        ctx.category = Category::Ranking;
        ctx.set_input(CANDIDATES_KEY, json!(candidates));
        ctx.set_input(ALL_RESULTS_KEY, Value::Object(analyses));
        ctx.metadata.insert(
            PHASE_SUMMARY_KEY.to_string(),
            json!(format!(
                "{}/{} succeeded",
                analysis_phase.succeeded(),
                analysis_phase.results.len()
            )),
        );
        progress
            .on_progress(PROGRESS_TERMINAL, "Ranking candidates")
            .await;
        let ranking = self.executor.execute_single(&plan.ranker, &ctx).await;

        self.finish(
            workflow_id,
            WorkflowKind::Screening,
            vec![screening_phase, analysis_phase],
            "ranking",
            (plan.ranker.clone(), ranking),
            progress,
        )
        .await
    }

    async fn finish(
        &self,
        workflow_id: String,
        kind: WorkflowKind,
        mut phases: Vec<PhaseResult>,
        terminal_phase: &str,
        (terminal_name, outcome): (String, AgentResult),
        progress: &dyn ProgressSink,
    ) -> WorkflowResult {
        let message = if outcome.is_success() {
            "Workflow complete".to_string()
        } else {
            format!(
                "Workflow failed: {}",
                outcome.error().unwrap_or("terminal agent failed")
            )
        };

        phases.push(PhaseResult {
            name: terminal_phase.to_string(),
            results: vec![(terminal_name, outcome.clone())],
        });
        let result = WorkflowResult::from_phases(workflow_id, kind, phases, outcome);

        if result.is_success() {
            tracing::info!(workflow_id = %result.workflow_id, %kind, summary = %result.summary, "workflow complete");
        } else {
            tracing::warn!(workflow_id = %result.workflow_id, %kind, summary = %result.summary, "workflow terminal agent failed");
        }
        progress.on_progress(PROGRESS_DONE, &message).await;

        result
    }
}

/// Order parallel results like the plan, one entry per distinct name.
fn in_plan_order(
    names: &[String],
    mut results: HashMap<String, AgentResult>,
) -> Vec<(String, AgentResult)> {
    names
        .iter()
        .filter_map(|name| results.remove(name).map(|r| (name.clone(), r)))
        .collect()
}

/// Data of every successful result across the given phases, keyed by agent.
fn successful_data(phases: &[&PhaseResult]) -> Data {
    phases
        .iter()
        .flat_map(|phase| phase.results.iter())
        .filter(|(_, result)| result.is_success())
        .map(|(name, result)| (name.clone(), Value::Object(result.data().clone())))
        .collect()
}

/// Read the candidate list produced by a filter agent.
///
/// Accepts `data.candidates` as an array of strings or of objects with a
/// `symbol` (or `ticker`) field. Blank and repeated entries are dropped and
/// at most `max` candidates are kept, in the filter's order.
pub fn extract_candidates(data: &Data, max: usize) -> Vec<String> {
    let Some(items) = data.get(CANDIDATES_KEY).and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut candidates: Vec<String> = Vec::new();
    for item in items {
        if candidates.len() >= max {
            break;
        }
        let symbol = match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj
                .get("symbol")
                .or_else(|| obj.get("ticker"))
                .and_then(Value::as_str),
            _ => None,
        };
        let Some(symbol) = symbol.map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        if !candidates.iter().any(|c| c == symbol) {
            candidates.push(symbol.to_string());
        }
    }
    candidates
}
