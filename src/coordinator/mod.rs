// ABOUTME: Coordinator module - fixed multi-phase workflows over the executor.
// ABOUTME: Contains workflow types, progress sinks, and the coordinator itself.

mod coordinator;
mod progress;
mod workflow;

pub use coordinator::{
    CANDIDATES_KEY, Coordinator, CoordinatorConfig, PHASE_SUMMARY_KEY, extract_candidates,
};
pub use progress::{FnProgress, NoopProgress, ProgressSink, progress_fn};
pub use workflow::{
    MultiFactorPlan, PhaseResult, ScreeningPlan, WorkflowKind, WorkflowRequest, WorkflowResult,
    WorkflowSummary,
};
