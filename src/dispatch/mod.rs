// ABOUTME: Quota-aware dispatch - chooses between the multi-agent workflow
// ABOUTME: and the single-agent path based on the caller's remaining quota.

mod dispatcher;
mod quota;

pub use dispatcher::{
    CHARGE_ERROR_KEY, CostSchedule, DispatchOutcome, DispatchRequest, Dispatcher,
    DispatcherConfig, ExecutionMode, FALLBACK_REASON_KEY, FallbackReason, MODE_KEY,
};
pub use quota::{InMemoryQuota, QuotaAccessor};
