// ABOUTME: Executor module - single, parallel, and sequential agent execution.
// ABOUTME: The one place where agent failures are isolated and converted to data.

mod executor;

pub use executor::{
    DEFAULT_AGENT_TIMEOUT, Executor, ExecutorConfig, ProgressFn, ProgressUpdate,
};
