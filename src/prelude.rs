// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use ensemble::prelude::*;` to get started quickly.

pub use crate::agent::{
    Agent, AgentDescriptor, AgentRegistry, AgentResult, Category, Data, Dependencies,
    ExecutionContext,
};
pub use crate::agents::{PromptAgent, PromptSpec, register_builtin};
pub use crate::backend::{ChatCompletionsGenerator, TextGenerator};
pub use crate::config::EngineConfig;
pub use crate::coordinator::{
    Coordinator, CoordinatorConfig, NoopProgress, ProgressSink, WorkflowKind, WorkflowRequest,
    WorkflowResult, progress_fn,
};
pub use crate::dispatch::{
    CostSchedule, DispatchOutcome, DispatchRequest, Dispatcher, DispatcherConfig, ExecutionMode,
    FallbackReason, InMemoryQuota, QuotaAccessor,
};
pub use crate::error::{
    AgentError, ConfigError, EnsembleError, GenerateError, QuotaError, RegistryError, TaskError,
};
pub use crate::executor::{Executor, ExecutorConfig, ProgressUpdate};
pub use crate::task::{MemoryTaskStore, TaskRecord, TaskRunner, TaskStatus, TaskStore};
