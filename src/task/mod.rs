// ABOUTME: Background task runner - executes dispatches off the caller's path
// ABOUTME: and keeps a pollable record of progress and outcome.

mod runner;
mod store;

pub use runner::TaskRunner;
pub use store::{MemoryTaskStore, ProgressEvent, TaskRecord, TaskStatus, TaskStore};
