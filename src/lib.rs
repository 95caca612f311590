// ABOUTME: Root module for ensemble - concurrent agent orchestration for
// ABOUTME: multi-agent financial analysis reports. Re-exports submodules.

pub mod agent;
pub mod agents;
pub mod backend;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod task;

#[cfg(test)]
mod test_support;

pub use error::EnsembleError;
