// ABOUTME: Agent module - the contract for a unit of analytical work.
// ABOUTME: Provides the Agent trait, results, context, dependencies, and the registry.

mod context;
mod dependencies;
mod registry;
mod result;
mod traits;

pub use context::*;
pub use dependencies::*;
pub use registry::*;
pub use result::*;
pub use traits::*;

#[cfg(test)]
mod registry_test;
