// ABOUTME: Defines the Agent trait - the uniform execute-and-never-fail contract
// ABOUTME: every unit of analytical work implements.

use async_trait::async_trait;

use super::{AgentResult, Category, Data, ExecutionContext};

/// A named, stateless unit of analytical work.
///
/// `execute` has no error channel: every internal failure (missing input,
/// dependency error, backend failure) is returned as a failed
/// [`AgentResult`] with a readable message. Agents are constructed fresh
/// for every invocation and must not keep mutable state between calls.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the unique name of this agent.
    fn name(&self) -> &str;

    /// Returns the category this agent belongs to.
    fn category(&self) -> Category;

    /// Returns the fixed role description that parametrizes downstream calls.
    fn role(&self) -> &str;

    /// Run the agent against the context.
    async fn execute(&self, ctx: &ExecutionContext) -> AgentResult;

    /// Build a successful result stamped with this agent's identity.
    fn succeed(&self, data: Data) -> AgentResult {
        AgentResult::success(self.name(), self.category(), data)
    }

    /// Build a failed result stamped with this agent's identity.
    fn fail(&self, error: impl Into<String>) -> AgentResult
    where
        Self: Sized,
    {
        AgentResult::failure(self.name(), self.category(), error)
    }
}
