// ABOUTME: Defines the TextGenerator trait - the abstraction that lets agents
// ABOUTME: work against any text-generation backend.

use async_trait::async_trait;

use crate::error::GenerateError;

/// Trait for text-generation backends.
///
/// Opaque to the orchestration engine: agents call it and map any error
/// into their own failed result.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`, optionally steered by a system prompt.
    async fn generate_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, GenerateError>;
}
