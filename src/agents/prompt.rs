// ABOUTME: PromptAgent - the shared shape of every built-in agent: build a
// ABOUTME: prompt from the context, call the text generator, parse the reply.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::agent::{
    Agent, AgentResult, Category, Data, Dependencies, ExecutionContext, STRATEGY_KEY,
};
use crate::backend::TextGenerator;
use crate::error::AgentError;

/// What an agent does for a given context.
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    /// Send this prompt to the text generator.
    Generate(String),
    /// Finish successfully with this data without calling the backend.
    Answer(Data),
}

/// Builds the prompt for a context, or rejects the context.
pub type BuildPrompt = fn(&ExecutionContext) -> Result<Prompt, AgentError>;

/// Turns generated text into result data.
pub type ParseReply = fn(&ExecutionContext, &str) -> Result<Data, AgentError>;

/// Static description of a prompt agent.
#[derive(Debug, Clone, Copy)]
pub struct PromptSpec {
    pub name: &'static str,
    pub category: Category,
    /// Role description, sent as the system prompt.
    pub role: &'static str,
    pub build: BuildPrompt,
    pub parse: ParseReply,
}

/// Agent driven entirely by a [`PromptSpec`] and a text generator.
pub struct PromptAgent {
    spec: PromptSpec,
    generator: Arc<dyn TextGenerator>,
}

impl PromptAgent {
    pub fn new(spec: PromptSpec, generator: Arc<dyn TextGenerator>) -> Self {
        Self { spec, generator }
    }

    /// Construct from an injected dependency set.
    pub fn from_dependencies(spec: PromptSpec, deps: &Dependencies) -> Result<Self, AgentError> {
        Ok(Self::new(spec, deps.text_generator()?))
    }

    async fn run(&self, ctx: &ExecutionContext) -> Result<Data, AgentError> {
        let prompt = match (self.spec.build)(ctx)? {
            Prompt::Answer(data) => return Ok(data),
            Prompt::Generate(prompt) => prompt,
        };
        let text = self
            .generator
            .generate_text(&prompt, Some(self.spec.role))
            .await?;
        (self.spec.parse)(ctx, &text)
    }
}

#[async_trait]
impl Agent for PromptAgent {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn category(&self) -> Category {
        self.spec.category
    }

    fn role(&self) -> &str {
        self.spec.role
    }

    async fn execute(&self, ctx: &ExecutionContext) -> AgentResult {
        match self.run(ctx).await {
            Ok(data) => self.succeed(data),
            Err(err) => {
                tracing::debug!(agent = self.spec.name, error = %err, "agent returned failure");
                self.fail(err.to_string())
            }
        }
    }
}

/// The `strategy` input, trimmed. Blank counts as missing.
pub fn require_strategy(ctx: &ExecutionContext) -> Result<&str, AgentError> {
    ctx.input_str(STRATEGY_KEY)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AgentError::MissingInput(STRATEGY_KEY.to_string()))
}

/// Stores the reply under `key`.
pub fn text_under(key: &str, text: &str) -> Data {
    let mut data = Data::new();
    data.insert(key.to_string(), json!(text.trim()));
    data
}

/// The success data for a terminal agent with nothing to work on.
pub fn insufficient_data(what: &str) -> Data {
    let mut data = Data::new();
    data.insert(
        "narrative".to_string(),
        json!(format!("Insufficient data to {}: no upstream analysis succeeded.", what)),
    );
    data.insert("insufficient_data".to_string(), Value::Bool(true));
    data
}

/// Render a data map as a compact prompt section.
pub fn render_section(title: &str, data: &Data) -> String {
    let body = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
    format!("## {}\n{}\n", title, body)
}
