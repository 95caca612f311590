// ABOUTME: Built-in financial-analysis agents backed by the text generator.
// ABOUTME: Includes analysts, risk, synthesis, screening, and the advisor.

mod analysts;
mod prompt;
mod screening;
mod synthesis;

pub use analysts::{FUNDAMENTAL_ANALYST, RISK_ANALYST, SENTIMENT_ANALYST, TECHNICAL_ANALYST};
pub use prompt::{BuildPrompt, ParseReply, Prompt, PromptAgent, PromptSpec, require_strategy};
pub use screening::{CANDIDATE_FILTER, CANDIDATE_RANKER, parse_symbols};
pub use synthesis::{REPORT_SYNTHESIZER, STRATEGY_ADVISOR};

use crate::agent::{Agent, AgentRegistry};
use crate::error::RegistryError;

/// Every built-in agent, in registration order.
pub const BUILTIN: [PromptSpec; 8] = [
    analysts::FUNDAMENTAL,
    analysts::TECHNICAL,
    analysts::SENTIMENT,
    analysts::RISK,
    synthesis::SYNTHESIZER,
    screening::FILTER,
    screening::RANKER,
    synthesis::ADVISOR,
];

/// Register all built-in agents. Call once at startup.
///
/// Each agent takes its text generator from the dependency set when it is
/// constructed, so a missing backend surfaces as a failed result rather
/// than a registration error.
pub async fn register_builtin(registry: &AgentRegistry) -> Result<(), RegistryError> {
    for spec in BUILTIN {
        registry
            .register(spec.name, spec.category, move |deps| {
                PromptAgent::from_dependencies(spec, deps).map(|agent| Box::new(agent) as Box<dyn Agent>)
            })
            .await?;
    }
    tracing::debug!(count = BUILTIN.len(), "registered built-in agents");
    Ok(())
}
