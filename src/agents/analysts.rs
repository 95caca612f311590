// ABOUTME: Analyst agents - fundamental, technical, and sentiment views of a
// ABOUTME: strategy, plus the risk analyst that consumes whichever of them succeeded.

use serde_json::json;

use super::prompt::{Prompt, PromptSpec, render_section, require_strategy, text_under};
use crate::agent::{CANDIDATE_KEY, Category, Data, ExecutionContext};
use crate::error::AgentError;

pub const FUNDAMENTAL_ANALYST: &str = "fundamental_analyst";
pub const TECHNICAL_ANALYST: &str = "technical_analyst";
pub const SENTIMENT_ANALYST: &str = "sentiment_analyst";
pub const RISK_ANALYST: &str = "risk_analyst";

pub const FUNDAMENTAL: PromptSpec = PromptSpec {
    name: FUNDAMENTAL_ANALYST,
    category: Category::Analysis,
    role: "You are a fundamental equity analyst. Assess valuation, earnings quality, \
           balance-sheet strength and competitive position. Be specific and concise.",
    build: fundamental_prompt,
    parse: analysis_reply,
};

pub const TECHNICAL: PromptSpec = PromptSpec {
    name: TECHNICAL_ANALYST,
    category: Category::Analysis,
    role: "You are a technical market analyst. Assess trend, momentum, support and \
           resistance levels and volume behaviour. Be specific and concise.",
    build: technical_prompt,
    parse: analysis_reply,
};

pub const SENTIMENT: PromptSpec = PromptSpec {
    name: SENTIMENT_ANALYST,
    category: Category::Analysis,
    role: "You are a market sentiment analyst. Assess news flow, analyst revisions, \
           positioning and investor mood. Be specific and concise.",
    build: sentiment_prompt,
    parse: analysis_reply,
};

pub const RISK: PromptSpec = PromptSpec {
    name: RISK_ANALYST,
    category: Category::Risk,
    role: "You are a portfolio risk manager. Identify the main risks of the strategy, \
           their likelihood and impact, and concrete mitigations.",
    build: risk_prompt,
    parse: risk_reply,
};

fn fundamental_prompt(ctx: &ExecutionContext) -> Result<Prompt, AgentError> {
    analyst_prompt(ctx, "fundamental")
}

fn technical_prompt(ctx: &ExecutionContext) -> Result<Prompt, AgentError> {
    analyst_prompt(ctx, "technical")
}

fn sentiment_prompt(ctx: &ExecutionContext) -> Result<Prompt, AgentError> {
    analyst_prompt(ctx, "sentiment")
}

fn analysis_reply(_ctx: &ExecutionContext, text: &str) -> Result<Data, AgentError> {
    Ok(text_under("analysis", text))
}

fn analyst_prompt(ctx: &ExecutionContext, lens: &str) -> Result<Prompt, AgentError> {
    let strategy = require_strategy(ctx)?;
    let subject = match ctx.input_str(CANDIDATE_KEY) {
        Some(candidate) => format!("the candidate {} in the context of this strategy", candidate),
        None => "this strategy".to_string(),
    };
    Ok(Prompt::Generate(format!(
        "Provide a {} analysis of {}.\n\nStrategy: {}",
        lens, subject, strategy
    )))
}

fn risk_prompt(ctx: &ExecutionContext) -> Result<Prompt, AgentError> {
    let strategy = require_strategy(ctx)?;
    let mut prompt = format!("Assess the risks of this strategy.\n\nStrategy: {}\n\n", strategy);

    let reports = ctx.prior_results();
    if reports.is_empty() {
        prompt.push_str("No analyst reports were available; base the assessment on the strategy alone.\n");
    } else {
        for (name, data) in reports {
            prompt.push_str(&render_section(name, data));
        }
    }
    Ok(Prompt::Generate(prompt))
}

fn risk_reply(ctx: &ExecutionContext, text: &str) -> Result<Data, AgentError> {
    let mut data = text_under("assessment", text);
    let inputs: Vec<&str> = ctx.prior_results().into_iter().map(|(name, _)| name).collect();
    data.insert("inputs".to_string(), json!(inputs));
    Ok(data)
}
