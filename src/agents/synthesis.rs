// ABOUTME: Terminal narrative agents - the report synthesizer over aggregated
// ABOUTME: workflow results and the single-call strategy advisor.

use serde_json::json;

use super::prompt::{Prompt, PromptSpec, insufficient_data, render_section, require_strategy, text_under};
use crate::agent::{Category, Data, ExecutionContext};
use crate::error::AgentError;

pub const REPORT_SYNTHESIZER: &str = "report_synthesizer";
pub const STRATEGY_ADVISOR: &str = "strategy_advisor";

pub const SYNTHESIZER: PromptSpec = PromptSpec {
    name: REPORT_SYNTHESIZER,
    category: Category::Synthesis,
    role: "You are a senior investment strategist writing the final report. Combine the \
           analyses into one coherent narrative with a clear recommendation. Mention \
           explicitly when a perspective is missing.",
    build: synthesis_prompt,
    parse: synthesis_reply,
};

pub const ADVISOR: PromptSpec = PromptSpec {
    name: STRATEGY_ADVISOR,
    category: Category::Advisory,
    role: "You are an experienced investment advisor. Give a balanced, practical review \
           of the strategy covering opportunities, risks and a recommendation.",
    build: advisor_prompt,
    parse: advisor_reply,
};

fn synthesis_prompt(ctx: &ExecutionContext) -> Result<Prompt, AgentError> {
    let strategy = require_strategy(ctx)?;
    let Some(all) = ctx.all_results().filter(|all| !all.is_empty()) else {
        return Ok(Prompt::Answer(insufficient_data("produce a report")));
    };

    let mut prompt = format!(
        "Write the final report for this strategy.\n\nStrategy: {}\n\n",
        strategy
    );
    let mut names: Vec<&String> = all.keys().collect();
    names.sort();
    for name in names {
        if let Some(section) = all.get(name).and_then(|v| v.as_object()) {
            prompt.push_str(&render_section(name, section));
        }
    }
    Ok(Prompt::Generate(prompt))
}

fn synthesis_reply(ctx: &ExecutionContext, text: &str) -> Result<Data, AgentError> {
    let mut data = text_under("narrative", text);
    let mut sources: Vec<&str> = ctx
        .all_results()
        .map(|all| all.keys().map(String::as_str).collect())
        .unwrap_or_default();
    sources.sort();
    data.insert("sources".to_string(), json!(sources));
    Ok(data)
}

fn advisor_prompt(ctx: &ExecutionContext) -> Result<Prompt, AgentError> {
    let strategy = require_strategy(ctx)?;
    Ok(Prompt::Generate(format!(
        "Review this investment strategy and give your recommendation.\n\nStrategy: {}",
        strategy
    )))
}

fn advisor_reply(_ctx: &ExecutionContext, text: &str) -> Result<Data, AgentError> {
    Ok(text_under("narrative", text))
}
