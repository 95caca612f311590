// ABOUTME: Screening agents - the candidate filter that proposes symbols and
// ABOUTME: the ranker that orders them from per-candidate analyses.

use serde_json::{Value, json};

use super::prompt::{Prompt, PromptSpec, insufficient_data, render_section, require_strategy, text_under};
use crate::agent::{Category, Data, ExecutionContext};
use crate::coordinator::{CANDIDATES_KEY, extract_candidates};
use crate::error::AgentError;

pub const CANDIDATE_FILTER: &str = "candidate_filter";
pub const CANDIDATE_RANKER: &str = "candidate_ranker";

pub const FILTER: PromptSpec = PromptSpec {
    name: CANDIDATE_FILTER,
    category: Category::Screening,
    role: "You are an equity screener. Propose ticker symbols that fit the strategy. \
           Reply with a JSON array of ticker strings and nothing else.",
    build: filter_prompt,
    parse: filter_reply,
};

pub const RANKER: PromptSpec = PromptSpec {
    name: CANDIDATE_RANKER,
    category: Category::Ranking,
    role: "You are a portfolio manager. Rank the candidates from best to worst fit for \
           the strategy and justify each position briefly.",
    build: ranker_prompt,
    parse: ranker_reply,
};

fn filter_prompt(ctx: &ExecutionContext) -> Result<Prompt, AgentError> {
    let strategy = require_strategy(ctx)?;
    Ok(Prompt::Generate(format!(
        "List the most suitable stock candidates for this strategy.\n\nStrategy: {}",
        strategy
    )))
}

fn filter_reply(_ctx: &ExecutionContext, text: &str) -> Result<Data, AgentError> {
    let symbols = parse_symbols(text);
    if symbols.is_empty() {
        return Err(AgentError::InvalidOutput(
            "no candidate symbols in reply".to_string(),
        ));
    }
    let mut data = Data::new();
    data.insert(CANDIDATES_KEY.to_string(), json!(symbols));
    Ok(data)
}

/// Symbols from a JSON array reply, or from one symbol per line.
pub fn parse_symbols(text: &str) -> Vec<String> {
    let items = match json_array(text) {
        Some(items) => items,
        None => text
            .lines()
            .filter_map(line_symbol)
            .map(Value::String)
            .collect(),
    };
    let mut data = Data::new();
    data.insert(CANDIDATES_KEY.to_string(), Value::Array(items));
    extract_candidates(&data, usize::MAX)
}

fn json_array(text: &str) -> Option<Vec<Value>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// A symbol from one line of a list reply. The line must be a list item
/// (`-`, `*`, `1.` or `1)`) or hold nothing but the symbol.
fn line_symbol(line: &str) -> Option<String> {
    let line = line.trim();
    let (listed, rest) = match list_item(line) {
        Some(rest) => (true, rest.trim()),
        None => (false, line),
    };
    let token = rest
        .split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .next()?;
    if !listed && token.len() != rest.len() {
        return None;
    }
    is_symbol(token).then(|| token.to_string())
}

fn list_item(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix(['-', '*']) {
        return Some(rest);
    }
    let after_digits = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if after_digits.len() == line.len() {
        return None;
    }
    after_digits.strip_prefix(['.', ')'])
}

fn is_symbol(token: &str) -> bool {
    (2..=10).contains(&token.len())
        && token.starts_with(|c: char| c.is_ascii_uppercase())
        && token
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
}

fn ranker_prompt(ctx: &ExecutionContext) -> Result<Prompt, AgentError> {
    let strategy = require_strategy(ctx)?;
    let Some(all) = ctx.all_results().filter(|all| !all.is_empty()) else {
        let mut data = insufficient_data("rank candidates");
        data.insert("ranked".to_string(), json!([]));
        return Ok(Prompt::Answer(data));
    };

    let mut prompt = format!(
        "Rank these candidates for the strategy.\n\nStrategy: {}\n\n",
        strategy
    );
    for candidate in candidates(ctx) {
        if let Some(analyses) = all.get(&candidate).and_then(Value::as_object) {
            prompt.push_str(&render_section(&candidate, analyses));
        } else {
            prompt.push_str(&format!("## {}\nNo analysis available.\n", candidate));
        }
    }
    Ok(Prompt::Generate(prompt))
}

/// Candidates in ranked order: by first mention in the reply, unmentioned last.
fn ranker_reply(ctx: &ExecutionContext, text: &str) -> Result<Data, AgentError> {
    let mut ranked: Vec<(usize, String)> = candidates(ctx)
        .into_iter()
        .map(|c| (find_word(text, &c).unwrap_or(usize::MAX), c))
        .collect();
    ranked.sort_by_key(|(position, _)| *position);

    let mut data = text_under("narrative", text);
    let ranked: Vec<String> = ranked.into_iter().map(|(_, c)| c).collect();
    data.insert("ranked".to_string(), json!(ranked));
    Ok(data)
}

/// Byte offset of the first occurrence of `word` not embedded in a longer
/// alphanumeric run, so "AA" is not found inside "AAPL".
fn find_word(text: &str, word: &str) -> Option<usize> {
    if word.is_empty() {
        return None;
    }
    text.match_indices(word).map(|(at, _)| at).find(|&at| {
        let before = text[..at].chars().next_back();
        let after = text[at + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// The candidate list handed to the ranker, falling back to the keys of
/// the aggregated analyses.
fn candidates(ctx: &ExecutionContext) -> Vec<String> {
    let listed = extract_candidates(&ctx.input, usize::MAX);
    if !listed.is_empty() {
        return listed;
    }
    let mut keys: Vec<String> = ctx
        .all_results()
        .map(|all| all.keys().cloned().collect())
        .unwrap_or_default();
    keys.sort();
    keys
}
