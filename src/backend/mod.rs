// ABOUTME: Backend module - the text-generation boundary agents call into.
// ABOUTME: Defines the TextGenerator trait and an OpenAI-compatible client.

mod chat_completions;
mod generator;

pub use chat_completions::*;
pub use generator::*;

#[cfg(test)]
mod chat_completions_test;
