// ABOUTME: Shared fixtures for unit tests - scripted agents and generators.
// ABOUTME: Lets tests describe agent behavior without any network access.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::agent::{Agent, AgentRegistry, AgentResult, Category, Data, ExecutionContext};
use crate::backend::TextGenerator;
use crate::error::GenerateError;

/// What a scripted agent does when executed.
#[derive(Clone)]
pub enum Behavior {
    /// Succeed with the given data.
    Succeed(Data),
    /// Return a failed result with the message.
    Fail(String),
    /// Panic with the message.
    Panic(String),
    /// Sleep, then succeed with empty data.
    Sleep(Duration),
    /// Succeed, reporting which prior results and aggregated keys it saw.
    EchoInputs,
}

/// Agent whose behavior is fixed at registration time.
pub struct ScriptedAgent {
    name: String,
    category: Category,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn role(&self) -> &str {
        "Scripted test agent"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> AgentResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed(data) => self.succeed(data.clone()),
            Behavior::Fail(message) => self.fail(message.clone()),
            Behavior::Panic(message) => panic!("{}", message),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                self.succeed(Data::new())
            }
            Behavior::EchoInputs => {
                let seen: Vec<Value> = ctx
                    .prior_results()
                    .into_iter()
                    .map(|(name, _)| json!(name))
                    .collect();
                let aggregated: Vec<Value> = ctx
                    .all_results()
                    .map(|all| all.keys().map(|k| json!(k)).collect())
                    .unwrap_or_default();
                let mut data = Data::new();
                data.insert("seen".into(), Value::Array(seen));
                data.insert("aggregated".into(), Value::Array(aggregated));
                if let Some(candidate) = ctx.input_str(crate::agent::CANDIDATE_KEY) {
                    data.insert("candidate".into(), json!(candidate));
                }
                self.succeed(data)
            }
        }
    }
}

/// Builds a data map from key/value pairs.
pub fn data(pairs: &[(&str, Value)]) -> Data {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Registers scripted agents and hands back per-agent call counters.
pub struct ScriptedRegistry {
    pub registry: AgentRegistry,
    calls: Vec<(String, Arc<AtomicUsize>)>,
}

impl ScriptedRegistry {
    pub async fn new(agents: Vec<(&str, Category, Behavior)>) -> Self {
        let registry = AgentRegistry::new();
        let mut calls = Vec::new();
        for (name, category, behavior) in agents {
            let counter = Arc::new(AtomicUsize::new(0));
            let agent_name = name.to_string();
            let agent_counter = Arc::clone(&counter);
            registry
                .register(name, category, move |_deps| {
                    Ok(Box::new(ScriptedAgent {
                        name: agent_name.clone(),
                        category,
                        behavior: behavior.clone(),
                        calls: Arc::clone(&agent_counter),
                    }) as Box<dyn Agent>)
                })
                .await
                .expect("test agent names are unique");
            calls.push((name.to_string(), counter));
        }
        Self { registry, calls }
    }

    /// How many times the named agent executed.
    pub fn calls(&self, name: &str) -> usize {
        self.calls
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

/// Text generator that replays canned responses and records prompts.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
    fallback: Option<String>,
    pub prompts: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedGenerator {
    /// Always answers with `text`.
    pub fn always(text: &str) -> Arc<Self> {
        Arc::new(Self {
            fallback: Some(text.to_string()),
            ..Self::default()
        })
    }

    /// Answers from the queue in order, then fails.
    pub fn queue(responses: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            ..Self::default()
        })
    }

    pub async fn prompt_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, GenerateError> {
        self.prompts
            .lock()
            .await
            .push((prompt.to_string(), system_prompt.map(str::to_string)));

        match self.responses.lock().await.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GenerateError::Api {
                status: 500,
                message,
            }),
            None => match &self.fallback {
                Some(text) => Ok(text.clone()),
                None => Err(GenerateError::EmptyResponse),
            },
        }
    }
}
