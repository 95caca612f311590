// ABOUTME: Shared fixtures for integration tests - an offline text generator
// ABOUTME: that answers by agent role, and helpers wiring the full engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ensemble::prelude::*;

/// Offline backend. Screener prompts get a JSON symbol list, everything
/// else gets a short canned report. Roles containing `fail_role` fail.
pub struct FakeBackend {
    pub symbols: Vec<&'static str>,
    pub fail_role: Option<&'static str>,
    pub calls: AtomicUsize,
}

impl FakeBackend {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self {
            symbols: vec!["AAPL", "MSFT"],
            fail_role: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(role_fragment: &'static str) -> Arc<Self> {
        Arc::new(Self {
            symbols: vec!["AAPL", "MSFT"],
            fail_role: Some(role_fragment),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeBackend {
    async fn generate_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let role = system_prompt.unwrap_or_default();

        if let Some(fragment) = self.fail_role {
            if role.contains(fragment) {
                return Err(GenerateError::Api {
                    status: 503,
                    message: "model overloaded".to_string(),
                });
            }
        }
        if role.contains("screener") {
            return Ok(serde_json::to_string(&self.symbols).unwrap_or_default());
        }
        let first_line = prompt.lines().next().unwrap_or_default();
        Ok(format!("Report: {}", first_line))
    }
}

/// Registry with every built-in agent.
pub async fn builtin_registry() -> AgentRegistry {
    let registry = AgentRegistry::new();
    register_builtin(&registry)
        .await
        .expect("built-in names are unique");
    registry
}

/// Full dispatcher over the built-in agents, configured from `config`.
pub async fn dispatcher(
    config: &EngineConfig,
    backend: Arc<FakeBackend>,
    quota: Arc<InMemoryQuota>,
) -> Dispatcher {
    let dependencies = Dependencies::new().with_text_generator(backend);
    let executor = Executor::new(builtin_registry().await, dependencies)
        .with_config(config.executor_config());
    let coordinator = Coordinator::new(executor, config.coordinator_config());
    Dispatcher::new(coordinator, quota).with_config(config.dispatcher_config())
}

pub fn strategy_input(strategy: &str) -> Data {
    let mut input = Data::new();
    input.insert("strategy".to_string(), serde_json::json!(strategy));
    input
}
