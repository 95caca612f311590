// ABOUTME: Tests for AgentRegistry - registration, lookup, categories, isolation.
// ABOUTME: Uses a minimal echo agent as the registered implementation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::error::{AgentError, RegistryError};

/// Echoes its name back in the result data.
struct EchoAgent {
    name: String,
    category: Category,
}

#[async_trait]
impl Agent for EchoAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn role(&self) -> &str {
        "Echoes its own name"
    }

    async fn execute(&self, _ctx: &ExecutionContext) -> AgentResult {
        let mut data = Data::new();
        data.insert("echo".into(), json!(self.name));
        self.succeed(data)
    }
}

fn echo_factory(
    name: &'static str,
    category: Category,
) -> impl Fn(&Dependencies) -> Result<Box<dyn Agent>, AgentError> + Send + Sync + 'static {
    move |_deps| {
        Ok(Box::new(EchoAgent {
            name: name.to_string(),
            category,
        }) as Box<dyn Agent>)
    }
}

#[tokio::test]
async fn test_register_and_resolve() {
    let registry = AgentRegistry::new();
    registry
        .register("echo", Category::Analysis, echo_factory("echo", Category::Analysis))
        .await
        .unwrap();

    let factory = registry.resolve("echo").await.unwrap();
    let agent = factory(&Dependencies::new()).unwrap();
    assert_eq!(agent.name(), "echo");
    assert_eq!(agent.category(), Category::Analysis);
}

#[tokio::test]
async fn test_duplicate_registration_keeps_original() {
    let registry = AgentRegistry::new();
    registry
        .register("echo", Category::Analysis, echo_factory("echo", Category::Analysis))
        .await
        .unwrap();

    let result = registry
        .register("echo", Category::Synthesis, echo_factory("impostor", Category::Synthesis))
        .await;
    assert_eq!(result, Err(RegistryError::Duplicate("echo".into())));

    let descriptor = registry.descriptor("echo").await.unwrap();
    assert_eq!(descriptor.category, Category::Analysis);
    let agent = registry.resolve("echo").await.unwrap()(&Dependencies::new()).unwrap();
    assert_eq!(agent.name(), "echo");
}

#[tokio::test]
async fn test_resolve_missing_lists_registered_names() {
    let registry = AgentRegistry::new();
    registry
        .register("beta", Category::Risk, echo_factory("beta", Category::Risk))
        .await
        .unwrap();
    registry
        .register("alpha", Category::Analysis, echo_factory("alpha", Category::Analysis))
        .await
        .unwrap();

    let err = registry.resolve("gamma").await.err().unwrap();
    match &err {
        RegistryError::NotFound { name, available } => {
            assert_eq!(name, "gamma");
            assert_eq!(available, &vec!["alpha".to_string(), "beta".to_string()]);
        }
        other => panic!("Expected NotFound, got {:?}", other),
    }
    let message = err.to_string();
    assert!(message.contains("not found"));
    assert!(message.contains("alpha, beta"));
}

#[tokio::test]
async fn test_resolve_is_idempotent() {
    let registry = AgentRegistry::new();
    registry
        .register("echo", Category::Analysis, echo_factory("echo", Category::Analysis))
        .await
        .unwrap();

    let first = registry.resolve("echo").await.unwrap();
    let second = registry.resolve("echo").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let ctx = ExecutionContext::new(Category::Analysis, Data::new());
    let a = first(&Dependencies::new()).unwrap().execute(&ctx).await;
    let b = second(&Dependencies::new()).unwrap().execute(&ctx).await;
    assert_eq!(a.data(), b.data());
}

#[tokio::test]
async fn test_list_by_category_and_all() {
    let registry = AgentRegistry::new();
    for (name, category) in [
        ("technical", Category::Analysis),
        ("fundamental", Category::Analysis),
        ("synth", Category::Synthesis),
    ] {
        registry
            .register(name, category, echo_factory(name, category))
            .await
            .unwrap();
    }

    let analysts: Vec<_> = registry
        .list_by_category(Category::Analysis)
        .await
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(analysts, vec!["fundamental", "technical"]);

    assert!(registry.list_by_category(Category::Ranking).await.is_empty());
    assert_eq!(registry.list_all().await.len(), 3);
}

#[tokio::test]
async fn test_unregister_and_clear() {
    let registry = AgentRegistry::new();
    registry
        .register("a", Category::Analysis, echo_factory("a", Category::Analysis))
        .await
        .unwrap();
    registry
        .register("b", Category::Analysis, echo_factory("b", Category::Analysis))
        .await
        .unwrap();

    assert!(registry.unregister("a").await);
    assert!(!registry.unregister("a").await);
    assert!(!registry.contains("a").await);
    assert_eq!(registry.count().await, 1);

    // A freed name can be registered again.
    registry
        .register("a", Category::Risk, echo_factory("a", Category::Risk))
        .await
        .unwrap();

    registry.clear().await;
    assert_eq!(registry.count().await, 0);
}

#[tokio::test]
async fn test_clone_shares_state() {
    let registry = AgentRegistry::new();
    let clone = registry.clone();

    registry
        .register("echo", Category::Analysis, echo_factory("echo", Category::Analysis))
        .await
        .unwrap();
    assert_eq!(clone.count().await, 1);
}
