// ABOUTME: Implements the AgentRegistry - a thread-safe map from agent name
// ABOUTME: to descriptor and factory, organized by category.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{Agent, Category, Dependencies};
use crate::error::{AgentError, RegistryError};

/// Builds a fresh agent instance from the injected dependency set.
pub type AgentFactory =
    Arc<dyn Fn(&Dependencies) -> Result<Box<dyn Agent>, AgentError> + Send + Sync>;

/// Identity of a registered agent. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentDescriptor {
    /// Unique name of the agent.
    pub name: String,

    /// Category the agent is listed under.
    pub category: Category,
}

/// A registry entry: descriptor plus factory.
#[derive(Clone)]
pub struct RegisteredAgent {
    pub descriptor: AgentDescriptor,
    pub factory: AgentFactory,
}

impl fmt::Debug for RegisteredAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredAgent")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A thread-safe registry of agents.
///
/// Typically populated once at startup (see [`crate::agents::register_builtin`])
/// and read concurrently afterwards. Clones share the same underlying map.
#[derive(Default)]
pub struct AgentRegistry {
    agents: Arc<RwLock<HashMap<String, RegisteredAgent>>>,
}

impl AgentRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent factory under `name`.
    ///
    /// Fails with [`RegistryError::Duplicate`] if the name is taken; the
    /// existing registration is left untouched.
    pub async fn register<F>(
        &self,
        name: impl Into<String>,
        category: Category,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&Dependencies) -> Result<Box<dyn Agent>, AgentError> + Send + Sync + 'static,
    {
        self.register_arc(name, category, Arc::new(factory)).await
    }

    /// Register an already shared factory.
    pub async fn register_arc(
        &self,
        name: impl Into<String>,
        category: Category,
        factory: AgentFactory,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut agents = self.agents.write().await;
        if agents.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        agents.insert(
            name.clone(),
            RegisteredAgent {
                descriptor: AgentDescriptor { name, category },
                factory,
            },
        );
        Ok(())
    }

    /// Resolve an agent's factory by name.
    pub async fn resolve(&self, name: &str) -> Result<AgentFactory, RegistryError> {
        self.resolve_entry(name).await.map(|entry| entry.factory)
    }

    /// Resolve the full entry (descriptor and factory) by name.
    ///
    /// The not-found error lists every registered name.
    pub async fn resolve_entry(&self, name: &str) -> Result<RegisteredAgent, RegistryError> {
        let agents = self.agents.read().await;
        match agents.get(name) {
            Some(entry) => Ok(entry.clone()),
            None => {
                let mut available: Vec<_> = agents.keys().cloned().collect();
                available.sort();
                Err(RegistryError::NotFound {
                    name: name.to_string(),
                    available,
                })
            }
        }
    }

    /// Get an agent's descriptor by name.
    pub async fn descriptor(&self, name: &str) -> Option<AgentDescriptor> {
        let agents = self.agents.read().await;
        agents.get(name).map(|entry| entry.descriptor.clone())
    }

    /// List descriptors in a category, sorted by name.
    pub async fn list_by_category(&self, category: Category) -> Vec<AgentDescriptor> {
        let agents = self.agents.read().await;
        let mut list: Vec<_> = agents
            .values()
            .filter(|entry| entry.descriptor.category == category)
            .map(|entry| entry.descriptor.clone())
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// List all descriptors, sorted by name.
    pub async fn list_all(&self) -> Vec<AgentDescriptor> {
        let agents = self.agents.read().await;
        let mut list: Vec<_> = agents
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Unregister an agent. Returns whether it was registered.
    pub async fn unregister(&self, name: &str) -> bool {
        let mut agents = self.agents.write().await;
        agents.remove(name).is_some()
    }

    /// Remove every registration.
    pub async fn clear(&self) {
        let mut agents = self.agents.write().await;
        agents.clear();
    }

    /// Whether an agent is registered under `name`.
    pub async fn contains(&self, name: &str) -> bool {
        let agents = self.agents.read().await;
        agents.contains_key(name)
    }

    /// Get the number of registered agents.
    pub async fn count(&self) -> usize {
        let agents = self.agents.read().await;
        agents.len()
    }
}

impl Clone for AgentRegistry {
    fn clone(&self) -> Self {
        Self {
            agents: Arc::clone(&self.agents),
        }
    }
}
