// ABOUTME: Dependencies - a named map of collaborators injected into agents
// ABOUTME: at construction time, looked up by name and concrete type.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::TextGenerator;
use crate::error::AgentError;

/// Well-known key for the text-generation backend.
pub const TEXT_GENERATOR: &str = "text_generator";

/// Named set of collaborators handed to agent factories.
///
/// Values are opaque capability tokens to the engine. Cloning is cheap and
/// shares the underlying collaborators.
#[derive(Clone, Default)]
pub struct Dependencies {
    entries: Arc<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Dependencies {
    /// Create an empty dependency set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collaborator under `name`.
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        Arc::make_mut(&mut self.entries).insert(name.into(), Arc::new(value));
        self
    }

    /// Add the text-generation backend under [`TEXT_GENERATOR`].
    pub fn with_text_generator(self, generator: Arc<dyn TextGenerator>) -> Self {
        self.with(TEXT_GENERATOR, generator)
    }

    /// Look up a collaborator by name and type.
    pub fn get<T: Any + Send + Sync + Clone>(&self, name: &str) -> Option<T> {
        self.entries
            .get(name)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// Look up a collaborator, failing with `MissingDependency` when absent.
    pub fn require<T: Any + Send + Sync + Clone>(&self, name: &str) -> Result<T, AgentError> {
        self.get(name)
            .ok_or_else(|| AgentError::MissingDependency(name.to_string()))
    }

    /// The text-generation backend.
    pub fn text_generator(&self) -> Result<Arc<dyn TextGenerator>, AgentError> {
        self.require(TEXT_GENERATOR)
    }

    /// Whether a collaborator is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("names", &self.names())
            .finish()
    }
}
