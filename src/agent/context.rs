// ABOUTME: Defines ExecutionContext - the per-invocation container threaded
// ABOUTME: through agents, with typed helpers over the reserved result keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{Category, Data};

/// Prefix of the keys under which sequential steps publish their data.
pub const RESULT_KEY_PREFIX: &str = "_result_";

/// Key holding every result gathered before the terminal phase.
pub const ALL_RESULTS_KEY: &str = "_all_results";

/// Key holding the candidate a per-candidate agent should analyze.
pub const CANDIDATE_KEY: &str = "candidate";

/// Key holding the user's strategy text.
pub const STRATEGY_KEY: &str = "strategy";

/// Returns the reserved input key for an agent's published result.
pub fn result_key(agent_name: &str) -> String {
    format!("{}{}", RESULT_KEY_PREFIX, agent_name)
}

/// Per-invocation data container.
///
/// Always built fresh for one workflow call. Parallel branches only ever
/// see it through a shared reference; it is mutated between steps by the
/// task that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Identifier of the workflow invocation this context belongs to.
    pub workflow_id: String,

    /// Category of the work being performed.
    pub category: Category,

    /// Original request input plus accumulated results.
    pub input: Data,

    /// The requesting user, if known.
    pub user_id: Option<String>,

    /// Free-form metadata (request origin, tracing ids, etc.).
    pub metadata: Data,
}

impl ExecutionContext {
    /// Create a context with a fresh workflow id.
    pub fn new(category: Category, input: Data) -> Self {
        Self {
            workflow_id: Uuid::new_v4().to_string(),
            category,
            input,
            user_id: None,
            metadata: Data::new(),
        }
    }

    /// Set the workflow id.
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = workflow_id.into();
        self
    }

    /// Set the requesting user.
    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set an input entry.
    pub fn set_input(&mut self, key: impl Into<String>, value: Value) {
        self.input.insert(key.into(), value);
    }

    /// Read a string input.
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(Value::as_str)
    }

    /// Publish an agent's data under its reserved key.
    pub fn set_result(&mut self, agent_name: &str, data: Data) {
        self.input.insert(result_key(agent_name), Value::Object(data));
    }

    /// Remove an agent's published data, if any.
    pub fn clear_result(&mut self, agent_name: &str) {
        self.input.remove(&result_key(agent_name));
    }

    /// Data published by an earlier step, if that step succeeded.
    pub fn prior_result(&self, agent_name: &str) -> Option<&Data> {
        self.input
            .get(&result_key(agent_name))
            .and_then(Value::as_object)
    }

    /// All published results, keyed by agent name, in key order.
    pub fn prior_results(&self) -> Vec<(&str, &Data)> {
        let mut results: Vec<_> = self
            .input
            .iter()
            .filter_map(|(key, value)| {
                let name = key.strip_prefix(RESULT_KEY_PREFIX)?;
                Some((name, value.as_object()?))
            })
            .collect();
        results.sort_by(|a, b| a.0.cmp(b.0));
        results
    }

    /// The aggregated results placed before the terminal phase.
    pub fn all_results(&self) -> Option<&Data> {
        self.input.get(ALL_RESULTS_KEY).and_then(Value::as_object)
    }
}
