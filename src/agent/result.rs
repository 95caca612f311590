// ABOUTME: Defines AgentResult - the uniform outcome of one agent invocation,
// ABOUTME: plus the Category enum used to organize agents.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object payload carried by results and contexts.
pub type Data = Map<String, Value>;

/// Category an agent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Independent analyst run during fan-out.
    Analysis,
    /// Dependent step consuming analyst output.
    Risk,
    /// Produces a candidate list.
    Screening,
    /// Orders candidates.
    Ranking,
    /// Composes the final narrative.
    Synthesis,
    /// Single-call advisory path used when multi-agent execution is skipped.
    Advisory,
}

impl Category {
    /// All categories, in declaration order.
    pub const ALL: [Category; 6] = [
        Category::Analysis,
        Category::Risk,
        Category::Screening,
        Category::Ranking,
        Category::Synthesis,
        Category::Advisory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Analysis => "analysis",
            Category::Risk => "risk",
            Category::Screening => "screening",
            Category::Ranking => "ranking",
            Category::Synthesis => "synthesis",
            Category::Advisory => "advisory",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// Outcome of a single agent invocation.
///
/// Either `success` with `data`, or failure with a non-empty `error`.
/// There is no other state: the only constructors are [`AgentResult::success`]
/// and [`AgentResult::failure`]. Deserialization enforces the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredResult")]
pub struct AgentResult {
    agent_name: String,
    category: Category,
    success: bool,
    data: Data,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
    timestamp: DateTime<Utc>,
}

/// Wire form of [`AgentResult`], checked before it becomes one.
#[derive(Deserialize)]
struct StoredResult {
    agent_name: String,
    category: Category,
    success: bool,
    #[serde(default)]
    data: Data,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    duration_ms: Option<u64>,
    timestamp: DateTime<Utc>,
}

impl TryFrom<StoredResult> for AgentResult {
    type Error = String;

    fn try_from(stored: StoredResult) -> Result<Self, Self::Error> {
        match (stored.success, stored.error.as_deref()) {
            (true, Some(_)) => {
                return Err(format!(
                    "result for '{}' is marked successful but carries an error",
                    stored.agent_name
                ));
            }
            (false, None) => {
                return Err(format!(
                    "result for '{}' is marked failed without an error",
                    stored.agent_name
                ));
            }
            (false, Some(error)) if error.trim().is_empty() => {
                return Err(format!(
                    "result for '{}' is marked failed with an empty error",
                    stored.agent_name
                ));
            }
            _ => {}
        }
        Ok(Self {
            agent_name: stored.agent_name,
            category: stored.category,
            success: stored.success,
            data: stored.data,
            error: stored.error,
            duration_ms: stored.duration_ms,
            timestamp: stored.timestamp,
        })
    }
}

impl AgentResult {
    /// Create a successful result.
    pub fn success(agent_name: impl Into<String>, category: Category, data: Data) -> Self {
        Self {
            agent_name: agent_name.into(),
            category,
            success: true,
            data,
            error: None,
            duration_ms: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a failed result. An empty message is replaced with a generic one.
    pub fn failure(
        agent_name: impl Into<String>,
        category: Category,
        error: impl Into<String>,
    ) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "agent failed without a message".to_string();
        }
        Self {
            agent_name: agent_name.into(),
            category,
            success: false,
            data: Data::new(),
            error: Some(error),
            duration_ms: None,
            timestamp: Utc::now(),
        }
    }

    /// Stamp the wall-clock duration of the invocation.
    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Consume the result and return its data.
    pub fn into_data(self) -> Data {
        self.data
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Convenience accessor for a string field in `data`.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}
