// ABOUTME: Defines all error types for the ensemble library using thiserror.
// ABOUTME: Each boundary has its own error enum, unified under EnsembleError.

/// Top-level error type for the ensemble library.
///
/// Only initialization and boundary calls produce these. Anything that
/// happens while a workflow runs is converted to a failed `AgentResult`.
#[derive(Debug, thiserror::Error)]
pub enum EnsembleError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("Quota error: {0}")]
    Quota(#[from] QuotaError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),
}

/// Errors from agent registration and lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Agent '{0}' is already registered")]
    Duplicate(String),

    #[error("Agent '{name}' not found (registered: {})", format_available(.available))]
    NotFound {
        name: String,
        available: Vec<String>,
    },
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

/// Errors raised inside an agent before they are turned into a failed result.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("missing dependency '{0}'")]
    MissingDependency(String),

    #[error("missing required input '{0}'")]
    MissingInput(String),

    #[error("text generation failed: {0}")]
    Generate(#[from] GenerateError),

    #[error("malformed output: {0}")]
    InvalidOutput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the text-generation backend.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("backend returned no text")]
    EmptyResponse,

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors from the quota accessor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    #[error("insufficient quota for '{user_id}': requested {requested}, remaining {remaining}")]
    Insufficient {
        user_id: String,
        requested: u64,
        remaining: u64,
    },

    #[error("quota backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the background task runner.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task '{0}' not found")]
    NotFound(String),

    #[error("timed out after {timeout_ms}ms waiting for task '{task_id}'")]
    Timeout { task_id: String, timeout_ms: u128 },

    #[error("task store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}
