// ABOUTME: EngineConfig - TOML configuration with ENSEMBLE_* environment
// ABOUTME: overrides, startup validation, and conversion into component configs.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::ChatCompletionsGenerator;
use crate::coordinator::{CoordinatorConfig, MultiFactorPlan, ScreeningPlan};
use crate::dispatch::DispatcherConfig;
use crate::error::{ConfigError, GenerateError};
use crate::executor::ExecutorConfig;

/// Per-agent execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorSection {
    pub agent_timeout_secs: u64,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            agent_timeout_secs: 30,
        }
    }
}

/// Workflow settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowSection {
    /// Bound on the phases before the terminal one.
    pub timeout_secs: u64,
    pub multi_factor: MultiFactorPlan,
    pub screening: ScreeningPlan,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            multi_factor: MultiFactorPlan::default(),
            screening: ScreeningPlan::default(),
        }
    }
}

/// Text-generation backend settings. Unset values keep the client defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendSection {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// Complete engine configuration.
///
/// ```toml
/// [executor]
/// agent_timeout_secs = 30
///
/// [workflow]
/// timeout_secs = 120
///
/// [workflow.screening]
/// max_candidates = 3
///
/// [dispatch]
/// fallback_agent = "strategy_advisor"
///
/// [dispatch.costs]
/// multi_agent = 5
/// single_agent = 1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub executor: ExecutorSection,
    pub workflow: WorkflowSection,
    pub dispatch: DispatcherConfig,
    pub backend: BackendSection,
}

impl EngineConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Apply `ENSEMBLE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `ENSEMBLE_*` overrides from an arbitrary lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ENSEMBLE_AGENT_TIMEOUT_SECS") {
            self.executor.agent_timeout_secs = parse_number("ENSEMBLE_AGENT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("ENSEMBLE_WORKFLOW_TIMEOUT_SECS") {
            self.workflow.timeout_secs = parse_number("ENSEMBLE_WORKFLOW_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("ENSEMBLE_MAX_CANDIDATES") {
            self.workflow.screening.max_candidates = parse_number("ENSEMBLE_MAX_CANDIDATES", &v)?;
        }
        if let Some(v) = get("ENSEMBLE_MULTI_AGENT_COST") {
            self.dispatch.costs.multi_agent = parse_number("ENSEMBLE_MULTI_AGENT_COST", &v)?;
        }
        if let Some(v) = get("ENSEMBLE_SINGLE_AGENT_COST") {
            self.dispatch.costs.single_agent = parse_number("ENSEMBLE_SINGLE_AGENT_COST", &v)?;
        }
        if let Some(v) = get("ENSEMBLE_FALLBACK_AGENT") {
            self.dispatch.fallback_agent = v.trim().to_string();
        }
        if let Some(v) = get("ENSEMBLE_BASE_URL") {
            self.backend.base_url = Some(v);
        }
        if let Some(v) = get("ENSEMBLE_MODEL") {
            self.backend.model = Some(v);
        }
        Ok(())
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executor.agent_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "executor.agent_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.workflow.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "workflow.timeout_secs",
                "must be greater than zero",
            ));
        }

        let plan = &self.workflow.multi_factor;
        if plan.analysts.is_empty() {
            return Err(ConfigError::invalid(
                "workflow.multi_factor.analysts",
                "at least one analyst is required",
            ));
        }
        require_name("workflow.multi_factor.analysts", plan.analysts.iter())?;
        require_name("workflow.multi_factor.strategist", [&plan.strategist])?;
        require_name("workflow.multi_factor.synthesizer", [&plan.synthesizer])?;
        require_distinct(
            "workflow.multi_factor",
            plan.analysts
                .iter()
                .chain([&plan.strategist, &plan.synthesizer]),
        )?;

        let screening = &self.workflow.screening;
        if screening.per_candidate.is_empty() {
            return Err(ConfigError::invalid(
                "workflow.screening.per_candidate",
                "at least one agent is required",
            ));
        }
        if screening.max_candidates == 0 {
            return Err(ConfigError::invalid(
                "workflow.screening.max_candidates",
                "must be greater than zero",
            ));
        }
        require_name("workflow.screening.filter", [&screening.filter])?;
        require_name("workflow.screening.per_candidate", screening.per_candidate.iter())?;
        require_name("workflow.screening.ranker", [&screening.ranker])?;
        require_distinct("workflow.screening.per_candidate", screening.per_candidate.iter())?;

        let costs = self.dispatch.costs;
        if costs.multi_agent == 0 || costs.single_agent == 0 {
            return Err(ConfigError::invalid(
                "dispatch.costs",
                "costs must be greater than zero",
            ));
        }
        if costs.single_agent > costs.multi_agent {
            return Err(ConfigError::invalid(
                "dispatch.costs.single_agent",
                format!(
                    "single-agent cost {} exceeds multi-agent cost {}",
                    costs.single_agent, costs.multi_agent
                ),
            ));
        }
        require_name("dispatch.fallback_agent", [&self.dispatch.fallback_agent])?;

        if let Some(temperature) = self.backend.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::invalid(
                    "backend.temperature",
                    "must be between 0.0 and 2.0",
                ));
            }
        }
        Ok(())
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            agent_timeout: Duration::from_secs(self.executor.agent_timeout_secs),
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            workflow_timeout: Some(Duration::from_secs(self.workflow.timeout_secs)),
            multi_factor: self.workflow.multi_factor.clone(),
            screening: self.workflow.screening.clone(),
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        self.dispatch.clone()
    }

    /// Build the chat-completions client from the environment's API key and
    /// the configured backend settings.
    pub fn generator(&self) -> Result<ChatCompletionsGenerator, GenerateError> {
        let mut generator = ChatCompletionsGenerator::from_env()?;
        if let Some(base_url) = &self.backend.base_url {
            generator = generator.base_url(base_url.as_str());
        }
        if let Some(model) = &self.backend.model {
            generator = generator.model(model.as_str());
        }
        if self.backend.max_tokens.is_some() {
            generator = generator.max_tokens(self.backend.max_tokens);
        }
        Ok(generator.temperature(self.backend.temperature))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a valid number", value)))
}

fn require_name<'a>(
    key: &str,
    names: impl IntoIterator<Item = &'a String>,
) -> Result<(), ConfigError> {
    if names.into_iter().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::invalid(key, "agent names must not be empty"));
    }
    Ok(())
}

/// Result keys are agent names, so one plan may not name an agent twice.
fn require_distinct<'a>(
    key: &str,
    names: impl IntoIterator<Item = &'a String>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::invalid(
                key,
                format!("agent '{}' appears more than once", name),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use crate::dispatch::CostSchedule;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.executor_config().agent_timeout, Duration::from_secs(30));
        assert_eq!(
            config.coordinator_config().workflow_timeout,
            Some(Duration::from_secs(120))
        );
        assert_eq!(config.dispatcher_config().costs, CostSchedule::default());
        assert_eq!(config.dispatch.fallback_agent, "strategy_advisor");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [workflow.screening]
            max_candidates = 3

            [dispatch.costs]
            multi_agent = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.workflow.screening.max_candidates, 3);
        assert_eq!(config.workflow.screening.ranker, "candidate_ranker");
        assert_eq!(config.dispatch.costs.multi_agent, 8);
        assert_eq!(config.dispatch.costs.single_agent, 1);
        assert_eq!(config.executor.agent_timeout_secs, 30);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("[executor]\nagent_timeout = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[workflow.multi_factor]\nanalysts = [\"fundamental_analyst\"]\n\n[backend]\nmodel = \"local-model\""
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.workflow.multi_factor.analysts, vec!["fundamental_analyst"]);
        assert_eq!(config.workflow.multi_factor.strategist, "risk_analyst");
        assert_eq!(config.backend.model.as_deref(), Some("local-model"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ENSEMBLE_AGENT_TIMEOUT_SECS", "12"),
            ("ENSEMBLE_SINGLE_AGENT_COST", "2"),
            ("ENSEMBLE_FALLBACK_AGENT", " risk_analyst "),
            ("ENSEMBLE_MODEL", "gpt-test"),
            ("ENSEMBLE_BASE_URL", ""),
        ]);
        let mut config = EngineConfig::default();

        config
            .apply_env_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.executor.agent_timeout_secs, 12);
        assert_eq!(config.dispatch.costs.single_agent, 2);
        assert_eq!(config.dispatch.fallback_agent, "risk_analyst");
        assert_eq!(config.backend.model.as_deref(), Some("gpt-test"));
        assert_eq!(config.backend.base_url, None);
    }

    #[test]
    fn test_env_override_must_be_numeric() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_env_from(|key| (key == "ENSEMBLE_MULTI_AGENT_COST").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("ENSEMBLE_MULTI_AGENT_COST"));
    }

    #[test]
    fn test_validate_rejects_unrunnable_settings() {
        let mut config = EngineConfig::default();
        config.executor.agent_timeout_secs = 0;
        assert!(config.validate().unwrap_err().to_string().contains("agent_timeout_secs"));

        let mut config = EngineConfig::default();
        config.workflow.multi_factor.analysts.clear();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.dispatch.costs.single_agent = 9;
        assert!(config.validate().unwrap_err().to_string().contains("exceeds"));

        let mut config = EngineConfig::default();
        config.workflow.screening.ranker = " ".into();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.backend.temperature = Some(3.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_typos_are_rejected() {
        let err = EngineConfig::from_toml_str(
            "[workflow.multi_factor]\nanalyst = [\"fundamental_analyst\"]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        assert!(EngineConfig::from_toml_str("[workflow.screening]\nmax_candidate = 2\n").is_err());
        assert!(EngineConfig::from_toml_str("[dispatch.costs]\nmulti = 3\n").is_err());
        assert!(EngineConfig::from_toml_str("[dispatch]\nfallback = \"x\"\n").is_err());
    }

    #[test]
    fn test_validate_rejects_repeated_agents() {
        let mut config = EngineConfig::default();
        config.workflow.multi_factor.strategist = "fundamental_analyst".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("workflow.multi_factor"));
        assert!(err.contains("fundamental_analyst"));

        let mut config = EngineConfig::default();
        config.workflow.multi_factor.analysts.push("technical_analyst".into());
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.workflow.screening.per_candidate = vec!["risk_analyst".into(), "risk_analyst".into()];
        assert!(config.validate().is_err());
    }
}
