// ABOUTME: Workflow types - kinds, phase plans, requests, and the immutable
// ABOUTME: WorkflowResult handed back to callers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{AgentResult, Data};

/// The fixed workflows the coordinator knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Parallel analysts, dependent risk step, final synthesis.
    MultiFactor,
    /// Candidate filter, per-candidate analysis pair, ranking.
    Screening,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::MultiFactor => "multi_factor",
            WorkflowKind::Screening => "screening",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "multi_factor" => Ok(WorkflowKind::MultiFactor),
            "screening" => Ok(WorkflowKind::Screening),
            other => Err(format!("unknown workflow '{}'", other)),
        }
    }
}

/// Agents used by the multi-factor workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MultiFactorPlan {
    /// Independent analysts run in parallel in phase 1.
    pub analysts: Vec<String>,
    /// Dependent agent run in phase 2 over whatever phase 1 produced.
    pub strategist: String,
    /// Terminal agent composing the narrative.
    pub synthesizer: String,
}

impl Default for MultiFactorPlan {
    fn default() -> Self {
        Self {
            analysts: vec![
                "fundamental_analyst".to_string(),
                "technical_analyst".to_string(),
                "sentiment_analyst".to_string(),
            ],
            strategist: "risk_analyst".to_string(),
            synthesizer: "report_synthesizer".to_string(),
        }
    }
}

/// Agents used by the screening workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScreeningPlan {
    /// Single agent producing `data.candidates`.
    pub filter: String,
    /// Agents run in parallel for every candidate.
    pub per_candidate: Vec<String>,
    /// Terminal agent ordering the candidates.
    pub ranker: String,
    /// Upper bound on candidates carried into phase 2.
    pub max_candidates: usize,
}

impl Default for ScreeningPlan {
    fn default() -> Self {
        Self {
            filter: "candidate_filter".to_string(),
            per_candidate: vec![
                "fundamental_analyst".to_string(),
                "technical_analyst".to_string(),
            ],
            ranker: "candidate_ranker".to_string(),
            max_candidates: 5,
        }
    }
}

/// Input to a workflow run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    /// Request input copied into the fresh execution context.
    pub input: Data,
    /// The requesting user, if known.
    pub user_id: Option<String>,
}

impl WorkflowRequest {
    pub fn new(input: Data) -> Self {
        Self {
            input,
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Raw results of one phase, keyed the way the workflow keys agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    /// Phase label, e.g. `analysis`.
    pub name: String,
    /// `(key, result)` pairs in plan order.
    pub results: Vec<(String, AgentResult)>,
}

impl PhaseResult {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_success()).count()
    }
}

/// Success counts across a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub succeeded: usize,
    pub total: usize,
}

impl fmt::Display for WorkflowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} succeeded", self.succeeded, self.total)
    }
}

/// Result of a complete workflow run. Produced once; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub kind: WorkflowKind,
    /// Raw results per phase.
    pub phases: Vec<PhaseResult>,
    /// Data-only view of every attempted agent (failures map to empty data).
    pub flattened: BTreeMap<String, Data>,
    /// Data of the agents that actually produced something, keyed like `flattened`.
    pub aggregate: Data,
    pub summary: WorkflowSummary,
    /// The terminal (synthesis or ranking) result.
    pub outcome: AgentResult,
}

impl WorkflowResult {
    /// Build the result from the phases that ran; `outcome` is the terminal
    /// result, which is also the sole entry of the last phase.
    pub(crate) fn from_phases(
        workflow_id: String,
        kind: WorkflowKind,
        phases: Vec<PhaseResult>,
        outcome: AgentResult,
    ) -> Self {
        let mut flattened = BTreeMap::new();
        let mut aggregate = Data::new();
        let mut succeeded = 0;
        let mut total = 0;

        for phase in &phases {
            for (key, result) in &phase.results {
                total += 1;
                flattened.insert(key.clone(), result.data().clone());
                if result.is_success() {
                    succeeded += 1;
                    aggregate.insert(key.clone(), Value::Object(result.data().clone()));
                }
            }
        }

        Self {
            workflow_id,
            kind,
            phases,
            flattened,
            aggregate,
            summary: WorkflowSummary { succeeded, total },
            outcome,
        }
    }

    /// A workflow fails only when its terminal agent fails.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// The final narrative text, if the terminal agent produced one.
    pub fn narrative(&self) -> Option<&str> {
        self.outcome.data_str("narrative")
    }

    /// Find a phase by name.
    pub fn phase(&self, name: &str) -> Option<&PhaseResult> {
        self.phases.iter().find(|p| p.name == name)
    }
}
