//! The reasoning-service contract used by the matcher's semantic tier and by
//! the dynamic composer.
//!
//! A reasoning service is an untrusted oracle: every answer is checked
//! against the candidates or the registry before the engine acts on it.

mod chat_completions;
mod keyword;
mod scripted;

pub use chat_completions::{ChatCompletionsConfig, ChatCompletionsReasoner};
pub use keyword::{draft_config, KeywordReasoner};
pub use scripted::ScriptedReasoner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agents::AgentTypeDescriptor;

use crate::models::WorkflowGraph;
use crate::ReasoningError;

/// What the reasoning service is told about one stored workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Distinct agent types used by the workflow.
    pub agents: Vec<String>,
}

impl From<&WorkflowGraph> for WorkflowSummary {
    fn from(graph: &WorkflowGraph) -> Self {
        Self {
            id: graph.id.clone(),
            name: graph.name.clone(),
            description: graph.description.clone(),
            tags: graph.tags.clone(),
            agents: graph.type_ids().into_iter().map(str::to_owned).collect(),
        }
    }
}

/// The service's pick among the candidate workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowChoice {
    /// `None` when nothing fits.
    #[serde(default, alias = "matched_workflow_id")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl WorkflowChoice {
    pub fn none() -> Self {
        Self { workflow_id: None, confidence: 0.0, reasoning: String::new() }
    }
}

/// How data moves between planned agents. Only sequential chaining exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
    #[default]
    Sequential,
}

/// One step of an execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAgent {
    #[serde(alias = "type")]
    pub type_id: String,
    #[serde(default)]
    pub config: Value,
}

/// An ordered plan of agents to chain for a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub agents: Vec<PlannedAgent>,
    #[serde(default)]
    pub data_flow: FlowMode,
    #[serde(default)]
    pub rationale: String,
}

/// External decision maker for matching and planning.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Pick the candidate that best serves `request`, with a confidence in
    /// `0.0..=1.0`.
    async fn choose_workflow(
        &self,
        request: &str,
        candidates: &[WorkflowSummary],
    ) -> Result<WorkflowChoice, ReasoningError>;

    /// Produce an ordered plan using only types from `catalog`.
    async fn plan(
        &self,
        request: &str,
        catalog: &[AgentTypeDescriptor],
    ) -> Result<ExecutionPlan, ReasoningError>;
}
