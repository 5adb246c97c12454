//! Dynamic composer: turns a request into a one-off linear workflow.
//!
//! The reasoning service proposes an ordered plan; every step is checked
//! against the registry before a graph is built, so a hallucinated type or
//! an invalid configuration never reaches the executor.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use agents::{AgentRegistry, AgentTypeDescriptor, ExecutionContext};

use crate::models::{AgentNode, WorkflowGraph};
use crate::reasoning::{ExecutionPlan, ReasoningService};
use crate::ComposeError;

const NAME_PREFIX_CHARS: usize = 50;

pub struct DynamicComposer {
    registry: Arc<AgentRegistry>,
    reasoner: Arc<dyn ReasoningService>,
}

impl DynamicComposer {
    pub fn new(registry: Arc<AgentRegistry>, reasoner: Arc<dyn ReasoningService>) -> Self {
        Self { registry, reasoner }
    }

    /// Ask for a plan and materialise it as an ad-hoc graph.
    ///
    /// # Errors
    /// [`ComposeError::Reasoning`] if the service fails, otherwise whatever
    /// [`DynamicComposer::materialize`] reports.
    #[instrument(skip(self, ctx), fields(tenant = ?ctx.tenant_id))]
    pub async fn compose(&self, request: &str, ctx: &ExecutionContext) -> Result<WorkflowGraph, ComposeError> {
        let catalog: Vec<AgentTypeDescriptor> = self.registry.list_types().into_iter().cloned().collect();

        let plan = self.reasoner.plan(request, &catalog).await.map_err(|err| {
            warn!("planning failed: {}", err);
            ComposeError::from(err)
        })?;

        self.materialize(request, &plan)
    }

    /// Validate `plan` and chain its steps: `agent_1 → agent_2 → …`.
    ///
    /// # Errors
    /// - [`ComposeError::InsufficientPlan`] for fewer than two steps.
    /// - [`ComposeError::UnknownType`] for an unregistered type.
    /// - [`ComposeError::Configuration`] for a configuration the type rejects.
    pub fn materialize(&self, request: &str, plan: &ExecutionPlan) -> Result<WorkflowGraph, ComposeError> {
        if plan.agents.len() < 2 {
            return Err(ComposeError::InsufficientPlan(plan.agents.len()));
        }

        let mut nodes = Vec::with_capacity(plan.agents.len());
        for (idx, step) in plan.agents.iter().enumerate() {
            let descriptor = self.registry.describe(&step.type_id)?;
            let config = self.registry.validate_config(&step.type_id, &step.config)?;

            nodes.push(
                AgentNode::new(format!("agent_{}", idx + 1), step.type_id.clone(), Value::Object(config))
                    .with_name(descriptor.display_name.clone())
                    .at(100.0, 100.0 + idx as f64 * 100.0),
            );
        }

        let graph = WorkflowGraph::linear(adhoc_id(), adhoc_name(request), nodes)
            .with_description(plan.rationale.clone())
            .with_tags(["dynamic"])
            .ad_hoc();

        info!(
            "composed '{}' from plan: {}",
            graph.id,
            graph.type_ids().join(" -> ")
        );
        Ok(graph)
    }
}

pub(crate) fn adhoc_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("adhoc_{}", &id[..8])
}

pub(crate) fn adhoc_name(request: &str) -> String {
    let prefix: String = request.chars().take(NAME_PREFIX_CHARS).collect();
    format!("Dynamic: {prefix}")
}
