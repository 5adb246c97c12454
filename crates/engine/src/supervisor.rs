//! Supervisor: the full request path from natural language to a stored
//! execution record.
//!
//! 1. Match the request against the tenant's stored workflows.
//! 2. Reject a match that lacks an agent type the request clearly needs.
//! 3. Without a match, run a single agent when exactly one type is needed,
//!    otherwise compose an ad-hoc chain.
//! 4. Execute through the one `WorkflowExecutor` and save the execution.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use agents::{AgentRegistry, ExecutionContext};

use crate::composer::{adhoc_id, adhoc_name, DynamicComposer};
use crate::keywords::KeywordTypeMap;
use crate::matcher::{MatchTier, MatcherConfig, WorkflowMatcher};
use crate::models::{AgentNode, Execution, WorkflowGraph};
use crate::persistence::WorkflowStore;
use crate::reasoning::{draft_config, ReasoningService};
use crate::{DispatchError, EngineError, ExecutorConfig, WorkflowExecutor};

/// Tenant used when the context does not name one.
pub const DEFAULT_TENANT: &str = "default";

#[derive(Debug, Clone, Default)]
pub struct SupervisorConfig {
    pub executor: ExecutorConfig,
    pub matcher: MatcherConfig,
    pub keywords: KeywordTypeMap,
}

/// How a request was served.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    StoredWorkflow {
        workflow_id: String,
        tier: MatchTier,
        confidence: f64,
    },
    SingleAgent {
        type_id: String,
    },
    Composed {
        agents: Vec<String>,
        rationale: String,
    },
}

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub route: Route,
    /// The graph that ran; ad-hoc for the single-agent and composed routes.
    pub graph: WorkflowGraph,
    pub execution: Execution,
}

pub struct Supervisor {
    registry: Arc<AgentRegistry>,
    executor: WorkflowExecutor,
    matcher: WorkflowMatcher,
    composer: DynamicComposer,
    store: WorkflowStore,
    keywords: KeywordTypeMap,
}

impl Supervisor {
    pub fn new(
        registry: Arc<AgentRegistry>,
        store: WorkflowStore,
        reasoner: Arc<dyn ReasoningService>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            executor: WorkflowExecutor::new(registry.clone(), config.executor),
            matcher: WorkflowMatcher::new(config.matcher, config.keywords.clone(), reasoner.clone()),
            composer: DynamicComposer::new(registry.clone(), reasoner),
            store,
            keywords: config.keywords,
            registry,
        }
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    /// Serve `request`, feeding `input` to the first agent(s).
    ///
    /// # Errors
    /// [`DispatchError::Compose`] when no workflow matched and composition
    /// failed; [`DispatchError::Engine`] for invalid graphs or storage
    /// failures. A failed agent is reported inside the returned execution.
    #[instrument(skip(self, input, ctx), fields(tenant = ?ctx.tenant_id))]
    pub async fn handle(
        &self,
        request: &str,
        input: Value,
        ctx: &ExecutionContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        let tenant = ctx.tenant_id.as_deref().unwrap_or(DEFAULT_TENANT);
        let candidates = self.store.list_workflows(tenant).await?;
        let needed: Vec<String> = self
            .keywords
            .infer_types(request)
            .into_iter()
            .filter(|type_id| self.registry.contains(type_id))
            .collect();

        if let Some(hit) = self.matcher.find_match(request, &candidates).await {
            let available = hit.graph.type_ids();
            let missing: Vec<&str> = needed
                .iter()
                .map(String::as_str)
                .filter(|t| !available.contains(t))
                .collect();

            if missing.is_empty() {
                let route = Route::StoredWorkflow {
                    workflow_id: hit.graph.id.clone(),
                    tier: hit.tier,
                    confidence: hit.confidence,
                };
                let graph = hit.graph.clone();
                return self.run(route, graph, input, ctx).await;
            }
            info!("ignoring match '{}': it lacks {:?}", hit.graph.id, missing);
        }

        if let [type_id] = needed.as_slice() {
            let graph = self.single_agent_graph(type_id, request)?;
            let route = Route::SingleAgent { type_id: type_id.clone() };
            return self.run(route, graph, input, ctx).await;
        }

        let graph = self.composer.compose(request, ctx).await?;
        let route = Route::Composed {
            agents: graph.type_ids().into_iter().map(str::to_owned).collect(),
            rationale: graph.description.clone(),
        };
        self.run(route, graph, input, ctx).await
    }

    fn single_agent_graph(&self, type_id: &str, request: &str) -> Result<WorkflowGraph, EngineError> {
        let descriptor = self.registry.describe(type_id).map_err(|source| EngineError::InvalidNode {
            node_id: "agent_1".into(),
            source,
        })?;
        let node = AgentNode::new("agent_1", type_id, draft_config(descriptor, request))
            .with_name(descriptor.display_name.clone())
            .at(100.0, 100.0);
        Ok(WorkflowGraph::new(adhoc_id(), adhoc_name(request), vec![node], Vec::new()).ad_hoc())
    }

    async fn run(
        &self,
        route: Route,
        graph: WorkflowGraph,
        input: Value,
        ctx: &ExecutionContext,
    ) -> Result<DispatchOutcome, DispatchError> {
        let run_ctx = ctx.for_run(graph.id.clone(), Uuid::new_v4().to_string());
        info!("dispatching to '{}' via {:?}", graph.id, route);

        let execution = self.executor.execute_with_context(&graph, input, &run_ctx).await?;
        self.store.save_execution(&execution, ctx.tenant_id.as_deref()).await?;

        Ok(DispatchOutcome { route, graph, execution })
    }
}
