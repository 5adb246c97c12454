//! Workflow execution engine.
//!
//! `WorkflowExecutor` is the central orchestrator:
//! 1. Validates the graph (structure and every node's configuration) and
//!    produces a topological ordering. Nothing runs if this fails.
//! 2. Iterates through nodes in order, instantiating each through the
//!    [`AgentRegistry`] and awaiting it before starting the next.
//! 3. Passes predecessor output as input to the next node.
//! 4. Stops at the first failed node (fail-fast). There is no retry.
//! 5. Records per-node results, metrics and log entries on the `Execution`.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

use agents::{AgentOutput, AgentRegistry, AgentUnit, ExecutionContext};

use crate::dag::validate_graph;
use crate::models::{
    AgentExecutionResult, Execution, ExecutionStatus, LogLevel, WorkflowGraph, WORKFLOW_COMPONENT,
};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutorConfig {
    /// Upper bound on a single node invocation. An elapsed timeout fails the
    /// node with the error `"timeout"`. `None` waits forever.
    pub node_timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Stateless orchestrator that runs workflow graphs.
///
/// Cheap to clone; concurrent executions share only the read-only registry.
#[derive(Clone)]
pub struct WorkflowExecutor {
    registry: Arc<AgentRegistry>,
    config: ExecutorConfig,
}

impl WorkflowExecutor {
    pub fn new(registry: Arc<AgentRegistry>, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Run `graph` with a fresh context bound to `execution_id`.
    ///
    /// # Errors
    /// See [`WorkflowExecutor::execute_with_context`].
    pub async fn execute_workflow(
        &self,
        graph: &WorkflowGraph,
        initial_input: Value,
        execution_id: &str,
    ) -> Result<Execution, EngineError> {
        let ctx = ExecutionContext::new(graph.id.clone(), execution_id);
        self.execute_with_context(graph, initial_input, &ctx).await
    }

    /// Run `graph` to completion or first failure.
    ///
    /// A failing agent does not make this return `Err`: the returned
    /// `Execution` has status `Failed` and names the node.
    ///
    /// # Errors
    /// Returns `EngineError` when the graph is invalid (cycle, unknown
    /// reference, unknown type, bad configuration). No node has been invoked
    /// in that case.
    #[instrument(
        skip(self, graph, initial_input, ctx),
        fields(graph_id = %graph.id, execution_id = %ctx.execution_id)
    )]
    pub async fn execute_with_context(
        &self,
        graph: &WorkflowGraph,
        initial_input: Value,
        ctx: &ExecutionContext,
    ) -> Result<Execution, EngineError> {
        // ------------------------------------------------------------------
        // Validate, order and instantiate before anything runs.
        // ------------------------------------------------------------------
        let order = validate_graph(graph, &self.registry)?;

        let mut units: HashMap<&str, Box<dyn AgentUnit>> = HashMap::with_capacity(order.len());
        for node in &graph.nodes {
            let unit = self
                .registry
                .create(&node.type_id, &node.config)
                .map_err(|source| EngineError::InvalidNode { node_id: node.id.clone(), source })?;
            units.insert(node.id.as_str(), unit);
        }

        let mut execution = Execution::new(ctx.execution_id.clone(), graph.id.clone(), initial_input.clone());
        execution.status = ExecutionStatus::Running;
        execution.log(
            LogLevel::Info,
            WORKFLOW_COMPONENT,
            format!("started workflow '{}' ({} nodes)", graph.name, graph.nodes.len()),
        );
        execution.log(
            LogLevel::Debug,
            WORKFLOW_COMPONENT,
            format!("execution order: {}", order.join(" -> ")),
        );
        info!("executing {} nodes in order: {:?}", order.len(), order);

        // ------------------------------------------------------------------
        // Execute nodes sequentially.
        // ------------------------------------------------------------------
        let mut outputs: HashMap<&str, Value> = HashMap::with_capacity(order.len());

        for node_id in &order {
            let Some(node) = graph.node(node_id) else { continue };
            let Some(unit) = units.get(node_id.as_str()) else { continue };

            let input = resolve_input(&graph.predecessors(node_id), &outputs, &initial_input);

            execution.log(
                LogLevel::Info,
                node_id,
                format!("starting '{}' ({})", node.display_name(), node.type_id),
            );

            let started_at = Utc::now();
            let outcome = self.invoke(unit.as_ref(), input, ctx).await;
            let finished_at = Utc::now();

            let result = match outcome {
                Ok(produced) => AgentExecutionResult::succeeded(node, produced, started_at, finished_at),
                Err(failure) => AgentExecutionResult::failed(node, failure.message, started_at, finished_at)
                    .with_usage(failure.tokens_used, failure.cost),
            };
            execution.metrics.record(&result);

            if let Some(message) = result.error.clone() {
                error!("node '{}' failed: {}", node_id, message);
                execution.log(LogLevel::Error, node_id, format!("failed: {message}"));
                execution.node_results.push(result);
                execution.status = ExecutionStatus::Failed;
                execution.finished_at = Some(Utc::now());
                execution.log(
                    LogLevel::Error,
                    WORKFLOW_COMPONENT,
                    format!("workflow failed at node '{node_id}'"),
                );
                return Ok(execution);
            }

            info!("node '{}' succeeded in {}ms", node_id, result.latency_ms);
            execution.log(
                LogLevel::Info,
                node_id,
                format!(
                    "succeeded in {}ms ({} tokens, cost {:.4})",
                    result.latency_ms, result.tokens_used, result.cost
                ),
            );
            outputs.insert(node.id.as_str(), result.output.clone());
            execution.node_results.push(result);
        }

        // ------------------------------------------------------------------
        // Mark execution as completed.
        // ------------------------------------------------------------------
        execution.final_output = order.last().and_then(|id| outputs.remove(id.as_str()));
        execution.status = ExecutionStatus::Completed;
        execution.finished_at = Some(Utc::now());
        execution.log(
            LogLevel::Info,
            WORKFLOW_COMPONENT,
            format!(
                "workflow completed ({} tokens, cost {:.4})",
                execution.metrics.total_tokens, execution.metrics.total_cost
            ),
        );
        info!("execution {} completed", execution.id);

        Ok(execution)
    }

    // -----------------------------------------------------------------------
    // Internal: invoke one agent, turning errors, panics and timeouts into a
    // `NodeFailure`.
    // -----------------------------------------------------------------------

    async fn invoke(
        &self,
        unit: &dyn AgentUnit,
        input: Value,
        ctx: &ExecutionContext,
    ) -> Result<AgentOutput, NodeFailure> {
        let call = AssertUnwindSafe(unit.execute(input, ctx)).catch_unwind();

        let outcome = match self.config.node_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!("node exceeded timeout of {:?}", limit);
                    return Err(NodeFailure::unbilled("timeout"));
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(produced)) => Ok(produced),
            Ok(Err(err)) => {
                let (tokens_used, cost) = err.usage();
                Err(NodeFailure { message: err.to_string(), tokens_used, cost })
            }
            Err(payload) => Err(NodeFailure::unbilled(format!(
                "agent panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}

/// Why a node failed, plus whatever usage the agent reported with the error.
struct NodeFailure {
    message: String,
    tokens_used: u64,
    cost: f64,
}

impl NodeFailure {
    fn unbilled(message: impl Into<String>) -> Self {
        Self { message: message.into(), tokens_used: 0, cost: 0.0 }
    }
}

/// Input for a node given the outputs produced so far.
///
/// Roots get the initial input, a single predecessor's output passes through
/// untouched, and several predecessors are merged into an object keyed by
/// predecessor id.
fn resolve_input(predecessors: &[&str], outputs: &HashMap<&str, Value>, initial_input: &Value) -> Value {
    match predecessors {
        [] => initial_input.clone(),
        [only] => outputs.get(only).cloned().unwrap_or(Value::Null),
        many => {
            let merged: Map<String, Value> = many
                .iter()
                .map(|id| ((*id).to_owned(), outputs.get(id).cloned().unwrap_or(Value::Null)))
                .collect();
            Value::Object(merged)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}
