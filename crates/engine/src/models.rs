//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow graph and an
//! execution look like in memory. Both serialise to the JSON `definition` /
//! `record` columns of the `db` rows without loss.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agents::AgentOutput;

// ---------------------------------------------------------------------------
// AgentNode
// ---------------------------------------------------------------------------

/// Canvas coordinates. Carried for editors; ignored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A single agent instance in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentNode {
    /// Unique identifier within this graph (referenced by edges).
    pub id: String,
    /// Maps to a registered agent type.
    #[serde(alias = "type")]
    pub type_id: String,
    /// Display name; defaults to the node id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raw configuration, validated against the type's shape before any run.
    #[serde(default)]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl AgentNode {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>, config: Value) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            name: None,
            config,
            position: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Directed "output of `source` feeds input of `target`" relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(alias = "from")]
    pub source: String,
    #[serde(alias = "to")]
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { source: source.into(), target: target.into() }
    }
}

// ---------------------------------------------------------------------------
// WorkflowGraph
// ---------------------------------------------------------------------------

/// Whether a graph is stored for reuse or synthesized for a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphLifecycle {
    #[default]
    Persistent,
    AdHoc,
}

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<AgentNode>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub lifecycle: GraphLifecycle,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl WorkflowGraph {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        nodes: Vec<AgentNode>,
        edges: Vec<Edge>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            nodes,
            edges,
            tags: Vec::new(),
            lifecycle: GraphLifecycle::Persistent,
            created_at: Utc::now(),
        }
    }

    /// Chain the nodes in the given order: `nodes[0] → nodes[1] → …`.
    pub fn linear(id: impl Into<String>, name: impl Into<String>, nodes: Vec<AgentNode>) -> Self {
        let edges = nodes
            .windows(2)
            .map(|pair| Edge::new(pair[0].id.clone(), pair[1].id.clone()))
            .collect();
        Self::new(id, name, nodes, edges)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn ad_hoc(mut self) -> Self {
        self.lifecycle = GraphLifecycle::AdHoc;
        self
    }

    pub fn is_ad_hoc(&self) -> bool {
        self.lifecycle == GraphLifecycle::AdHoc
    }

    pub fn node(&self, id: &str) -> Option<&AgentNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Distinct agent types used by the graph, in node order.
    pub fn type_ids(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for node in &self.nodes {
            if !seen.contains(&node.type_id.as_str()) {
                seen.push(node.type_id.as_str());
            }
        }
        seen
    }

    /// IDs of the nodes with an edge into `node_id`, in edge order.
    pub fn predecessors(&self, node_id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.target == node_id)
            .map(|e| e.source.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Lifecycle of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExecutionStatus::Pending),
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(format!("unknown execution status '{other}'")),
        }
    }
}

/// Outcome of one node invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Succeeded,
    Failed,
}

// ---------------------------------------------------------------------------
// AgentExecutionResult
// ---------------------------------------------------------------------------

/// What one node produced during one execution. Never modified once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentExecutionResult {
    pub node_id: String,
    pub type_id: String,
    pub status: NodeStatus,
    /// `Value::Null` when the node failed.
    pub output: Value,
    /// Present iff `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tokens_used: u64,
    pub cost: f64,
    #[serde(default)]
    pub side_effects: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
}

impl AgentExecutionResult {
    pub fn succeeded(
        node: &AgentNode,
        produced: AgentOutput,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            node_id: node.id.clone(),
            type_id: node.type_id.clone(),
            status: NodeStatus::Succeeded,
            output: produced.output,
            error: None,
            tokens_used: produced.tokens_used,
            cost: produced.cost.max(0.0),
            side_effects: produced.side_effects,
            started_at,
            finished_at,
            latency_ms: elapsed_ms(started_at, finished_at),
        }
    }

    pub fn failed(
        node: &AgentNode,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            node_id: node.id.clone(),
            type_id: node.type_id.clone(),
            status: NodeStatus::Failed,
            output: Value::Null,
            error: Some(error.into()),
            tokens_used: 0,
            cost: 0.0,
            side_effects: Vec::new(),
            started_at,
            finished_at,
            latency_ms: elapsed_ms(started_at, finished_at),
        }
    }

    /// Usage a failed agent consumed before giving up.
    pub fn with_usage(mut self, tokens_used: u64, cost: f64) -> Self {
        self.tokens_used = tokens_used;
        self.cost = cost.max(0.0);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == NodeStatus::Succeeded
    }
}

fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from((end - start).num_milliseconds()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub node_id: String,
    pub tokens_used: u64,
    pub cost: f64,
    pub latency_ms: u64,
}

/// Totals over every node result of one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub total_tokens: u64,
    pub total_cost: f64,
    pub total_latency_ms: u64,
    pub per_node: Vec<NodeMetrics>,
}

impl ExecutionMetrics {
    /// Recompute the totals from scratch; the same results always give the
    /// same metrics.
    pub fn from_results(results: &[AgentExecutionResult]) -> Self {
        let mut metrics = Self::default();
        for result in results {
            metrics.record(result);
        }
        metrics
    }

    /// Add one node's usage. Integer totals saturate at `u64::MAX`.
    pub fn record(&mut self, result: &AgentExecutionResult) {
        self.total_tokens = self.total_tokens.saturating_add(result.tokens_used);
        self.total_cost += result.cost;
        self.total_latency_ms = self.total_latency_ms.saturating_add(result.latency_ms);
        self.per_node.push(NodeMetrics {
            node_id: result.node_id.clone(),
            tokens_used: result.tokens_used,
            cost: result.cost,
            latency_ms: result.latency_ms,
        });
    }
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Component name used for entries that concern the whole run.
pub const WORKFLOW_COMPONENT: &str = "workflow";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// A node id, or [`WORKFLOW_COMPONENT`].
    pub component: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// One run of a workflow graph.
///
/// Only the executor mutates an `Execution`, and it stops doing so once the
/// status is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub graph_id: String,
    pub status: ExecutionStatus,
    pub input: Value,
    /// One entry per invoked node, in invocation order.
    pub node_results: Vec<AgentExecutionResult>,
    pub metrics: ExecutionMetrics,
    pub logs: Vec<LogEntry>,
    /// Output of the last node, set only when the run completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Value>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Execution {
    pub fn new(id: impl Into<String>, graph_id: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            graph_id: graph_id.into(),
            status: ExecutionStatus::Pending,
            input,
            node_results: Vec::new(),
            metrics: ExecutionMetrics::default(),
            logs: Vec::new(),
            final_output: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn log(&mut self, level: LogLevel, component: &str, message: impl Into<String>) {
        self.logs.push(LogEntry {
            timestamp: Utc::now(),
            level,
            component: component.to_owned(),
            message: message.into(),
        });
    }

    pub fn logs_for_node<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.logs.iter().filter(move |entry| entry.component == node_id)
    }

    pub fn logs_at_or_above(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> + '_ {
        self.logs.iter().filter(move |entry| entry.level >= level)
    }

    /// The first failing node and its error, if the run failed.
    pub fn failure(&self) -> Option<(&str, &str)> {
        self.node_results
            .iter()
            .find(|r| r.status == NodeStatus::Failed)
            .map(|r| (r.node_id.as_str(), r.error.as_deref().unwrap_or_default()))
    }

    pub fn result_for(&self, node_id: &str) -> Option<&AgentExecutionResult> {
        self.node_results.iter().find(|r| r.node_id == node_id)
    }
}
