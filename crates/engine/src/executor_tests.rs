//! Engine tests for `WorkflowExecutor`.
//!
//! Every agent here is a `MockAgent` registered under its own type id, so the
//! tests can assert exactly which nodes ran and what input each one received.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use agents::mock::MockAgent;
use agents::{AgentCategory, AgentRegistry, AgentTypeDescriptor, ConfigShape, FieldKind, FieldSpec};

use crate::models::{AgentNode, Edge, ExecutionStatus, LogLevel, NodeStatus, WorkflowGraph};
use crate::{EngineError, ExecutorConfig, WorkflowExecutor};

/// Register each mock under its own `type_id`.
fn registry_with(mocks: &[(&str, &MockAgent)]) -> AgentRegistry {
    let mut registry = AgentRegistry::new();
    for (type_id, mock) in mocks {
        let descriptor = AgentTypeDescriptor::new(*type_id, *type_id, AgentCategory::Analysis);
        registry.register(descriptor, mock.factory()).expect("unique mock type");
    }
    registry
}

fn executor(registry: AgentRegistry) -> WorkflowExecutor {
    WorkflowExecutor::new(Arc::new(registry), ExecutorConfig::default())
}

/// ids[0] → ids[1] → … with node `i` using type `types[i]`.
fn chain(ids: &[&str], types: &[&str]) -> WorkflowGraph {
    let nodes = ids
        .iter()
        .zip(types)
        .map(|(id, type_id)| AgentNode::new(*id, *type_id, json!({})))
        .collect();
    WorkflowGraph::linear("wf-test", "test chain", nodes)
}

// ============================================================
// Propagation
// ============================================================

#[tokio::test]
async fn three_node_chain_completes_with_last_output() {
    let a = MockAgent::returning("a", json!({ "n": 1 }));
    let b = MockAgent::returning("b", json!({ "n": 2 }));
    let c = MockAgent::returning("c", json!({ "n": 3 }));
    let exec = executor(registry_with(&[("type_a", &a), ("type_b", &b), ("type_c", &c)]));

    let graph = WorkflowGraph::linear(
        "wf-three",
        "three",
        vec![
            AgentNode::new("n1", "type_a", json!({ "x": 1 })),
            AgentNode::new("n2", "type_b", json!({ "y": 2 })),
            AgentNode::new("n3", "type_c", json!({})),
        ],
    );

    let execution = exec
        .execute_workflow(&graph, json!({ "start": true }), "exec-1")
        .await
        .expect("valid graph");

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.node_results.len(), 3);
    assert_eq!(execution.final_output, Some(json!({ "n": 3 })));
    assert_eq!(execution.id, "exec-1");
    assert_eq!(execution.graph_id, "wf-three");
    assert!(execution.failure().is_none());

    // Configs reach the factories validated, extras preserved.
    assert_eq!(a.configs()[0].get("x"), Some(&json!(1)));
    assert_eq!(b.configs()[0].get("y"), Some(&json!(2)));
}

#[tokio::test]
async fn downstream_input_is_upstream_output_exactly() {
    let upstream_output = json!({ "deals": [{ "name": "Acme", "amount": 1.5 }], "count": 1 });
    let a = MockAgent::returning("a", upstream_output.clone());
    let b = MockAgent::returning("b", json!(null));
    let exec = executor(registry_with(&[("a", &a), ("b", &b)]));

    exec.execute_workflow(&chain(&["first", "second"], &["a", "b"]), json!("seed"), "e")
        .await
        .unwrap();

    assert_eq!(a.calls(), vec![json!("seed")]);
    assert_eq!(b.calls(), vec![upstream_output]);
}

#[tokio::test]
async fn join_node_receives_outputs_keyed_by_predecessor() {
    let root = MockAgent::returning("root", json!({ "r": 0 }));
    let left = MockAgent::returning("left", json!({ "l": 1 }));
    let right = MockAgent::returning("right", json!({ "r": 2 }));
    let join = MockAgent::returning("join", json!("joined"));
    let exec = executor(registry_with(&[
        ("root", &root),
        ("left", &left),
        ("right", &right),
        ("join", &join),
    ]));

    let graph = WorkflowGraph::new(
        "diamond",
        "diamond",
        vec![
            AgentNode::new("root", "root", Value::Null),
            AgentNode::new("left", "left", Value::Null),
            AgentNode::new("right", "right", Value::Null),
            AgentNode::new("join", "join", Value::Null),
        ],
        vec![
            Edge::new("root", "left"),
            Edge::new("root", "right"),
            Edge::new("left", "join"),
            Edge::new("right", "join"),
        ],
    );

    let execution = exec.execute_workflow(&graph, json!({}), "e").await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    let order: Vec<&str> = execution.node_results.iter().map(|r| r.node_id.as_str()).collect();
    assert_eq!(order, vec!["root", "left", "right", "join"]);
    assert_eq!(join.calls(), vec![json!({ "left": { "l": 1 }, "right": { "r": 2 } })]);
    assert_eq!(execution.final_output, Some(json!("joined")));
}

// ============================================================
// Fail-fast
// ============================================================

#[tokio::test]
async fn failing_first_node_stops_the_chain() {
    let a = MockAgent::failing("a", "timeout");
    let b = MockAgent::returning("b", json!({}));
    let exec = executor(registry_with(&[("a", &a), ("b", &b)]));

    let execution = exec
        .execute_workflow(&chain(&["n1", "n2"], &["a", "b"]), json!({}), "e")
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.node_results.len(), 1);
    assert_eq!(execution.node_results[0].status, NodeStatus::Failed);
    assert_eq!(execution.failure(), Some(("n1", "timeout")));
    assert_eq!(execution.final_output, None);
    assert!(execution.finished_at.is_some());
    assert_eq!(b.call_count(), 0);
}

#[tokio::test]
async fn failure_skips_every_reachable_node() {
    // root → bad → after: `after` must never run.
    let root = MockAgent::returning("root", json!(1));
    let bad = MockAgent::failing("bad", "boom");
    let after = MockAgent::returning("after", json!(3));
    let exec = executor(registry_with(&[("root", &root), ("bad", &bad), ("after", &after)]));

    let graph = WorkflowGraph::new(
        "g",
        "g",
        vec![
            AgentNode::new("root", "root", Value::Null),
            AgentNode::new("bad", "bad", Value::Null),
            AgentNode::new("after", "after", Value::Null),
        ],
        vec![Edge::new("root", "bad"), Edge::new("bad", "after")],
    );

    let execution = exec.execute_workflow(&graph, json!({}), "e").await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.failure(), Some(("bad", "boom")));
    assert_eq!(after.call_count(), 0);
}

#[tokio::test]
async fn panicking_agent_becomes_a_failed_result() {
    let a = MockAgent::panicking("a", "kaboom");
    let b = MockAgent::returning("b", json!({}));
    let exec = executor(registry_with(&[("a", &a), ("b", &b)]));

    let execution = exec
        .execute_workflow(&chain(&["n1", "n2"], &["a", "b"]), json!({}), "e")
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    let (node, error) = execution.failure().unwrap();
    assert_eq!(node, "n1");
    assert!(error.contains("kaboom"), "unexpected error: {error}");
    assert_eq!(b.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_agent_times_out() {
    let slow = MockAgent::delayed("slow", Duration::from_secs(60), json!({}));
    let next = MockAgent::returning("next", json!({}));
    let registry = registry_with(&[("slow", &slow), ("next", &next)]);
    let exec = WorkflowExecutor::new(
        Arc::new(registry),
        ExecutorConfig { node_timeout: Some(Duration::from_secs(5)) },
    );

    let execution = exec
        .execute_workflow(&chain(&["n1", "n2"], &["slow", "next"]), json!({}), "e")
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.node_results.len(), 1);
    assert_eq!(execution.failure(), Some(("n1", "timeout")));
    assert_eq!(next.call_count(), 0);
}

// ============================================================
// Validation happens before any invocation
// ============================================================

#[tokio::test]
async fn cyclic_graph_invokes_nothing() {
    let a = MockAgent::returning("a", json!({}));
    let b = MockAgent::returning("b", json!({}));
    let exec = executor(registry_with(&[("a", &a), ("b", &b)]));

    let mut graph = chain(&["n1", "n2"], &["a", "b"]);
    graph.edges.push(Edge::new("n2", "n1"));

    let result = exec.execute_workflow(&graph, json!({}), "e").await;
    assert!(matches!(result, Err(EngineError::CycleDetected)));
    assert_eq!(a.call_count(), 0);
    assert_eq!(b.call_count(), 0);
}

#[tokio::test]
async fn repeated_edge_is_rejected_before_any_invocation() {
    let a = MockAgent::returning("a", json!({ "n": 1 }));
    let b = MockAgent::returning("b", json!({}));
    let exec = executor(registry_with(&[("a", &a), ("b", &b)]));

    let mut graph = chain(&["n1", "n2"], &["a", "b"]);
    graph.edges.push(Edge::new("n1", "n2"));

    let result = exec.execute_workflow(&graph, json!({}), "e").await;
    assert!(matches!(
        result,
        Err(EngineError::DuplicateEdge { from, to }) if from == "n1" && to == "n2"
    ));
    assert_eq!(a.call_count(), 0);
    assert_eq!(b.call_count(), 0);
}

#[tokio::test]
async fn invalid_config_on_a_later_node_invokes_nothing() {
    let a = MockAgent::returning("a", json!({}));
    let strict = MockAgent::returning("strict", json!({}));

    let mut registry = registry_with(&[("a", &a)]);
    registry
        .register(
            AgentTypeDescriptor::new("strict", "Strict", AgentCategory::Action)
                .with_shape(ConfigShape::empty().field(FieldSpec::required("channel", FieldKind::String))),
            strict.factory(),
        )
        .unwrap();
    let exec = executor(registry);

    let result = exec
        .execute_workflow(&chain(&["n1", "n2"], &["a", "strict"]), json!({}), "e")
        .await;

    assert!(matches!(result, Err(EngineError::InvalidNode { node_id, .. }) if node_id == "n2"));
    assert_eq!(a.call_count(), 0);
}

// ============================================================
// Metrics and logs
// ============================================================

#[tokio::test]
async fn metrics_are_the_sum_of_node_usage() {
    let a = MockAgent::returning("a", json!(1)).with_usage(100, 0.25);
    let b = MockAgent::returning("b", json!(2)).with_usage(50, 0.125);
    let exec = executor(registry_with(&[("a", &a), ("b", &b)]));

    let execution = exec
        .execute_workflow(&chain(&["n1", "n2"], &["a", "b"]), json!({}), "e")
        .await
        .unwrap();

    assert_eq!(execution.metrics.total_tokens, 150);
    assert!((execution.metrics.total_cost - 0.375).abs() < 1e-12);
    assert_eq!(execution.metrics.per_node.len(), 2);
    assert_eq!(
        execution.metrics,
        crate::models::ExecutionMetrics::from_results(&execution.node_results)
    );
}

#[tokio::test]
async fn huge_token_counts_saturate_the_totals() {
    let a = MockAgent::returning("a", json!(1)).with_usage(u64::MAX, 0.0);
    let b = MockAgent::returning("b", json!(2)).with_usage(1, 0.0);
    let exec = executor(registry_with(&[("a", &a), ("b", &b)]));

    let execution = exec
        .execute_workflow(&chain(&["n1", "n2"], &["a", "b"]), json!({}), "e")
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.metrics.total_tokens, u64::MAX);
    assert_eq!(execution.node_results[1].tokens_used, 1);
}

#[tokio::test]
async fn failed_node_usage_is_counted() {
    let a = MockAgent::returning("a", json!(1)).with_usage(100, 0.25);
    let b = MockAgent::failing("b", "rate limited").with_usage(40, 0.5);
    let exec = executor(registry_with(&[("a", &a), ("b", &b)]));

    let execution = exec
        .execute_workflow(&chain(&["n1", "n2"], &["a", "b"]), json!({}), "e")
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.failure(), Some(("n2", "rate limited")));
    assert_eq!(execution.node_results[1].tokens_used, 40);
    assert_eq!(execution.metrics.total_tokens, 140);
    assert!((execution.metrics.total_cost - 0.75).abs() < 1e-12);
}

#[tokio::test]
async fn logs_are_filterable_by_node_and_level() {
    let a = MockAgent::returning("a", json!(1));
    let b = MockAgent::failing("b", "bad input");
    let exec = executor(registry_with(&[("a", &a), ("b", &b)]));

    let execution = exec
        .execute_workflow(&chain(&["n1", "n2"], &["a", "b"]), json!({}), "e")
        .await
        .unwrap();

    assert_eq!(execution.logs_for_node("n1").count(), 2);
    let errors: Vec<_> = execution.logs_at_or_above(LogLevel::Error).collect();
    assert!(errors.iter().any(|e| e.component == "n2" && e.message.contains("bad input")));
    assert!(errors.iter().any(|e| e.component == "workflow"));
    assert!(execution.logs_at_or_above(LogLevel::Debug).count() > errors.len());
}

#[tokio::test]
async fn context_identity_reaches_the_execution() {
    let a = MockAgent::returning("a", json!(1));
    let exec = executor(registry_with(&[("a", &a)]));
    let graph = chain(&["only"], &["a"]);

    let ctx = agents::ExecutionContext::new(graph.id.clone(), "ctx-exec").with_tenant("acme");
    let execution = exec.execute_with_context(&graph, json!({}), &ctx).await.unwrap();

    assert_eq!(execution.id, "ctx-exec");
    assert_eq!(execution.status, ExecutionStatus::Completed);
}
