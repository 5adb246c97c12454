//! DAG validation: run this before persisting or executing a graph.
//!
//! Rules enforced:
//! 1. Node IDs must be unique within the graph.
//! 2. Every edge must reference valid node IDs (both `source` and `target`)
//!    and appear only once.
//! 3. The directed graph must be acyclic (topological sort must succeed).
//!
//! [`validate_graph`] additionally checks every node against the registry.

use std::collections::{HashMap, HashSet, VecDeque};

use agents::AgentRegistry;

use crate::{models::WorkflowGraph, EngineError};

/// Validate the graph's structure and return node IDs in execution order.
///
/// The order is deterministic: ready nodes are taken in declaration order,
/// so a simple chain always comes back in chain order.
///
/// # Errors
/// - [`EngineError::DuplicateNodeId`] if two nodes share an ID.
/// - [`EngineError::UnknownNodeReference`] if an edge references a missing node.
/// - [`EngineError::DuplicateEdge`] if an edge is listed twice.
/// - [`EngineError::CycleDetected`] if the graph is not acyclic.
pub fn validate_dag(graph: &WorkflowGraph) -> Result<Vec<String>, EngineError> {
    // -----------------------------------------------------------------------
    // 1. Ensure node IDs are unique
    // -----------------------------------------------------------------------
    let mut node_set: HashSet<&str> = HashSet::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        if !node_set.insert(node.id.as_str()) {
            return Err(EngineError::DuplicateNodeId(node.id.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // 2. Validate edge endpoints
    // -----------------------------------------------------------------------
    let mut edge_set: HashSet<(&str, &str)> = HashSet::with_capacity(graph.edges.len());
    for edge in &graph.edges {
        if !node_set.contains(edge.source.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: edge.source.clone(),
                side: "source",
            });
        }
        if !node_set.contains(edge.target.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: edge.target.clone(),
                side: "target",
            });
        }
        if !edge_set.insert((edge.source.as_str(), edge.target.as_str())) {
            return Err(EngineError::DuplicateEdge {
                from: edge.source.clone(),
                to: edge.target.clone(),
            });
        }
    }

    // -----------------------------------------------------------------------
    // 3. Topological sort (Kahn's algorithm)
    // -----------------------------------------------------------------------
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> =
        graph.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();

    for edge in &graph.edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
        *in_degree.entry(edge.target.as_str()).or_insert(0) += 1;
    }

    // Seed with the roots in declaration order, not map order.
    let mut queue: VecDeque<&str> = graph
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(graph.nodes.len());

    while let Some(node_id) = queue.pop_front() {
        sorted.push(node_id.to_owned());

        for &neighbour in adjacency.get(node_id).into_iter().flatten() {
            if let Some(deg) = in_degree.get_mut(neighbour) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(neighbour);
                }
            }
        }
    }

    // If we didn't visit every node the graph contains a cycle.
    if sorted.len() != graph.nodes.len() {
        return Err(EngineError::CycleDetected);
    }

    Ok(sorted)
}

/// Full authoring-time check: structure plus a known type and a valid
/// configuration for every node. Returns the execution order.
///
/// # Errors
/// Everything [`validate_dag`] reports, plus [`EngineError::EmptyGraph`] and
/// [`EngineError::InvalidNode`].
pub fn validate_graph(graph: &WorkflowGraph, registry: &AgentRegistry) -> Result<Vec<String>, EngineError> {
    if graph.nodes.is_empty() {
        return Err(EngineError::EmptyGraph);
    }

    let order = validate_dag(graph)?;

    for node in &graph.nodes {
        registry
            .validate_config(&node.type_id, &node.config)
            .map_err(|source| EngineError::InvalidNode {
                node_id: node.id.clone(),
                source,
            })?;
    }

    Ok(order)
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentNode, Edge};
    use agents::{AgentCategory, AgentTypeDescriptor, ConfigShape, FieldKind, FieldSpec, RegistryError};
    use agents::mock::MockAgent;
    use serde_json::{json, Value};

    fn make_node(id: &str) -> AgentNode {
        AgentNode::new(id, "mock", Value::Null)
    }

    fn make_graph(nodes: Vec<AgentNode>, edges: Vec<Edge>) -> WorkflowGraph {
        WorkflowGraph::new("test", "test", nodes, edges)
    }

    #[test]
    fn valid_linear_dag_returns_sorted_order() {
        // A → B → C
        let graph = make_graph(
            vec![make_node("a"), make_node("b"), make_node("c")],
            vec![Edge::new("a", "b"), Edge::new("b", "c")],
        );

        let sorted = validate_dag(&graph).expect("should be valid");
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn chain_declared_out_of_order_still_sorts_by_edges() {
        let graph = make_graph(
            vec![make_node("c"), make_node("a"), make_node("b")],
            vec![Edge::new("a", "b"), Edge::new("b", "c")],
        );
        assert_eq!(validate_dag(&graph).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn valid_diamond_dag_is_deterministic() {
        //   A
        //  / \
        // B   C
        //  \ /
        //   D
        let graph = make_graph(
            vec![make_node("a"), make_node("b"), make_node("c"), make_node("d")],
            vec![
                Edge::new("a", "b"),
                Edge::new("a", "c"),
                Edge::new("b", "d"),
                Edge::new("c", "d"),
            ],
        );

        let first = validate_dag(&graph).expect("should be valid");
        assert_eq!(first, vec!["a", "b", "c", "d"]);
        for _ in 0..10 {
            assert_eq!(validate_dag(&graph).unwrap(), first);
        }
    }

    #[test]
    fn independent_roots_keep_declaration_order() {
        let graph = make_graph(vec![make_node("z"), make_node("m"), make_node("a")], vec![]);
        assert_eq!(validate_dag(&graph).unwrap(), vec!["z", "m", "a"]);
    }

    #[test]
    fn duplicate_node_id_is_rejected() {
        let graph = make_graph(vec![make_node("a"), make_node("a")], vec![]);
        assert!(matches!(
            validate_dag(&graph),
            Err(EngineError::DuplicateNodeId(id)) if id == "a"
        ));
    }

    #[test]
    fn edge_referencing_missing_node_is_rejected() {
        let graph = make_graph(vec![make_node("a")], vec![Edge::new("a", "ghost")]);
        assert!(matches!(
            validate_dag(&graph),
            Err(EngineError::UnknownNodeReference { node_id, side: "target" }) if node_id == "ghost"
        ));
    }

    #[test]
    fn repeated_edge_is_rejected() {
        let graph = make_graph(
            vec![make_node("a"), make_node("b")],
            vec![Edge::new("a", "b"), Edge::new("a", "b")],
        );
        assert!(matches!(
            validate_dag(&graph),
            Err(EngineError::DuplicateEdge { from, to }) if from == "a" && to == "b"
        ));
    }

    #[test]
    fn cycle_is_detected() {
        // A → B → C → A
        let graph = make_graph(
            vec![make_node("a"), make_node("b"), make_node("c")],
            vec![Edge::new("a", "b"), Edge::new("b", "c"), Edge::new("c", "a")],
        );
        assert!(matches!(validate_dag(&graph), Err(EngineError::CycleDetected)));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let graph = make_graph(vec![make_node("a")], vec![Edge::new("a", "a")]);
        assert!(matches!(validate_dag(&graph), Err(EngineError::CycleDetected)));
    }

    fn registry() -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        let descriptor = AgentTypeDescriptor::new("mock", "Mock", AgentCategory::Analysis).with_shape(
            ConfigShape::empty().field(FieldSpec::required("limit", FieldKind::integer_in(1, 10))),
        );
        registry
            .register(descriptor, MockAgent::returning("mock", json!({})).factory())
            .unwrap();
        registry
    }

    #[test]
    fn validate_graph_checks_every_node_config() {
        let registry = registry();
        let good = AgentNode::new("a", "mock", json!({ "limit": 3 }));
        let bad = AgentNode::new("b", "mock", json!({ "limit": 30 }));
        let graph = make_graph(vec![good, bad], vec![Edge::new("a", "b")]);

        assert!(matches!(
            validate_graph(&graph, &registry),
            Err(EngineError::InvalidNode { node_id, source: RegistryError::Configuration { .. } })
                if node_id == "b"
        ));
    }

    #[test]
    fn validate_graph_rejects_unknown_types_and_empty_graphs() {
        let registry = registry();
        let graph = make_graph(vec![AgentNode::new("a", "nope", json!({}))], vec![]);
        assert!(matches!(
            validate_graph(&graph, &registry),
            Err(EngineError::InvalidNode { source: RegistryError::UnknownType(t), .. }) if t == "nope"
        ));
        assert!(matches!(
            validate_graph(&make_graph(vec![], vec![]), &registry),
            Err(EngineError::EmptyGraph)
        ));
    }
}
