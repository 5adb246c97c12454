//! Engine-level error types.

use agents::RegistryError;
use thiserror::Error;

/// Errors raised while authoring, validating or storing a workflow graph.
///
/// Run-time agent failures are *not* errors at this level: they are recorded
/// in the [`Execution`](crate::Execution) and mark it failed.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------

    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// An edge references a node ID that doesn't exist in the graph.
    #[error("edge references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference {
        node_id: String,
        side: &'static str,
    },

    /// The same edge appears more than once; edges form a set.
    #[error("duplicate edge '{from}' -> '{to}'")]
    DuplicateEdge { from: String, to: String },

    /// Topological sort detected a cycle.
    #[error("workflow graph contains a cycle")]
    CycleDetected,

    /// A graph without nodes cannot be executed.
    #[error("workflow graph has no nodes")]
    EmptyGraph,

    /// A node names an unknown agent type or carries an invalid configuration.
    #[error("node '{node_id}' is invalid: {source}")]
    InvalidNode {
        node_id: String,
        #[source]
        source: RegistryError,
    },

    // ------ Persistence errors ------

    /// Ad-hoc graphs live for exactly one execution and are never stored.
    #[error("ad-hoc graph '{0}' cannot be saved as a workflow")]
    AdHocGraph(String),

    /// The workflow id is already taken by another tenant's workflow.
    #[error("workflow '{0}' belongs to another tenant")]
    ForeignWorkflow(String),

    /// A stored definition or record could not be converted back.
    #[error("stored record is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Persistence(#[from] db::DbError),
}

/// Failures of the external reasoning service.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReasoningError {
    /// Transport failure, non-success status, or missing credentials.
    #[error("reasoning service unavailable: {0}")]
    Unavailable(String),

    /// The service answered, but not with the structure that was asked for.
    #[error("reasoning service returned a malformed response: {0}")]
    MalformedResponse(String),
}

/// Failures while turning a request into an ad-hoc graph.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The plan names fewer than two agents.
    #[error("execution plan names {0} agent(s); at least two are required")]
    InsufficientPlan(usize),

    /// The plan names an agent type that is not registered.
    #[error("execution plan names unknown agent type '{0}'")]
    UnknownType(String),

    /// A planned configuration does not satisfy its type's shape.
    #[error("execution plan has an invalid configuration: {0}")]
    Configuration(#[source] RegistryError),

    #[error(transparent)]
    Reasoning(#[from] ReasoningError),
}

impl From<RegistryError> for ComposeError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownType(type_id) => ComposeError::UnknownType(type_id),
            other => ComposeError::Configuration(other),
        }
    }
}

/// Failures of the full request path handled by the supervisor.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("composition failed: {0}")]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
