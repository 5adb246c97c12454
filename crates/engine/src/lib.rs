//! `engine` crate: workflow models, DAG validation, the execution engine,
//! and the request path that matches or composes workflows.

pub mod composer;
pub mod dag;
pub mod error;
pub mod executor;
pub mod keywords;
pub mod matcher;
pub mod models;
pub mod persistence;
pub mod reasoning;
pub mod supervisor;

pub use composer::DynamicComposer;
pub use dag::{validate_dag, validate_graph};
pub use error::{ComposeError, DispatchError, EngineError, ReasoningError};
pub use executor::{ExecutorConfig, WorkflowExecutor};
pub use keywords::KeywordTypeMap;
pub use matcher::{MatchTier, MatcherConfig, TieBreak, WorkflowMatch, WorkflowMatcher};
pub use models::{
    AgentExecutionResult, AgentNode, Edge, Execution, ExecutionMetrics, ExecutionStatus,
    GraphLifecycle, LogEntry, LogLevel, NodeStatus, WorkflowGraph,
};
pub use persistence::WorkflowStore;
pub use reasoning::ReasoningService;
pub use supervisor::{DispatchOutcome, Route, Supervisor, SupervisorConfig};

#[cfg(test)]
mod executor_tests;
