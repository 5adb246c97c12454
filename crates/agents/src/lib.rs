//! `agents` crate: the `AgentUnit` contract, configuration shapes, the agent
//! registry, and the built-in mock connector agents.
//!
//! Every agent, built-in or test double, implements [`AgentUnit`].
//! The engine crate never names a concrete agent: it instantiates units by
//! `type_id` through an [`AgentRegistry`] it is handed at construction.

pub mod builtin;
pub mod descriptor;
pub mod error;
pub mod extract;
pub mod mock;
pub mod registry;
pub mod shape;
pub mod traits;

pub use descriptor::{AgentCategory, AgentTypeDescriptor};
pub use error::{AgentError, ConfigError, ConfigIssue, RegistryError};
pub use registry::{AgentKind, AgentRegistry};
pub use shape::{ConfigShape, FieldKind, FieldSpec};
pub use traits::{AgentOutput, AgentUnit, ExecutionContext};
