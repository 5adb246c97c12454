//! Agent-level error types.

use std::fmt;

use thiserror::Error;

/// Errors returned by an agent's `execute` method.
///
/// The engine never retries: any variant turns the node result into a
/// `failed` result and halts the execution.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgentError {
    /// The agent could not produce an output.
    #[error("{0}")]
    Failed(String),

    /// The (mocked) third-party system behind the agent rejected the call.
    #[error("upstream service error: {0}")]
    Upstream(String),

    /// A failure that consumed tokens or cost before giving up. Displays as
    /// the wrapped error.
    #[error("{error}")]
    Billed {
        error: Box<AgentError>,
        tokens_used: u64,
        cost: f64,
    },
}

impl AgentError {
    /// Attach the usage consumed before the failure. Replaces any usage
    /// attached earlier.
    pub fn with_usage(self, tokens_used: u64, cost: f64) -> Self {
        let error = match self {
            AgentError::Billed { error, .. } => error,
            other => Box::new(other),
        };
        AgentError::Billed { error, tokens_used, cost: cost.max(0.0) }
    }

    /// Tokens and cost consumed before the failure; zero unless attached.
    pub fn usage(&self) -> (u64, f64) {
        match self {
            AgentError::Billed { tokens_used, cost, .. } => (*tokens_used, *cost),
            _ => (0, 0.0),
        }
    }
}

/// What exactly is wrong with one configuration field.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssue {
    /// The whole configuration value is not a JSON object.
    NotAnObject,
    /// A required field is absent (or `null`).
    Missing,
    /// The value has the wrong JSON type.
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// A numeric value lies outside the declared bounds.
    OutOfRange {
        value: String,
        min: Option<String>,
        max: Option<String>,
    },
    /// A string is not one of the declared enum values.
    UnknownVariant { value: String, allowed: Vec<String> },
    /// The agent's own typed configuration rejected the value.
    Invalid(String),
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "configuration must be an object"),
            Self::Missing => write!(f, "missing required field"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::OutOfRange { value, min, max } => {
                write!(f, "value {value} out of range")?;
                match (min, max) {
                    (Some(lo), Some(hi)) => write!(f, " [{lo}, {hi}]"),
                    (Some(lo), None) => write!(f, " (min {lo})"),
                    (None, Some(hi)) => write!(f, " (max {hi})"),
                    (None, None) => Ok(()),
                }
            }
            Self::UnknownVariant { value, allowed } => {
                write!(f, "unrecognized value '{value}' (expected one of: {})", allowed.join(", "))
            }
            Self::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

/// A single configuration validation failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid configuration field '{field}': {issue}")]
pub struct ConfigError {
    /// Offending field name, or `"<root>"` when the whole value is wrong.
    pub field: String,
    pub issue: ConfigIssue,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, issue: ConfigIssue) -> Self {
        Self { field: field.into(), issue }
    }
}

/// Errors produced by the agent registry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    /// A `type_id` was registered twice; the first registration is kept.
    #[error("agent type '{0}' is already registered")]
    DuplicateType(String),

    /// No agent type with this `type_id` exists.
    #[error("unknown agent type '{0}'")]
    UnknownType(String),

    /// The raw configuration does not satisfy the type's declared shape.
    #[error("agent type '{type_id}': {source}")]
    Configuration {
        type_id: String,
        #[source]
        source: ConfigError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billed_failure_keeps_message_and_usage() {
        let err = AgentError::Failed("quota exceeded".into()).with_usage(120, 0.5);
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(err.usage(), (120, 0.5));

        let rebilled = err.with_usage(7, -1.0);
        assert_eq!(rebilled.usage(), (7, 0.0));
        assert_eq!(rebilled.to_string(), "quota exceeded");

        assert_eq!(AgentError::Upstream("503".into()).usage(), (0, 0.0));
    }
}
