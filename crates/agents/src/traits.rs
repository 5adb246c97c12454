//! The `AgentUnit` trait: the contract every agent must fulfil.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AgentError;

/// Shared context passed to every agent during one execution.
///
/// Built once by the engine and handed out by reference; agents only read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// ID of the graph being executed (stored or ad-hoc).
    pub workflow_id: String,
    /// ID of the current execution run.
    pub execution_id: String,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    /// When the execution started.
    pub started_at: DateTime<Utc>,
    /// Free-form extra values supplied by the caller.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ExecutionContext {
    pub fn new(workflow_id: impl Into<String>, execution_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            execution_id: execution_id.into(),
            tenant_id: None,
            user_id: None,
            started_at: Utc::now(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Same caller identity, rebound to another graph and execution.
    pub fn for_run(&self, workflow_id: impl Into<String>, execution_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            execution_id: execution_id.into(),
            started_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// What a successful agent invocation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub output: Value,
    pub tokens_used: u64,
    pub cost: f64,
    /// Human-readable record of external effects (messages sent, records created).
    pub side_effects: Vec<String>,
}

impl AgentOutput {
    pub fn new(output: Value) -> Self {
        Self {
            output,
            tokens_used: 0,
            cost: 0.0,
            side_effects: Vec::new(),
        }
    }

    pub fn with_usage(mut self, tokens_used: u64, cost: f64) -> Self {
        self.tokens_used = tokens_used;
        self.cost = cost.max(0.0);
        self
    }

    pub fn with_side_effect(mut self, effect: impl Into<String>) -> Self {
        self.side_effects.push(effect.into());
        self
    }
}

/// The core agent trait.
///
/// `input` is whatever the preceding node produced (or the initial input for
/// a root node). Implementations must tolerate missing or differently-shaped
/// fields; see [`crate::extract`].
#[async_trait]
pub trait AgentUnit: Send + Sync {
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<AgentOutput, AgentError>;
}
