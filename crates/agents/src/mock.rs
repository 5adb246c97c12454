//! `MockAgent`: a test double for `AgentUnit`.
//!
//! Useful in unit and integration tests where a real agent implementation is
//! either unavailable or irrelevant. Clones share their call log, so a test can
//! keep one handle while the registry factory hands out others.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::{AgentError, AgentOutput, AgentUnit, ConfigError, ExecutionContext};

/// Behaviour injected into `MockAgent` at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Return this exact JSON value as the output.
    ReturnValue(Value),
    /// Fail with `AgentError::Failed`, billed with the mock's usage if any.
    Fail(String),
    /// Panic inside `execute`.
    Panic(String),
    /// Sleep, then return the value.
    Delay(Duration, Value),
}

/// A mock agent that records every call it receives and returns a
/// programmer-specified result.
#[derive(Debug, Clone)]
pub struct MockAgent {
    /// Label used in test assertions.
    pub name: String,
    pub behaviour: MockBehaviour,
    pub tokens_used: u64,
    pub cost: f64,
    /// All inputs seen by this agent (in call order).
    calls: Arc<Mutex<Vec<Value>>>,
    /// Configurations this agent was built with, one per factory call.
    configs: Arc<Mutex<Vec<Map<String, Value>>>>,
}

impl MockAgent {
    fn with_behaviour(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            tokens_used: 0,
            cost: 0.0,
            calls: Arc::new(Mutex::new(Vec::new())),
            configs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self::with_behaviour(name, MockBehaviour::ReturnValue(value))
    }

    /// Create a mock that always fails with the given message.
    pub fn failing(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviour(name, MockBehaviour::Fail(msg.into()))
    }

    /// Create a mock that panics when executed.
    pub fn panicking(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviour(name, MockBehaviour::Panic(msg.into()))
    }

    /// Create a mock that sleeps for `delay` before succeeding.
    pub fn delayed(name: impl Into<String>, delay: Duration, value: Value) -> Self {
        Self::with_behaviour(name, MockBehaviour::Delay(delay, value))
    }

    /// Report this usage on every call, failed ones included.
    pub fn with_usage(mut self, tokens_used: u64, cost: f64) -> Self {
        self.tokens_used = tokens_used;
        self.cost = cost;
        self
    }

    /// Registry factory handing out clones of this mock.
    pub fn factory(
        &self,
    ) -> impl Fn(&Map<String, Value>) -> Result<Box<dyn AgentUnit>, ConfigError> + Send + Sync + 'static {
        let template = self.clone();
        move |config| {
            template.configs.lock().push(config.clone());
            Ok(Box::new(template.clone()) as Box<dyn AgentUnit>)
        }
    }

    /// Number of times this agent has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Inputs received so far.
    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().clone()
    }

    /// Configurations passed to the factory so far.
    pub fn configs(&self) -> Vec<Map<String, Value>> {
        self.configs.lock().clone()
    }
}

#[async_trait]
impl AgentUnit for MockAgent {
    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<AgentOutput, AgentError> {
        self.calls.lock().push(input);

        let value = match &self.behaviour {
            MockBehaviour::ReturnValue(v) => v.clone(),
            MockBehaviour::Fail(msg) => {
                let err = AgentError::Failed(msg.clone());
                if self.tokens_used == 0 && self.cost == 0.0 {
                    return Err(err);
                }
                return Err(err.with_usage(self.tokens_used, self.cost));
            }
            MockBehaviour::Panic(msg) => panic!("{}", msg),
            MockBehaviour::Delay(delay, v) => {
                tokio::time::sleep(*delay).await;
                v.clone()
            }
        };

        Ok(AgentOutput::new(value).with_usage(self.tokens_used, self.cost))
    }
}
