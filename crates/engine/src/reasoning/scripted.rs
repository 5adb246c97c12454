use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use agents::AgentTypeDescriptor;

use super::{ExecutionPlan, ReasoningService, WorkflowChoice, WorkflowSummary};
use crate::ReasoningError;

/// A reasoning service that returns canned answers. For tests.
///
/// Unscripted choices answer "no match"; an unscripted plan is
/// [`ReasoningError::Unavailable`].
#[derive(Debug, Default)]
pub struct ScriptedReasoner {
    choice: Option<Result<WorkflowChoice, ReasoningError>>,
    plan: Option<Result<ExecutionPlan, ReasoningError>>,
    choose_calls: AtomicUsize,
    plan_calls: AtomicUsize,
}

impl ScriptedReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choosing(mut self, workflow_id: impl Into<String>, confidence: f64) -> Self {
        self.choice = Some(Ok(WorkflowChoice {
            workflow_id: Some(workflow_id.into()),
            confidence,
            reasoning: "scripted".into(),
        }));
        self
    }

    pub fn planning(mut self, plan: ExecutionPlan) -> Self {
        self.plan = Some(Ok(plan));
        self
    }

    /// Make every call fail with `err`.
    pub fn failing(mut self, err: ReasoningError) -> Self {
        self.choice = Some(Err(err.clone()));
        self.plan = Some(Err(err));
        self
    }

    pub fn choose_calls(&self) -> usize {
        self.choose_calls.load(Ordering::SeqCst)
    }

    pub fn plan_calls(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoner {
    async fn choose_workflow(
        &self,
        _request: &str,
        _candidates: &[WorkflowSummary],
    ) -> Result<WorkflowChoice, ReasoningError> {
        self.choose_calls.fetch_add(1, Ordering::SeqCst);
        self.choice.clone().unwrap_or_else(|| Ok(WorkflowChoice::none()))
    }

    async fn plan(
        &self,
        _request: &str,
        _catalog: &[AgentTypeDescriptor],
    ) -> Result<ExecutionPlan, ReasoningError> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);
        self.plan
            .clone()
            .unwrap_or_else(|| Err(ReasoningError::Unavailable("no plan scripted".into())))
    }
}
