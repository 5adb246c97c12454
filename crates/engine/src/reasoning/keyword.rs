use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use agents::{AgentCategory, AgentTypeDescriptor, FieldKind};

use super::{ExecutionPlan, FlowMode, PlannedAgent, ReasoningService, WorkflowChoice, WorkflowSummary};
use crate::keywords::KeywordTypeMap;
use crate::matcher::jaccard;
use crate::ReasoningError;

/// Deterministic offline reasoner built on a [`KeywordTypeMap`].
///
/// Used when no language model is configured. Plans put data retrieval first
/// and communication last, and fill required configuration from the request
/// where it can.
#[derive(Debug, Clone, Default)]
pub struct KeywordReasoner {
    keywords: KeywordTypeMap,
}

impl KeywordReasoner {
    pub fn new(keywords: KeywordTypeMap) -> Self {
        Self { keywords }
    }
}

#[async_trait]
impl ReasoningService for KeywordReasoner {
    async fn choose_workflow(
        &self,
        request: &str,
        candidates: &[WorkflowSummary],
    ) -> Result<WorkflowChoice, ReasoningError> {
        let needed = self.keywords.infer_types(request);
        if needed.is_empty() {
            return Ok(WorkflowChoice::none());
        }

        let mut best: Option<(&WorkflowSummary, f64)> = None;
        for candidate in candidates {
            let score = jaccard(&needed, &candidate.agents);
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((candidate, score));
            }
        }

        Ok(match best {
            Some((candidate, confidence)) => WorkflowChoice {
                workflow_id: Some(candidate.id.clone()),
                confidence,
                reasoning: format!("agent overlap {confidence:.2} with '{}'", candidate.name),
            },
            None => WorkflowChoice::none(),
        })
    }

    async fn plan(
        &self,
        request: &str,
        catalog: &[AgentTypeDescriptor],
    ) -> Result<ExecutionPlan, ReasoningError> {
        let mut steps: Vec<&AgentTypeDescriptor> = self
            .keywords
            .infer_types(request)
            .iter()
            .filter_map(|type_id| catalog.iter().find(|d| &d.type_id == type_id))
            .collect();
        steps.sort_by_key(|d| stage(d.category));
        debug!("keyword plan for '{}': {:?}", request, steps.iter().map(|d| &d.type_id).collect::<Vec<_>>());

        Ok(ExecutionPlan {
            agents: steps
                .into_iter()
                .map(|d| PlannedAgent { type_id: d.type_id.clone(), config: draft_config(d, request) })
                .collect(),
            data_flow: FlowMode::Sequential,
            rationale: "retrieve data first, then act on it".into(),
        })
    }
}

fn stage(category: AgentCategory) -> u8 {
    match category {
        AgentCategory::DataRetrieval => 0,
        AgentCategory::Analysis => 1,
        AgentCategory::Action => 2,
        AgentCategory::Communication => 3,
    }
}

/// A configuration for `descriptor` with every required field filled.
///
/// Channel-like fields take a `#channel` mentioned in the request. Other
/// required fields get the first allowed value or the lower bound.
pub fn draft_config(descriptor: &AgentTypeDescriptor, request: &str) -> Value {
    let mentioned_channel = request.split_whitespace().find_map(|word| {
        let channel = word.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '_');
        (channel.len() > 1 && channel.starts_with('#')).then_some(channel)
    });

    let mut config = Map::new();
    for field in &descriptor.configuration_shape.fields {
        if !field.required || field.default.is_some() {
            continue;
        }
        let value = match &field.kind {
            FieldKind::String if field.name.contains("channel") => {
                Value::from(mentioned_channel.unwrap_or("#general"))
            }
            FieldKind::String if field.name.ends_with("key") => Value::from("GEN"),
            FieldKind::String => Value::from(field.name.replace('_', " ")),
            FieldKind::Integer { min, .. } => Value::from(min.unwrap_or(0)),
            FieldKind::Number { min, .. } => Value::from(min.unwrap_or(0.0)),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::Enum { values } => values.first().cloned().map(Value::from).unwrap_or(Value::Null),
            FieldKind::Object => Value::Object(Map::new()),
            FieldKind::Array => Value::Array(Vec::new()),
        };
        config.insert(field.name.clone(), value);
    }
    Value::Object(config)
}
