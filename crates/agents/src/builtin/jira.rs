use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::extract::{pick_array, pick_str};
use crate::{
    AgentCategory, AgentError, AgentKind, AgentOutput, AgentTypeDescriptor, AgentUnit,
    ConfigError, ConfigShape, ExecutionContext, FieldKind, FieldSpec,
};

const MAX_ISSUES: usize = 5;
const FIRST_ISSUE_NUMBER: usize = 101;

#[derive(Debug, Deserialize)]
struct Config {
    project_key: String,
    issue_type: String,
    priority: String,
}

/// Files (mock) Jira issues, one per upstream item or one from the input summary.
pub struct JiraAgent {
    config: Config,
}

impl AgentKind for JiraAgent {
    fn descriptor() -> AgentTypeDescriptor {
        AgentTypeDescriptor::new("jira", "Jira Agent", AgentCategory::Action)
            .with_description("Create and track issues in Jira projects")
            .with_icon("clipboard-list")
            .with_connectors(["jira"])
            .with_shape(
                ConfigShape::empty()
                    .field(FieldSpec::required("project_key", FieldKind::String))
                    .field(
                        FieldSpec::optional("issue_type", FieldKind::one_of(["Task", "Bug", "Story"]))
                            .with_default(json!("Task")),
                    )
                    .field(
                        FieldSpec::optional("priority", FieldKind::one_of(["low", "medium", "high"]))
                            .with_default(json!("medium")),
                    ),
            )
    }

    fn from_config(config: &Map<String, Value>) -> Result<Self, ConfigError> {
        Ok(Self { config: super::typed_config(config)? })
    }
}

#[async_trait]
impl AgentUnit for JiraAgent {
    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<AgentOutput, AgentError> {
        let items = pick_array(&input, &["deals", "records", "items", "tickets"]);

        let summaries: Vec<String> = if items.is_empty() {
            let text = match &input {
                Value::String(s) => s.clone(),
                other => pick_str(other, &["summary", "message", "title", "query"], "Follow up"),
            };
            vec![text]
        } else {
            items
                .iter()
                .take(MAX_ISSUES)
                .map(|item| pick_str(item, &["name", "title", "summary", "subject"], "Follow up"))
                .collect()
        };

        let issues: Vec<Value> = summaries
            .iter()
            .enumerate()
            .map(|(i, summary)| {
                json!({
                    "key": format!("{}-{}", self.config.project_key, FIRST_ISSUE_NUMBER + i),
                    "summary": summary,
                    "issue_type": self.config.issue_type,
                    "priority": self.config.priority,
                    "status": "To Do",
                })
            })
            .collect();

        let mut result = AgentOutput::new(json!({
            "project_key": self.config.project_key,
            "count": issues.len(),
            "issues": issues,
            "data_source": "mock",
        }))
        .with_usage(120, 0.005);

        for summary in &summaries {
            result = result.with_side_effect(format!("created {} '{summary}'", self.config.issue_type));
        }
        Ok(result)
    }
}
