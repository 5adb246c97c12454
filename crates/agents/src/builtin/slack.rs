use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::extract::{pick, pick_array, pick_str};
use crate::{
    AgentCategory, AgentError, AgentKind, AgentOutput, AgentTypeDescriptor, AgentUnit,
    ConfigError, ConfigShape, ExecutionContext, FieldKind, FieldSpec,
};

const ITEM_KEYS: &[&str] = &["deals", "records", "items", "issues", "tickets", "employees"];

#[derive(Debug, Deserialize)]
struct Config {
    channel: String,
    message_template: String,
    mention_users: bool,
}

/// Posts a notification to a (mock) Slack channel.
pub struct SlackAgent {
    config: Config,
}

impl SlackAgent {
    fn render(&self, input: &Value) -> String {
        let items = pick_array(input, ITEM_KEYS);
        let count = pick(input, &["count", "total"])
            .and_then(Value::as_u64)
            .unwrap_or(items.len() as u64);
        let headline = pick_str(input, &["message", "summary", "text", "query"], "");

        let body = match self.config.message_template.as_str() {
            "alert" if headline.is_empty() => format!("Alert: {count} new items"),
            "alert" => format!("Alert: {headline}"),
            "summary" => {
                let names: Vec<String> = items
                    .iter()
                    .take(5)
                    .map(|item| pick_str(item, &["name", "title", "summary", "key"], "item"))
                    .collect();
                if names.is_empty() {
                    format!("Summary: found {count} items")
                } else {
                    format!("Summary: found {count} items ({})", names.join(", "))
                }
            }
            _ if !headline.is_empty() => format!("Notification: {headline}"),
            _ => format!("Notification: {input}"),
        };

        if self.config.mention_users {
            format!("@here {body}")
        } else {
            body
        }
    }
}

impl AgentKind for SlackAgent {
    fn descriptor() -> AgentTypeDescriptor {
        AgentTypeDescriptor::new("slack", "Slack Agent", AgentCategory::Communication)
            .with_description("Send messages and notifications to Slack channels")
            .with_icon("message-square")
            .with_connectors(["slack"])
            .with_shape(
                ConfigShape::empty()
                    .field(
                        FieldSpec::required("channel", FieldKind::String)
                            .describe("Channel to post to, e.g. #general"),
                    )
                    .field(
                        FieldSpec::optional(
                            "message_template",
                            FieldKind::one_of(["default", "alert", "summary"]),
                        )
                        .with_default(json!("default")),
                    )
                    .field(
                        FieldSpec::optional("mention_users", FieldKind::Boolean)
                            .with_default(json!(false)),
                    ),
            )
    }

    fn from_config(config: &Map<String, Value>) -> Result<Self, ConfigError> {
        Ok(Self { config: super::typed_config(config)? })
    }
}

#[async_trait]
impl AgentUnit for SlackAgent {
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<AgentOutput, AgentError> {
        let message = self.render(&input);
        let channel = &self.config.channel;

        Ok(AgentOutput::new(json!({
            "channel": channel,
            "message": message,
            "ts": ctx.started_at.timestamp(),
            "delivered": true,
            "data_source": "mock",
        }))
        .with_usage(200, 0.008)
        .with_side_effect(format!("posted message to {channel}")))
    }
}
