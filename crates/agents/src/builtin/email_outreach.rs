use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::extract::{pick_array, pick_str};
use crate::{
    AgentCategory, AgentError, AgentKind, AgentOutput, AgentTypeDescriptor, AgentUnit,
    ConfigError, ConfigShape, ExecutionContext, FieldKind, FieldSpec,
};

#[derive(Debug, Deserialize)]
struct Config {
    template: String,
    sender: String,
    max_recipients: usize,
}

/// Drafts and "sends" outreach emails to contacts found upstream.
pub struct EmailOutreachAgent {
    config: Config,
}

impl AgentKind for EmailOutreachAgent {
    fn descriptor() -> AgentTypeDescriptor {
        AgentTypeDescriptor::new("email_outreach", "Email Outreach Agent", AgentCategory::Communication)
            .with_description("Draft and send personalised outreach emails")
            .with_icon("mail")
            .with_connectors(["outlook", "gmail"])
            .with_shape(
                ConfigShape::empty()
                    .field(
                        FieldSpec::optional("template", FieldKind::one_of(["intro", "follow_up", "summary"]))
                            .with_default(json!("intro")),
                    )
                    .field(
                        FieldSpec::optional("sender", FieldKind::String)
                            .with_default(json!("sales@example.com")),
                    )
                    .field(
                        FieldSpec::optional("max_recipients", FieldKind::integer_in(1, 50))
                            .with_default(json!(10)),
                    ),
            )
    }

    fn from_config(config: &Map<String, Value>) -> Result<Self, ConfigError> {
        Ok(Self { config: super::typed_config(config)? })
    }
}

#[async_trait]
impl AgentUnit for EmailOutreachAgent {
    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<AgentOutput, AgentError> {
        let recipients: Vec<String> = pick_array(&input, &["deals", "contacts", "records", "employees"])
            .iter()
            .map(|item| pick_str(item, &["contact_email", "email", "work_email"], ""))
            .filter(|email| email.contains('@'))
            .take(self.config.max_recipients)
            .collect();

        let mut result = AgentOutput::new(json!({
            "template": self.config.template,
            "sender": self.config.sender,
            "emails_sent": recipients.len(),
            "recipients": recipients,
            "data_source": "mock",
        }))
        .with_usage(300 * recipients.len() as u64, 0.01 * recipients.len() as f64);

        for to in &recipients {
            result = result.with_side_effect(format!("sent {} email to {to}", self.config.template));
        }
        Ok(result)
    }
}
