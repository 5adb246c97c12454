//! Built-in agents backed by mocked enterprise APIs.
//!
//! The payloads they return are illustrative only; what matters is that each
//! declares a configuration shape and reads upstream data defensively.

mod email_outreach;
mod jira;
mod sales_intelligence;
mod slack;

pub use email_outreach::EmailOutreachAgent;
pub use jira::JiraAgent;
pub use sales_intelligence::SalesIntelligenceAgent;
pub use slack::SlackAgent;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{AgentRegistry, ConfigError, ConfigIssue, RegistryError};

/// Register every built-in agent type.
///
/// # Errors
/// [`RegistryError::DuplicateType`] if any of them is already registered.
pub fn register_builtins(registry: &mut AgentRegistry) -> Result<(), RegistryError> {
    registry.register_kind::<SalesIntelligenceAgent>()?;
    registry.register_kind::<SlackAgent>()?;
    registry.register_kind::<JiraAgent>()?;
    registry.register_kind::<EmailOutreachAgent>()?;
    Ok(())
}

/// Deserialize a validated configuration into an agent's typed config struct.
fn typed_config<T: DeserializeOwned>(config: &Map<String, Value>) -> Result<T, ConfigError> {
    serde_json::from_value(Value::Object(config.clone()))
        .map_err(|e| ConfigError::new("<root>", ConfigIssue::Invalid(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExecutionContext;
    use serde_json::json;

    fn registry() -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        register_builtins(&mut registry).expect("builtins register once");
        registry
    }

    #[test]
    fn builtins_register_once() {
        let mut registry = registry();
        assert_eq!(registry.len(), 4);
        assert!(matches!(
            register_builtins(&mut registry),
            Err(RegistryError::DuplicateType(_))
        ));
    }

    #[tokio::test]
    async fn deals_flow_into_slack_summary() {
        let registry = registry();
        let ctx = ExecutionContext::new("wf", "exec");

        let crm = registry
            .create("sales_intelligence", &json!({ "min_amount": 100000 }))
            .expect("valid config");
        let slack = registry
            .create("slack", &json!({ "channel": "#sales", "message_template": "summary" }))
            .expect("valid config");

        let deals = crm.execute(json!({}), &ctx).await.expect("crm succeeds");
        assert!(deals.output["count"].as_u64().unwrap() > 0);

        let posted = slack.execute(deals.output, &ctx).await.expect("slack succeeds");
        assert_eq!(posted.output["channel"], "#sales");
        assert!(posted.output["message"].as_str().unwrap().contains("Summary"));
        assert_eq!(posted.side_effects.len(), 1);
    }

    #[tokio::test]
    async fn agents_tolerate_unexpected_input() {
        let registry = registry();
        let ctx = ExecutionContext::new("wf", "exec");

        for (type_id, config) in [
            ("sales_intelligence", json!({})),
            ("slack", json!({ "channel": "#general" })),
            ("jira", json!({ "project_key": "OPS" })),
            ("email_outreach", json!({})),
        ] {
            let agent = registry.create(type_id, &config).expect("valid config");
            for input in [Value::Null, json!("free text"), json!([1, 2, 3]), json!({ "deals": "?" })] {
                assert!(
                    agent.execute(input.clone(), &ctx).await.is_ok(),
                    "{type_id} failed on {input}"
                );
            }
        }
    }

    #[test]
    fn slack_requires_a_channel() {
        assert!(matches!(
            registry().create("slack", &json!({})),
            Err(RegistryError::Configuration { .. })
        ));
    }
}
