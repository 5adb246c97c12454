use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::extract::pick_f64;
use crate::{
    AgentCategory, AgentError, AgentKind, AgentOutput, AgentTypeDescriptor, AgentUnit,
    ConfigError, ConfigShape, ExecutionContext, FieldKind, FieldSpec,
};

/// (name, account, amount, stage, contact_email)
const DEALS: &[(&str, &str, f64, &str, &str)] = &[
    ("Enterprise renewal", "Acme Corp", 250_000.0, "Negotiation", "cfo@acme.example"),
    ("Platform expansion", "Globex", 180_000.0, "Proposal", "it@globex.example"),
    ("Pilot rollout", "Initech", 45_000.0, "Qualification", "ops@initech.example"),
    ("Data migration", "Umbrella", 120_000.0, "Closed Won", "cto@umbrella.example"),
    ("Support add-on", "Hooli", 15_000.0, "Prospecting", "buyer@hooli.example"),
];

#[derive(Debug, Deserialize)]
struct Config {
    object_type: String,
    min_amount: f64,
    limit: usize,
}

/// Finds CRM opportunities above an amount threshold.
pub struct SalesIntelligenceAgent {
    config: Config,
}

impl AgentKind for SalesIntelligenceAgent {
    fn descriptor() -> AgentTypeDescriptor {
        AgentTypeDescriptor::new("sales_intelligence", "Sales Intelligence Agent", AgentCategory::DataRetrieval)
            .with_description("Find high-value deals and pipeline data in the CRM")
            .with_icon("trending-up")
            .with_connectors(["sfdc", "hubspot"])
            .with_shape(
                ConfigShape::empty()
                    .field(
                        FieldSpec::optional("object_type", FieldKind::one_of(["Opportunity", "Lead", "Account"]))
                            .with_default(json!("Opportunity"))
                            .describe("CRM object to query"),
                    )
                    .field(
                        FieldSpec::optional("min_amount", FieldKind::number_at_least(0.0))
                            .with_default(json!(0))
                            .describe("Only return deals at or above this amount"),
                    )
                    .field(
                        FieldSpec::optional("limit", FieldKind::integer_in(1, 100))
                            .with_default(json!(10)),
                    ),
            )
    }

    fn from_config(config: &Map<String, Value>) -> Result<Self, ConfigError> {
        Ok(Self { config: super::typed_config(config)? })
    }
}

#[async_trait]
impl AgentUnit for SalesIntelligenceAgent {
    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<AgentOutput, AgentError> {
        let threshold = pick_f64(&input, &["min_amount", "amount_threshold", "amount"], self.config.min_amount);
        debug!("querying {} records with amount >= {}", self.config.object_type, threshold);

        let deals: Vec<Value> = DEALS
            .iter()
            .filter(|(_, _, amount, _, _)| *amount >= threshold)
            .take(self.config.limit)
            .map(|(name, account, amount, stage, email)| {
                json!({
                    "name": name,
                    "account": account,
                    "amount": amount,
                    "stage": stage,
                    "contact_email": email,
                })
            })
            .collect();

        let total: f64 = deals.iter().filter_map(|d| d["amount"].as_f64()).sum();
        let count = deals.len();

        Ok(AgentOutput::new(json!({
            "object_type": self.config.object_type,
            "deals": deals,
            "count": count,
            "total_amount": total,
            "data_source": "mock",
        }))
        .with_usage(150, 0.006))
    }
}
