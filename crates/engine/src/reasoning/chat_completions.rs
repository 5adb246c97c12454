use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use agents::AgentTypeDescriptor;

use super::{ExecutionPlan, ReasoningService, WorkflowChoice, WorkflowSummary};
use crate::ReasoningError;

const SYSTEM_PROMPT: &str = "You are an AI orchestration planner that matches requests to workflows \
and agents. Always respond with valid JSON only.";

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCompletionsConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip)]
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key: String::new(),
            temperature: 0.3,
            max_tokens: 800,
            timeout_secs: 30,
        }
    }
}

/// Reasoning service backed by `POST {base_url}/chat/completions`.
pub struct ChatCompletionsReasoner {
    client: reqwest::Client,
    config: ChatCompletionsConfig,
}

impl ChatCompletionsReasoner {
    /// # Errors
    /// [`ReasoningError::Unavailable`] when no API key is set or the HTTP
    /// client cannot be built.
    pub fn new(config: ChatCompletionsConfig) -> Result<Self, ReasoningError> {
        if config.api_key.is_empty() {
            return Err(ReasoningError::Unavailable("no API key configured".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReasoningError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn complete(&self, user_prompt: &str) -> Result<String, ReasoningError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        info!("calling reasoning service: {} (model: {})", url, self.config.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReasoningError::Unavailable(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ReasoningError::Unavailable(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            warn!("reasoning service returned {}", status);
            return Err(ReasoningError::Unavailable(format!("API returned {status}: {text}")));
        }

        let payload: Value = serde_json::from_str(&text)
            .map_err(|e| ReasoningError::MalformedResponse(format!("response is not JSON: {e}")))?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| ReasoningError::MalformedResponse("missing choices[0].message.content".into()))?;

        debug!("reasoning service answered: {}", content);
        Ok(content.trim().to_owned())
    }
}

#[async_trait]
impl ReasoningService for ChatCompletionsReasoner {
    async fn choose_workflow(
        &self,
        request: &str,
        candidates: &[WorkflowSummary],
    ) -> Result<WorkflowChoice, ReasoningError> {
        if candidates.is_empty() {
            return Ok(WorkflowChoice::none());
        }
        let content = self.complete(&choice_prompt(request, candidates)).await?;
        parse_json(&content)
    }

    async fn plan(
        &self,
        request: &str,
        catalog: &[AgentTypeDescriptor],
    ) -> Result<ExecutionPlan, ReasoningError> {
        let content = self.complete(&plan_prompt(request, catalog)).await?;
        parse_json(&content)
    }
}

fn choice_prompt(request: &str, candidates: &[WorkflowSummary]) -> String {
    let listing = serde_json::to_string_pretty(candidates).unwrap_or_default();
    format!(
        r#"User request: "{request}"

Available workflows:
{listing}

Task: decide which workflow (if any) best serves the request. A workflow only
matches if it uses the agents the request actually needs.

Return JSON:
{{"matched_workflow_id": "<id>" or null, "confidence": 0.0-1.0, "reasoning": "<why>"}}"#
    )
}

fn plan_prompt(request: &str, catalog: &[AgentTypeDescriptor]) -> String {
    let agents: Vec<Value> = catalog.iter().map(AgentTypeDescriptor::to_metadata).collect();
    let listing = serde_json::to_string_pretty(&agents).unwrap_or_default();
    format!(
        r#"Create an execution plan for a multi-agent workflow.

User request: "{request}"

Available agents (with configuration schemas):
{listing}

Rules:
- Use only agent ids listed above; the first agent retrieves or analyses data,
  later agents act on it (send, create, update).
- Each config must satisfy that agent's schema.

Return JSON only:
{{"agents": [{{"type": "<agent id>", "config": {{}}}}], "data_flow": "sequential", "rationale": "<why>"}}"#
    )
}

/// Parse a JSON object out of a model reply, tolerating ``` fences and prose
/// around it.
fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, ReasoningError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let body = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => return Err(ReasoningError::MalformedResponse(format!("no JSON object in: {content}"))),
    };
    serde_json::from_str(body).map_err(|e| ReasoningError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::FlowMode;

    #[test]
    fn parses_fenced_choice() {
        let reply = "```json\n{\"matched_workflow_id\": \"wf_1\", \"confidence\": 0.9, \"reasoning\": \"same agents\"}\n```";
        let choice: WorkflowChoice = parse_json(reply).unwrap();
        assert_eq!(choice.workflow_id.as_deref(), Some("wf_1"));
        assert!((choice.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_plan_with_legacy_type_key() {
        let reply = r##"Here you go: {"agents": [{"type": "sales_intelligence", "config": {}}, {"type": "slack", "config": {"channel": "#sales"}}], "data_flow": "sequential"}"##;
        let plan: ExecutionPlan = parse_json(reply).unwrap();
        assert_eq!(plan.agents.len(), 2);
        assert_eq!(plan.agents[1].type_id, "slack");
        assert_eq!(plan.data_flow, FlowMode::Sequential);
    }

    #[test]
    fn prose_without_json_is_malformed() {
        assert!(matches!(
            parse_json::<ExecutionPlan>("I cannot help with that"),
            Err(ReasoningError::MalformedResponse(_))
        ));
    }

    #[test]
    fn missing_api_key_is_unavailable() {
        assert!(matches!(
            ChatCompletionsReasoner::new(ChatCompletionsConfig::default()),
            Err(ReasoningError::Unavailable(_))
        ));
    }

    // ------ HTTP path ------

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reasoner_for(server: &MockServer) -> ChatCompletionsReasoner {
        ChatCompletionsReasoner::new(ChatCompletionsConfig {
            base_url: format!("{}/v1/", server.uri()),
            api_key: "test-key".into(),
            timeout_secs: 5,
            ..ChatCompletionsConfig::default()
        })
        .expect("api key is set")
    }

    fn completion(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    fn catalog() -> Vec<AgentTypeDescriptor> {
        vec![AgentTypeDescriptor::new("slack", "Slack", agents::AgentCategory::Communication)]
    }

    #[tokio::test]
    async fn fenced_plan_is_fetched_with_bearer_auth() {
        let server = MockServer::start().await;
        let reply = "```json\n{\"agents\": [{\"type\": \"sales_intelligence\", \"config\": {}}, {\"type\": \"slack\", \"config\": {\"channel\": \"#sales\"}}], \"data_flow\": \"sequential\", \"rationale\": \"fetch then notify\"}\n```";
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(reply)))
            .expect(1)
            .mount(&server)
            .await;

        let plan = reasoner_for(&server).plan("tell #sales about deals", &catalog()).await.unwrap();

        assert_eq!(plan.agents.len(), 2);
        assert_eq!(plan.agents[0].type_id, "sales_intelligence");
        assert_eq!(plan.agents[1].config, json!({ "channel": "#sales" }));
        assert_eq!(plan.rationale, "fetch then notify");
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = reasoner_for(&server).plan("anything", &catalog()).await.unwrap_err();
        assert!(matches!(err, ReasoningError::Unavailable(ref msg) if msg.contains("500")), "{err:?}");
    }

    #[tokio::test]
    async fn body_without_message_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let candidates = vec![WorkflowSummary {
            id: "wf_1".into(),
            name: "Sales deal alerts".into(),
            description: String::new(),
            tags: vec!["sales".into()],
            agents: vec!["slack".into()],
        }];
        let err = reasoner_for(&server).choose_workflow("deals", &candidates).await.unwrap_err();
        assert!(matches!(err, ReasoningError::MalformedResponse(_)), "{err:?}");
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = reasoner_for(&server).plan("anything", &catalog()).await.unwrap_err();
        assert!(matches!(err, ReasoningError::MalformedResponse(_)), "{err:?}");
    }

    #[test]
    fn plan_prompt_lists_every_agent() {
        let catalog = vec![
            AgentTypeDescriptor::new("slack", "Slack", agents::AgentCategory::Communication),
            AgentTypeDescriptor::new("jira", "Jira", agents::AgentCategory::Action),
        ];
        let prompt = plan_prompt("notify the team", &catalog);
        assert!(prompt.contains("\"slack\"") && prompt.contains("\"jira\""));
        assert!(prompt.contains("notify the team"));
    }
}
