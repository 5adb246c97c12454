//! `agentflow.toml` settings.
//!
//! Every table and field is optional:
//!
//! ```toml
//! [matcher]
//! keyword_threshold = 0.5
//! tie_break = "first_in_order"
//!
//! [matcher.keywords]
//! slack = ["slack", "notify"]
//!
//! [executor]
//! node_timeout_secs = 30
//!
//! [reasoning]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [storage]
//! url = "file://./agentflow-data"
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use engine::reasoning::ChatCompletionsConfig;
use engine::{ExecutorConfig, KeywordTypeMap, MatcherConfig, SupervisorConfig};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub matcher: MatcherSettings,
    pub executor: ExecutorSettings,
    pub reasoning: ReasoningSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatcherSettings {
    #[serde(flatten)]
    pub thresholds: MatcherConfig,
    /// Replaces the built-in keyword table when present.
    pub keywords: Option<KeywordTypeMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub node_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReasoningSettings {
    #[serde(flatten)]
    pub chat: ChatCompletionsConfig,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            chat: ChatCompletionsConfig::default(),
            api_key_env: "OPENAI_API_KEY".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { url: "memory://".into() }
    }
}

impl Settings {
    /// Read settings from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            executor: self.executor_config(),
            matcher: self.matcher.thresholds.clone(),
            keywords: self.matcher.keywords.clone().unwrap_or_default(),
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            node_timeout: self.executor.node_timeout_secs.map(Duration::from_secs),
        }
    }

    /// The chat-completions config with the API key read from the
    /// environment; `None` when the variable is unset or empty.
    pub fn chat_config(&self) -> Option<ChatCompletionsConfig> {
        let api_key = std::env::var(&self.reasoning.api_key_env).ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(ChatCompletionsConfig { api_key, ..self.reasoning.chat.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::TieBreak;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.storage.url, "memory://");
        assert_eq!(settings.executor_config().node_timeout, None);
        assert_eq!(settings.supervisor_config().matcher, MatcherConfig::default());
    }

    #[test]
    fn tables_override_defaults() {
        let settings = Settings::parse(
            r#"
            [matcher]
            composition_threshold = 0.6
            tie_break = "last_in_order"

            [matcher.keywords]
            jira = ["ticket"]

            [executor]
            node_timeout_secs = 5

            [reasoning]
            model = "local-model"
            api_key_env = "AGENTFLOW_TEST_UNSET_KEY"

            [storage]
            url = "file:///tmp/agentflow"
            "#,
        )
        .unwrap();

        let supervisor = settings.supervisor_config();
        assert_eq!(supervisor.matcher.tie_break, TieBreak::LastInOrder);
        assert!((supervisor.matcher.composition_threshold - 0.6).abs() < f64::EPSILON);
        assert!((supervisor.matcher.keyword_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(supervisor.keywords.infer_types("open a ticket"), vec!["jira"]);
        assert_eq!(supervisor.executor.node_timeout, Some(Duration::from_secs(5)));
        assert_eq!(settings.reasoning.chat.model, "local-model");
        assert_eq!(settings.storage.url, "file:///tmp/agentflow");
        assert!(settings.chat_config().is_none());
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\nurl = \"memory\"").unwrap();
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.storage.url, "memory");

        assert!(Settings::load(Some(Path::new("/definitely/missing.toml"))).is_err());
    }
}
