//! Wiring: registry, storage, reasoning service and supervisor.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use agents::builtin::register_builtins;
use agents::AgentRegistry;
use engine::reasoning::{ChatCompletionsReasoner, KeywordReasoner};
use engine::{ReasoningService, Supervisor, WorkflowExecutor, WorkflowStore};

use crate::settings::Settings;

pub struct App {
    pub registry: Arc<AgentRegistry>,
    pub store: WorkflowStore,
    pub executor: WorkflowExecutor,
    pub supervisor: Supervisor,
}

impl App {
    pub async fn build(settings: &Settings, storage_url: Option<&str>) -> anyhow::Result<Self> {
        let registry = builtin_registry()?;

        let url = storage_url.unwrap_or(&settings.storage.url);
        let pool = db::connect(url)
            .await
            .with_context(|| format!("cannot open storage '{url}'"))?;
        let store = WorkflowStore::new(pool, registry.clone());

        let supervisor_config = settings.supervisor_config();
        let reasoner = reasoner(settings, &supervisor_config.keywords)?;

        Ok(Self {
            executor: WorkflowExecutor::new(registry.clone(), settings.executor_config()),
            supervisor: Supervisor::new(registry.clone(), store.clone(), reasoner, supervisor_config),
            store,
            registry,
        })
    }
}

/// Registry holding every built-in agent type.
pub fn builtin_registry() -> anyhow::Result<Arc<AgentRegistry>> {
    let mut registry = AgentRegistry::new();
    register_builtins(&mut registry).context("failed to register built-in agents")?;
    Ok(Arc::new(registry))
}

fn reasoner(
    settings: &Settings,
    keywords: &engine::KeywordTypeMap,
) -> anyhow::Result<Arc<dyn ReasoningService>> {
    match settings.chat_config() {
        Some(chat) => {
            info!("using reasoning service at {} ({})", chat.base_url, chat.model);
            Ok(Arc::new(ChatCompletionsReasoner::new(chat)?))
        }
        None => {
            warn!(
                "{} is not set; falling back to offline keyword reasoning",
                settings.reasoning.api_key_env
            );
            Ok(Arc::new(KeywordReasoner::new(keywords.clone())))
        }
    }
}
