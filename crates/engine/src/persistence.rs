//! Typed persistence facade over a `db` repository.
//!
//! Graphs and executions are stored as their serde JSON form, so anything
//! saved here loads back equal.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use agents::AgentRegistry;
use db::models::{ExecutionRow, WorkflowRow};
use db::{DbError, DbPool};

use crate::dag::validate_graph;
use crate::models::{Execution, WorkflowGraph};
use crate::EngineError;

#[derive(Clone)]
pub struct WorkflowStore {
    pool: DbPool,
    registry: Arc<AgentRegistry>,
}

impl WorkflowStore {
    pub fn new(pool: DbPool, registry: Arc<AgentRegistry>) -> Self {
        Self { pool, registry }
    }

    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    /// Validate and store `graph` for `tenant_id`, replacing the tenant's
    /// graph with the same id.
    ///
    /// # Errors
    /// [`EngineError::AdHocGraph`] for ad-hoc graphs,
    /// [`EngineError::ForeignWorkflow`] when another tenant owns the id, any
    /// validation error from [`validate_graph`], or a persistence error.
    pub async fn save_workflow(&self, tenant_id: &str, graph: &WorkflowGraph) -> Result<(), EngineError> {
        if graph.is_ad_hoc() {
            return Err(EngineError::AdHocGraph(graph.id.clone()));
        }
        validate_graph(graph, &self.registry)?;

        let created_at = match self.pool.get_workflow(&graph.id).await {
            Ok(existing) if existing.tenant_id != tenant_id => {
                warn!("tenant '{}' tried to overwrite workflow '{}'", tenant_id, graph.id);
                return Err(EngineError::ForeignWorkflow(graph.id.clone()));
            }
            Ok(existing) => existing.created_at,
            Err(DbError::NotFound) => graph.created_at,
            Err(err) => return Err(err.into()),
        };

        self.pool
            .upsert_workflow(WorkflowRow {
                id: graph.id.clone(),
                tenant_id: tenant_id.to_owned(),
                name: graph.name.clone(),
                definition: serde_json::to_value(graph)?,
                created_at,
                updated_at: Utc::now(),
            })
            .await?;
        info!("saved workflow '{}' for tenant '{}'", graph.id, tenant_id);
        Ok(())
    }

    pub async fn load_workflow(&self, graph_id: &str) -> Result<WorkflowGraph, EngineError> {
        let row = self.pool.get_workflow(graph_id).await?;
        Ok(serde_json::from_value(row.definition)?)
    }

    /// Every workflow owned by `tenant_id`, in stored order.
    pub async fn list_workflows(&self, tenant_id: &str) -> Result<Vec<WorkflowGraph>, EngineError> {
        let rows = self.pool.list_workflows(tenant_id).await?;
        debug!("loaded {} workflows for tenant '{}'", rows.len(), tenant_id);
        rows.into_iter()
            .map(|row| serde_json::from_value(row.definition).map_err(EngineError::from))
            .collect()
    }

    pub async fn delete_workflow(&self, graph_id: &str) -> Result<(), EngineError> {
        self.pool.delete_workflow(graph_id).await?;
        info!("deleted workflow '{}'", graph_id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Executions
    // -----------------------------------------------------------------------

    pub async fn save_execution(&self, execution: &Execution, tenant_id: Option<&str>) -> Result<(), EngineError> {
        self.pool
            .upsert_execution(ExecutionRow {
                id: execution.id.clone(),
                workflow_id: execution.graph_id.clone(),
                tenant_id: tenant_id.map(str::to_owned),
                status: execution.status.to_string(),
                record: serde_json::to_value(execution)?,
                started_at: execution.started_at,
                finished_at: execution.finished_at,
            })
            .await?;
        debug!("saved execution '{}' ({})", execution.id, execution.status);
        Ok(())
    }

    pub async fn load_execution(&self, execution_id: &str) -> Result<Execution, EngineError> {
        let row = self.pool.get_execution(execution_id).await?;
        Ok(serde_json::from_value(row.record)?)
    }

    /// Executions of one graph, oldest first.
    pub async fn list_executions(&self, graph_id: &str) -> Result<Vec<Execution>, EngineError> {
        self.pool
            .list_executions(graph_id)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row.record).map_err(EngineError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentNode;
    use crate::{ExecutorConfig, WorkflowExecutor};
    use agents::builtin::register_builtins;
    use db::{JsonFileRepository, MemoryRepository};
    use serde_json::json;

    fn registry() -> Arc<AgentRegistry> {
        let mut registry = AgentRegistry::new();
        register_builtins(&mut registry).unwrap();
        Arc::new(registry)
    }

    fn sales_alerts() -> WorkflowGraph {
        WorkflowGraph::linear(
            "wf_sales_alerts",
            "Sales deal alerts",
            vec![
                AgentNode::new("crm", "sales_intelligence", json!({ "min_amount": 100000 })).at(100.0, 100.0),
                AgentNode::new("notify", "slack", json!({ "channel": "#sales", "message_template": "summary" })),
            ],
        )
        .with_tags(["sales", "slack"])
    }

    #[tokio::test]
    async fn workflows_round_trip_and_are_tenant_scoped() {
        let store = WorkflowStore::new(Arc::new(MemoryRepository::new()), registry());
        let graph = sales_alerts();

        store.save_workflow("acme", &graph).await.unwrap();

        assert_eq!(store.load_workflow(&graph.id).await.unwrap(), graph);
        assert_eq!(store.list_workflows("acme").await.unwrap(), vec![graph.clone()]);
        assert!(store.list_workflows("globex").await.unwrap().is_empty());

        store.delete_workflow(&graph.id).await.unwrap();
        assert!(matches!(
            store.load_workflow(&graph.id).await,
            Err(EngineError::Persistence(DbError::NotFound))
        ));
    }

    #[tokio::test]
    async fn invalid_and_adhoc_graphs_are_refused() {
        let store = WorkflowStore::new(Arc::new(MemoryRepository::new()), registry());

        let adhoc = sales_alerts().ad_hoc();
        assert!(matches!(store.save_workflow("acme", &adhoc).await, Err(EngineError::AdHocGraph(_))));

        let mut broken = sales_alerts();
        broken.nodes[1].config = json!({});
        assert!(matches!(
            store.save_workflow("acme", &broken).await,
            Err(EngineError::InvalidNode { node_id, .. }) if node_id == "notify"
        ));
        assert!(store.list_workflows("acme").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn another_tenant_cannot_take_over_a_workflow_id() {
        let store = WorkflowStore::new(Arc::new(MemoryRepository::new()), registry());
        let graph = sales_alerts();
        store.save_workflow("acme", &graph).await.unwrap();

        let hijack = sales_alerts().with_description("globex copy");
        assert!(matches!(
            store.save_workflow("globex", &hijack).await,
            Err(EngineError::ForeignWorkflow(id)) if id == "wf_sales_alerts"
        ));
        assert_eq!(store.load_workflow(&graph.id).await.unwrap(), graph);
        assert!(store.list_workflows("globex").await.unwrap().is_empty());

        // The owner can still replace it.
        let updated = sales_alerts().with_description("updated");
        store.save_workflow("acme", &updated).await.unwrap();
        assert_eq!(store.load_workflow(&graph.id).await.unwrap().description, "updated");
    }

    #[tokio::test]
    async fn executions_round_trip_through_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let pool = Arc::new(JsonFileRepository::open(dir.path()).await.unwrap());
        let store = WorkflowStore::new(pool, registry.clone());
        let executor = WorkflowExecutor::new(registry, ExecutorConfig::default());

        let graph = sales_alerts();
        let execution = executor.execute_workflow(&graph, json!({}), "exec-1").await.unwrap();
        store.save_execution(&execution, Some("acme")).await.unwrap();

        assert_eq!(store.load_execution("exec-1").await.unwrap(), execution);
        assert_eq!(store.list_executions(&graph.id).await.unwrap(), vec![execution]);
    }
}
