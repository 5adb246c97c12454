use async_trait::async_trait;
use parking_lot::RwLock;

use super::{upsert_by_id, Repository};
use crate::models::{ExecutionRow, WorkflowRow};
use crate::DbError;

/// Process-local storage, mainly for tests and one-shot CLI runs.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    workflows: RwLock<Vec<WorkflowRow>>,
    executions: RwLock<Vec<ExecutionRow>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn upsert_workflow(&self, row: WorkflowRow) -> Result<WorkflowRow, DbError> {
        upsert_by_id(&mut *self.workflows.write(), row.clone(), |r| r.id.as_str());
        Ok(row)
    }

    async fn get_workflow(&self, id: &str) -> Result<WorkflowRow, DbError> {
        self.workflows
            .read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn list_workflows(&self, tenant_id: &str) -> Result<Vec<WorkflowRow>, DbError> {
        Ok(self
            .workflows
            .read()
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn delete_workflow(&self, id: &str) -> Result<(), DbError> {
        let mut rows = self.workflows.write();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn upsert_execution(&self, row: ExecutionRow) -> Result<ExecutionRow, DbError> {
        upsert_by_id(&mut *self.executions.write(), row.clone(), |r| r.id.as_str());
        Ok(row)
    }

    async fn get_execution(&self, id: &str) -> Result<ExecutionRow, DbError> {
        self.executions
            .read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn list_executions(&self, workflow_id: &str) -> Result<Vec<ExecutionRow>, DbError> {
        Ok(self
            .executions
            .read()
            .iter()
            .filter(|r| r.workflow_id == workflow_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn workflow(id: &str, tenant: &str) -> WorkflowRow {
        WorkflowRow {
            id: id.into(),
            tenant_id: tenant.into(),
            name: format!("wf {id}"),
            definition: json!({ "id": id }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn listing_is_tenant_scoped_and_ordered() {
        let repo = MemoryRepository::new();
        repo.upsert_workflow(workflow("a", "t1")).await.unwrap();
        repo.upsert_workflow(workflow("b", "t2")).await.unwrap();
        repo.upsert_workflow(workflow("c", "t1")).await.unwrap();

        let ids: Vec<_> = repo.list_workflows("t1").await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn upsert_replaces_in_place() {
        let repo = MemoryRepository::new();
        repo.upsert_workflow(workflow("a", "t")).await.unwrap();
        repo.upsert_workflow(workflow("b", "t")).await.unwrap();
        let mut renamed = workflow("a", "t");
        renamed.name = "renamed".into();
        repo.upsert_workflow(renamed).await.unwrap();

        let rows = repo.list_workflows("t").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "renamed");
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let repo = MemoryRepository::new();
        assert!(matches!(repo.delete_workflow("nope").await, Err(DbError::NotFound)));
        assert!(matches!(repo.get_execution("nope").await, Err(DbError::NotFound)));
    }
}
