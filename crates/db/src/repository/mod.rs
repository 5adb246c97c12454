//! Repository contract: one method per storage operation.
//!
//! Every method returns a `Result<T, DbError>`.
//! No business logic and no domain types: rows in, rows out.

mod json_file;
mod memory;

pub use json_file::JsonFileRepository;
pub use memory::MemoryRepository;

use async_trait::async_trait;

use crate::models::{ExecutionRow, WorkflowRow};
use crate::DbError;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Insert a workflow, or replace the row with the same id in place.
    async fn upsert_workflow(&self, row: WorkflowRow) -> Result<WorkflowRow, DbError>;

    /// Fetch a single workflow by id.
    async fn get_workflow(&self, id: &str) -> Result<WorkflowRow, DbError>;

    /// All workflows of a tenant, in insertion order.
    async fn list_workflows(&self, tenant_id: &str) -> Result<Vec<WorkflowRow>, DbError>;

    /// Returns `DbError::NotFound` if no row was deleted.
    async fn delete_workflow(&self, id: &str) -> Result<(), DbError>;

    /// Insert an execution, or replace the row with the same id in place.
    async fn upsert_execution(&self, row: ExecutionRow) -> Result<ExecutionRow, DbError>;

    async fn get_execution(&self, id: &str) -> Result<ExecutionRow, DbError>;

    /// All executions of one graph, in insertion order.
    async fn list_executions(&self, workflow_id: &str) -> Result<Vec<ExecutionRow>, DbError>;
}

/// Replace the row whose id matches, or append it.
pub(crate) fn upsert_by_id<T, F>(rows: &mut Vec<T>, row: T, id_of: F)
where
    F: Fn(&T) -> &str,
{
    match rows.iter().position(|r| id_of(r) == id_of(&row)) {
        Some(i) => rows[i] = row,
        None => rows.push(row),
    }
}
