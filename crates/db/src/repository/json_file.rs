use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::{upsert_by_id, Repository};
use crate::models::{ExecutionRow, WorkflowRow};
use crate::DbError;

const WORKFLOWS_FILE: &str = "workflows.json";
const EXECUTIONS_FILE: &str = "executions.json";

/// Stores each table as a pretty-printed JSON array under one directory.
///
/// Writes go to a temporary file that is then renamed over the original, and
/// every read-modify-write holds an async lock, so one process never observes
/// a half-written table.
#[derive(Debug)]
pub struct JsonFileRepository {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Open (creating if needed) the storage directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, DbError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir, write_lock: Mutex::new(()) })
    }

    async fn read_rows<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, DbError> {
        match tokio::fs::read(self.dir.join(file)).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_rows<T: Serialize>(&self, file: &str, rows: &[T]) -> Result<(), DbError> {
        let target = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(rows)?).await?;
        tokio::fs::rename(&tmp, &target).await?;
        debug!("wrote {} rows to {}", rows.len(), target.display());
        Ok(())
    }
}

#[async_trait]
impl Repository for JsonFileRepository {
    async fn upsert_workflow(&self, row: WorkflowRow) -> Result<WorkflowRow, DbError> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<WorkflowRow> = self.read_rows(WORKFLOWS_FILE).await?;
        upsert_by_id(&mut rows, row.clone(), |r| r.id.as_str());
        self.write_rows(WORKFLOWS_FILE, &rows).await?;
        Ok(row)
    }

    async fn get_workflow(&self, id: &str) -> Result<WorkflowRow, DbError> {
        let rows: Vec<WorkflowRow> = self.read_rows(WORKFLOWS_FILE).await?;
        rows.into_iter().find(|r| r.id == id).ok_or(DbError::NotFound)
    }

    async fn list_workflows(&self, tenant_id: &str) -> Result<Vec<WorkflowRow>, DbError> {
        let rows: Vec<WorkflowRow> = self.read_rows(WORKFLOWS_FILE).await?;
        Ok(rows.into_iter().filter(|r| r.tenant_id == tenant_id).collect())
    }

    async fn delete_workflow(&self, id: &str) -> Result<(), DbError> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<WorkflowRow> = self.read_rows(WORKFLOWS_FILE).await?;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(DbError::NotFound);
        }
        self.write_rows(WORKFLOWS_FILE, &rows).await
    }

    async fn upsert_execution(&self, row: ExecutionRow) -> Result<ExecutionRow, DbError> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<ExecutionRow> = self.read_rows(EXECUTIONS_FILE).await?;
        upsert_by_id(&mut rows, row.clone(), |r| r.id.as_str());
        self.write_rows(EXECUTIONS_FILE, &rows).await?;
        Ok(row)
    }

    async fn get_execution(&self, id: &str) -> Result<ExecutionRow, DbError> {
        let rows: Vec<ExecutionRow> = self.read_rows(EXECUTIONS_FILE).await?;
        rows.into_iter().find(|r| r.id == id).ok_or(DbError::NotFound)
    }

    async fn list_executions(&self, workflow_id: &str) -> Result<Vec<ExecutionRow>, DbError> {
        let rows: Vec<ExecutionRow> = self.read_rows(EXECUTIONS_FILE).await?;
        Ok(rows.into_iter().filter(|r| r.workflow_id == workflow_id).collect())
    }
}
