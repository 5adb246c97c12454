//! Storage backend selection.

use std::sync::Arc;

use tracing::info;

use crate::{DbError, JsonFileRepository, MemoryRepository, Repository};

/// Shared handle to whichever backend the application was configured with.
pub type DbPool = Arc<dyn Repository>;

/// Open a repository from a storage URL.
///
/// - `memory://`: process-local, lost on exit.
/// - `file://<dir>` or a bare path: JSON files under `<dir>`.
pub async fn connect(url: &str) -> Result<DbPool, DbError> {
    if url == "memory://" || url == "memory" {
        info!("Using in-memory storage");
        return Ok(Arc::new(MemoryRepository::new()));
    }

    let dir = url.strip_prefix("file://").unwrap_or(url);
    if dir.is_empty() || dir.contains("://") {
        return Err(DbError::UnsupportedUrl(url.to_owned()));
    }

    info!("Using JSON file storage at {}", dir);
    Ok(Arc::new(JsonFileRepository::open(dir).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_url_opens_memory_backend() {
        let pool = connect("memory://").await.expect("memory backend");
        assert!(pool.list_workflows("t").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_scheme_is_rejected() {
        assert!(matches!(
            connect("postgres://localhost/db").await,
            Err(DbError::UnsupportedUrl(_))
        ));
    }
}
