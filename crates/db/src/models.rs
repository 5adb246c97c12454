//! Row structs stored by every repository backend.
//!
//! These are *persistence* models; they carry no domain behaviour.
//! Domain types live in the `engine` crate and travel here as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// workflows
// ---------------------------------------------------------------------------

/// A persisted workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRow {
    pub id: String,
    /// Owning tenant; listing is always scoped to one tenant.
    pub tenant_id: String,
    pub name: String,
    /// Full JSON graph definition (nodes, edges, tags, …)
    pub definition: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// executions
// ---------------------------------------------------------------------------

/// A persisted execution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRow {
    pub id: String,
    /// Graph that was run. Ad-hoc graph ids appear here without a matching
    /// workflow row.
    pub workflow_id: String,
    pub tenant_id: Option<String>,
    pub status: String,
    /// Full JSON execution record (node results, metrics, logs).
    pub record: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
