use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// One audit row. `changes` holds a field diff for updates
/// (`{"field": {"old": .., "new": ..}}`) and the full serialized entity
/// for creates, deletes, and restores.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub action: String,
    pub changes: Option<Json<serde_json::Value>>,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
