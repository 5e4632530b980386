use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Stored register snapshot. `payload` carries the full export document
/// and is only sent to clients through the export endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Snapshot {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub payload: Json<serde_json::Value>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
