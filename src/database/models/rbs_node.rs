use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One node of the risk breakdown structure. Siblings are ordered by
/// `position` within their parent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RbsNode {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub owner_id: i64,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
