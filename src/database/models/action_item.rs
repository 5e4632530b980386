use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const STATUSES: [&str; 4] = ["open", "in_progress", "completed", "cancelled"];
pub const PRIORITIES: [&str; 4] = ["low", "medium", "high", "critical"];
pub const ACTION_TYPES: [&str; 4] = ["mitigation", "contingency", "transfer", "acceptance"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActionItem {
    pub id: i64,
    pub risk_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub action_type: String,
    pub priority: String,
    pub status: String,
    pub progress_percent: i64,
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
