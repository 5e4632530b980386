use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, QueryBuilder, SqlitePool};
use tracing::warn;

use crate::database::models::{AuditLog, Risk};
use crate::services::{page_window, ServiceError};

pub const ENTITY_RISK: &str = "risk";
pub const ENTITY_ACTION_ITEM: &str = "action_item";
pub const ENTITY_SNAPSHOT: &str = "snapshot";

pub const ACTION_CREATE: &str = "create";
pub const ACTION_UPDATE: &str = "update";
pub const ACTION_DELETE: &str = "delete";
pub const ACTION_RESTORE: &str = "restore";

/// Fields that never appear in a diff.
const SKIP_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Audit row joined with the acting user's email.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditLogRead {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub action: String,
    pub changes: Option<Json<Value>>,
    pub user_id: Option<i64>,
    pub user_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogFilter {
    pub entity_type: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One step of a risk's scoring history, extracted from its update logs.
#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub at: DateTime<Utc>,
    pub probability: Option<i64>,
    pub impact: Option<i64>,
    pub score: Option<i64>,
    pub risk_level: Option<String>,
}

pub struct AuditService {
    pool: SqlitePool,
}

impl AuditService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write an audit row. Failures are logged and swallowed so the
    /// mutation that triggered the entry still succeeds.
    pub async fn record(
        &self,
        entity_type: &str,
        entity_id: i64,
        action: &str,
        changes: Option<Value>,
        user_id: Option<i64>,
    ) {
        let result = sqlx::query(
            "INSERT INTO audit_logs (entity_type, entity_id, action, changes, user_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(action)
        .bind(changes.map(Json))
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(
                "Failed to write audit log for {} {}: {}",
                entity_type, entity_id, e
            );
        }
    }

    /// Global audit listing, newest first.
    pub async fn list(&self, filter: &AuditLogFilter) -> Result<Vec<AuditLogRead>, ServiceError> {
        let mut qb: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "SELECT a.id, a.entity_type, a.entity_id, a.action, a.changes, a.user_id, \
             u.email AS user_email, a.created_at \
             FROM audit_logs a LEFT JOIN users u ON u.id = a.user_id WHERE 1=1",
        );

        if let Some(entity_type) = &filter.entity_type {
            qb.push(" AND a.entity_type = ").push_bind(entity_type);
        }
        if let Some(action) = &filter.action {
            qb.push(" AND a.action = ").push_bind(action);
        }
        if let Some(user_id) = filter.user_id {
            qb.push(" AND a.user_id = ").push_bind(user_id);
        }

        let (limit, offset) = page_window(filter.limit, filter.offset);
        qb.push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build_query_as::<AuditLogRead>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Every audit row for one entity, oldest first.
    pub async fn trail(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Vec<AuditLogRead>, ServiceError> {
        let rows = sqlx::query_as::<_, AuditLogRead>(
            "SELECT a.id, a.entity_type, a.entity_id, a.action, a.changes, a.user_id, \
             u.email AS user_email, a.created_at \
             FROM audit_logs a LEFT JOIN users u ON u.id = a.user_id \
             WHERE a.entity_type = ? AND a.entity_id = ? \
             ORDER BY a.created_at ASC, a.id ASC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Scoring history for a risk over the past `days`, built from its
    /// update logs, with the current state as the final point.
    pub async fn risk_trend(&self, current: &Risk, days: i64) -> Result<Vec<TrendPoint>, ServiceError> {
        let days = days.clamp(1, 365);
        let cutoff = Utc::now() - Duration::days(days);

        let logs = sqlx::query_as::<_, AuditLog>(
            "SELECT * FROM audit_logs \
             WHERE entity_type = ? AND entity_id = ? AND action = ? AND created_at >= ? \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(ENTITY_RISK)
        .bind(current.id)
        .bind(ACTION_UPDATE)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut points = Vec::new();
        for log in logs {
            let Some(changes) = log.changes else { continue };
            let point = TrendPoint {
                at: log.created_at,
                probability: new_value_i64(&changes.0, "probability"),
                impact: new_value_i64(&changes.0, "impact"),
                score: new_value_i64(&changes.0, "score"),
                risk_level: new_value_str(&changes.0, "risk_level"),
            };
            // Updates that touched none of the scoring fields say nothing
            if point.probability.is_none()
                && point.impact.is_none()
                && point.score.is_none()
                && point.risk_level.is_none()
            {
                continue;
            }
            points.push(point);
        }

        points.push(TrendPoint {
            at: current.updated_at,
            probability: current.probability,
            impact: current.impact,
            score: current.score(),
            risk_level: Some(current.risk_level().to_string()),
        });

        Ok(points)
    }
}

/// Field-by-field diff of two serialized entities. Only changed fields
/// appear, each as `{"old": .., "new": ..}`.
pub fn diff_fields(before: &Value, after: &Value) -> Value {
    let empty = Map::new();
    let before_map = before.as_object().unwrap_or(&empty);
    let after_map = after.as_object().unwrap_or(&empty);

    let mut keys: Vec<&String> = before_map.keys().chain(after_map.keys()).collect();
    keys.sort();
    keys.dedup();

    let mut changes = Map::new();
    for key in keys {
        if SKIP_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let old = before_map.get(key).cloned().unwrap_or(Value::Null);
        let new = after_map.get(key).cloned().unwrap_or(Value::Null);
        if old != new {
            changes.insert(key.clone(), json!({ "old": old, "new": new }));
        }
    }
    Value::Object(changes)
}

/// Serialize a risk for auditing, including the derived scoring fields
/// so diffs and trend extraction see them.
pub fn risk_audit_value(entity: &Risk) -> Result<Value, ServiceError> {
    let mut value = serde_json::to_value(entity)?;
    if let Some(map) = value.as_object_mut() {
        map.insert("score".to_string(), json!(entity.score()));
        map.insert("risk_level".to_string(), json!(entity.risk_level()));
    }
    Ok(value)
}

/// Convenience for auditing entities without derived fields.
pub fn audit_value<T: Serialize>(entity: &T) -> Result<Value, ServiceError> {
    Ok(serde_json::to_value(entity)?)
}

fn new_value(changes: &Value, field: &str) -> Option<Value> {
    changes.get(field)?.get("new").cloned()
}

fn new_value_i64(changes: &Value, field: &str) -> Option<i64> {
    new_value(changes, field)?.as_i64()
}

fn new_value_str(changes: &Value, field: &str) -> Option<String> {
    new_value(changes, field)?.as_str().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_reports_only_changes() {
        let before = json!({
            "risk_name": "Server outage",
            "probability": 2,
            "impact": 4,
            "status": "open"
        });
        let after = json!({
            "risk_name": "Server outage",
            "probability": 4,
            "impact": 4,
            "status": "mitigating"
        });

        let diff = diff_fields(&before, &after);
        let map = diff.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["probability"], json!({"old": 2, "new": 4}));
        assert_eq!(map["status"], json!({"old": "open", "new": "mitigating"}));
    }

    #[test]
    fn test_diff_skips_bookkeeping_fields() {
        let before = json!({"id": 1, "updated_at": "a", "status": "open"});
        let after = json!({"id": 2, "updated_at": "b", "status": "open"});
        let diff = diff_fields(&before, &after);
        assert!(diff.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_diff_handles_added_and_removed_fields() {
        let before = json!({"category": "technical"});
        let after = json!({"risk_owner": "ops"});
        let diff = diff_fields(&before, &after);
        let map = diff.as_object().unwrap();
        assert_eq!(map["category"], json!({"old": "technical", "new": null}));
        assert_eq!(map["risk_owner"], json!({"old": null, "new": "ops"}));
    }

    #[test]
    fn test_new_value_extraction() {
        let changes = json!({
            "probability": {"old": 2, "new": 5},
            "risk_level": {"old": "Medium", "new": "Critical"}
        });
        assert_eq!(new_value_i64(&changes, "probability"), Some(5));
        assert_eq!(new_value_i64(&changes, "impact"), None);
        assert_eq!(
            new_value_str(&changes, "risk_level").as_deref(),
            Some("Critical")
        );
    }
}
