use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::database::models::{ActionItem, Risk, Snapshot};
use crate::services::audit_service::{
    AuditService, ACTION_CREATE, ACTION_DELETE, ACTION_RESTORE, ENTITY_SNAPSHOT,
};
use crate::services::{Actor, ServiceError};

pub const SNAPSHOT_VERSION: i64 = 1;

/// The stored export document. Entities keep their original ids so a
/// restore can remap action item references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub version: i64,
    pub captured_at: DateTime<Utc>,
    pub risks: Vec<Risk>,
    pub action_items: Vec<ActionItem>,
}

/// Snapshot metadata for listings. The payload body is only served by
/// the export endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRead {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub risks_count: i64,
    pub action_items_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Snapshot> for SnapshotRead {
    fn from(snapshot: Snapshot) -> Self {
        let (risks_count, action_items_count) = payload_counts(&snapshot.payload.0);
        Self {
            id: snapshot.id,
            name: snapshot.name,
            description: snapshot.description,
            owner_id: snapshot.owner_id,
            risks_count,
            action_items_count,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SnapshotCreate {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SnapshotUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotImport {
    pub name: String,
    pub description: Option<String>,
    pub document: Value,
}

/// What a restore put back.
#[derive(Debug, Serialize)]
pub struct RestoreSummary {
    pub snapshot_id: i64,
    pub risks_restored: i64,
    pub action_items_restored: i64,
}

pub struct SnapshotService {
    pool: SqlitePool,
    audit: AuditService,
}

impl SnapshotService {
    pub fn new(pool: SqlitePool) -> Self {
        let audit = AuditService::new(pool.clone());
        Self { pool, audit }
    }

    /// The caller's snapshots, newest first.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<SnapshotRead>, ServiceError> {
        let snapshots = sqlx::query_as::<_, Snapshot>(
            "SELECT * FROM snapshots WHERE owner_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(actor.user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(snapshots.into_iter().map(SnapshotRead::from).collect())
    }

    /// Capture the current org-wide risks and action items.
    pub async fn capture(
        &self,
        input: SnapshotCreate,
        actor: &Actor,
    ) -> Result<SnapshotRead, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("Name is required".to_string()));
        }

        let risks = sqlx::query_as::<_, Risk>("SELECT * FROM risks ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        let action_items =
            sqlx::query_as::<_, ActionItem>("SELECT * FROM action_items ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;

        let document = SnapshotDocument {
            version: SNAPSHOT_VERSION,
            captured_at: Utc::now(),
            risks,
            action_items,
        };
        let snapshot = self.insert(&input.name, &input.description, &document, actor).await?;

        let read = SnapshotRead::from(snapshot);
        self.audit
            .record(
                ENTITY_SNAPSHOT,
                read.id,
                ACTION_CREATE,
                Some(snapshot_summary(&read)),
                Some(actor.user_id),
            )
            .await;
        info!(
            "Captured snapshot {} ({}): {} risks, {} action items",
            read.id, read.name, read.risks_count, read.action_items_count
        );
        Ok(read)
    }

    pub async fn get(&self, id: i64, actor: &Actor) -> Result<SnapshotRead, ServiceError> {
        Ok(SnapshotRead::from(self.get_row(id, actor).await?))
    }

    /// The raw export document together with its snapshot name.
    pub async fn export(&self, id: i64, actor: &Actor) -> Result<(String, Value), ServiceError> {
        let snapshot = self.get_row(id, actor).await?;
        Ok((snapshot.name, snapshot.payload.0))
    }

    pub async fn update(
        &self,
        id: i64,
        input: SnapshotUpdate,
        actor: &Actor,
    ) -> Result<SnapshotRead, ServiceError> {
        let snapshot = self.get_row(id, actor).await?;

        let name = match input.name {
            Some(name) if name.trim().is_empty() => {
                return Err(ServiceError::Validation("Name is required".to_string()));
            }
            Some(name) => name,
            None => snapshot.name,
        };
        let description = input.description.or(snapshot.description);

        sqlx::query("UPDATE snapshots SET name = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(&name)
            .bind(&description)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.get(id, actor).await
    }

    pub async fn delete(&self, id: i64, actor: &Actor) -> Result<(), ServiceError> {
        let snapshot = self.get_row(id, actor).await?;
        let read = SnapshotRead::from(snapshot);

        sqlx::query("DELETE FROM snapshots WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.audit
            .record(
                ENTITY_SNAPSHOT,
                id,
                ACTION_DELETE,
                Some(snapshot_summary(&read)),
                Some(actor.user_id),
            )
            .await;
        info!("Deleted snapshot {} ({})", read.id, read.name);
        Ok(())
    }

    /// Replace all current risks and action items with the snapshot's
    /// contents. Entities get fresh ids; action item references are
    /// remapped onto the newly inserted risks.
    pub async fn restore(&self, id: i64, actor: &Actor) -> Result<RestoreSummary, ServiceError> {
        let snapshot = self.get_row(id, actor).await?;
        let document = parse_document(&snapshot.payload.0)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM action_items").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM risks").execute(&mut *tx).await?;

        // The document may reference RBS nodes deleted since the
        // capture, or (for imports) users and nodes from another
        // install. Unresolvable node references are dropped and
        // unknown owners become the restoring user, so the foreign
        // keys always hold.
        let node_ids: HashSet<i64> = sqlx::query_as::<_, (i64,)>("SELECT id FROM rbs_nodes")
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|(id,)| id)
            .collect();
        let user_ids: HashSet<i64> = sqlx::query_as::<_, (i64,)>("SELECT id FROM users")
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|(id,)| id)
            .collect();
        let resolve_owner = |owner_id: i64| {
            if user_ids.contains(&owner_id) {
                owner_id
            } else {
                actor.user_id
            }
        };

        let now = Utc::now();
        let mut risk_ids: HashMap<i64, i64> = HashMap::new();
        for risk in &document.risks {
            let rbs_node_id = risk.rbs_node_id.filter(|node| node_ids.contains(node));
            if rbs_node_id.is_none() && risk.rbs_node_id.is_some() {
                warn!(
                    "Snapshot {} risk {} references missing RBS node {}; uncategorized",
                    id,
                    risk.id,
                    risk.rbs_node_id.unwrap_or_default()
                );
            }
            let result = sqlx::query(
                "INSERT INTO risks (risk_name, risk_description, category, rbs_node_id, \
                 probability, impact, status, risk_owner, latest_reviewed_date, \
                 probability_basis, impact_basis, notes, owner_id, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&risk.risk_name)
            .bind(&risk.risk_description)
            .bind(&risk.category)
            .bind(rbs_node_id)
            .bind(risk.probability)
            .bind(risk.impact)
            .bind(&risk.status)
            .bind(&risk.risk_owner)
            .bind(risk.latest_reviewed_date)
            .bind(&risk.probability_basis)
            .bind(&risk.impact_basis)
            .bind(&risk.notes)
            .bind(resolve_owner(risk.owner_id))
            .bind(risk.created_at)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            risk_ids.insert(risk.id, result.last_insert_rowid());
        }

        let mut items_restored = 0i64;
        for item in &document.action_items {
            let Some(&risk_id) = risk_ids.get(&item.risk_id) else {
                warn!(
                    "Snapshot {} action item {} references missing risk {}; skipped",
                    id, item.id, item.risk_id
                );
                continue;
            };
            sqlx::query(
                "INSERT INTO action_items (risk_id, title, description, action_type, priority, \
                 status, progress_percent, assigned_to, due_date, completed_date, owner_id, \
                 created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(risk_id)
            .bind(&item.title)
            .bind(&item.description)
            .bind(&item.action_type)
            .bind(&item.priority)
            .bind(&item.status)
            .bind(item.progress_percent)
            .bind(&item.assigned_to)
            .bind(item.due_date)
            .bind(item.completed_date)
            .bind(resolve_owner(item.owner_id))
            .bind(item.created_at)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            items_restored += 1;
        }
        tx.commit().await?;

        let summary = RestoreSummary {
            snapshot_id: id,
            risks_restored: risk_ids.len() as i64,
            action_items_restored: items_restored,
        };
        self.audit
            .record(
                ENTITY_SNAPSHOT,
                id,
                ACTION_RESTORE,
                Some(json!({
                    "name": snapshot.name,
                    "risks_restored": summary.risks_restored,
                    "action_items_restored": summary.action_items_restored,
                })),
                Some(actor.user_id),
            )
            .await;
        info!(
            "Restored snapshot {}: {} risks, {} action items",
            id, summary.risks_restored, summary.action_items_restored
        );
        Ok(summary)
    }

    /// Store a previously exported document as a new snapshot. Live data
    /// is untouched; restoring it is a separate step.
    pub async fn import(
        &self,
        input: SnapshotImport,
        actor: &Actor,
    ) -> Result<SnapshotRead, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("Name is required".to_string()));
        }
        let document = parse_document(&input.document)?;

        let snapshot = self.insert(&input.name, &input.description, &document, actor).await?;
        let read = SnapshotRead::from(snapshot);
        info!(
            "Imported snapshot {} ({}): {} risks, {} action items",
            read.id, read.name, read.risks_count, read.action_items_count
        );
        Ok(read)
    }

    async fn insert(
        &self,
        name: &str,
        description: &Option<String>,
        document: &SnapshotDocument,
        actor: &Actor,
    ) -> Result<Snapshot, ServiceError> {
        let payload = serde_json::to_value(document)?;
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO snapshots (name, description, payload, owner_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(Json(payload))
        .bind(actor.user_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        self.get_row(result.last_insert_rowid(), actor).await
    }

    async fn get_row(&self, id: i64, actor: &Actor) -> Result<Snapshot, ServiceError> {
        sqlx::query_as::<_, Snapshot>("SELECT * FROM snapshots WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(actor.user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Snapshot {} not found", id)))
    }
}

fn parse_document(payload: &Value) -> Result<SnapshotDocument, ServiceError> {
    let version = payload.get("version").and_then(Value::as_i64);
    if version != Some(SNAPSHOT_VERSION) {
        return Err(ServiceError::Validation(format!(
            "Unsupported snapshot version (expected {})",
            SNAPSHOT_VERSION
        )));
    }
    serde_json::from_value(payload.clone())
        .map_err(|e| ServiceError::Validation(format!("Malformed snapshot document: {}", e)))
}

fn payload_counts(payload: &Value) -> (i64, i64) {
    let count = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_array)
            .map_or(0, |a| a.len() as i64)
    };
    (count("risks"), count("action_items"))
}

fn snapshot_summary(read: &SnapshotRead) -> Value {
    json!({
        "name": read.name,
        "description": read.description,
        "risks_count": read.risks_count,
        "action_items_count": read.action_items_count,
    })
}
