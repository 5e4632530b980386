use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, SqlitePool};
use tracing::info;

use crate::database::models::risk::{Risk, RATING_MAX, RATING_MIN};
use crate::services::audit_service::{
    diff_fields, risk_audit_value, AuditService, ACTION_CREATE, ACTION_DELETE, ACTION_UPDATE,
    ENTITY_RISK,
};
use crate::services::{double_option, page_window, Actor, ServiceError};

/// Risk shaped for responses, with the derived fields attached.
#[derive(Debug, Clone, Serialize)]
pub struct RiskRead {
    #[serde(flatten)]
    pub risk: Risk,
    pub score: Option<i64>,
    pub risk_level: String,
    pub action_items_count: i64,
}

impl RiskRead {
    pub fn new(risk: Risk, action_items_count: i64) -> Self {
        let score = risk.score();
        let risk_level = risk.risk_level().to_string();
        Self {
            risk,
            score,
            risk_level,
            action_items_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RiskCreate {
    pub risk_name: String,
    pub risk_description: Option<String>,
    pub category: Option<String>,
    pub rbs_node_id: Option<i64>,
    pub probability: Option<i64>,
    pub impact: Option<i64>,
    pub status: Option<String>,
    pub risk_owner: Option<String>,
    pub latest_reviewed_date: Option<NaiveDate>,
    pub probability_basis: Option<String>,
    pub impact_basis: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RiskUpdate {
    pub risk_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub risk_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub rbs_node_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub probability: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub impact: Option<Option<i64>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub risk_owner: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub latest_reviewed_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub probability_basis: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub impact_basis: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskFilter {
    pub status: Option<String>,
    pub search: Option<String>,
    pub risk_owner: Option<String>,
    pub rbs_node_id: Option<i64>,
    pub min_probability: Option<i64>,
    pub min_impact: Option<i64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, FromRow)]
struct RiskRow {
    #[sqlx(flatten)]
    risk: Risk,
    action_items_count: i64,
}

pub struct RiskService {
    pool: SqlitePool,
    audit: AuditService,
}

impl RiskService {
    pub fn new(pool: SqlitePool) -> Self {
        let audit = AuditService::new(pool.clone());
        Self { pool, audit }
    }

    /// Org-wide listing with filters, sorting, and pagination.
    pub async fn list(&self, filter: &RiskFilter) -> Result<Vec<RiskRead>, ServiceError> {
        let mut qb: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "SELECT r.*, \
             (SELECT COUNT(*) FROM action_items ai WHERE ai.risk_id = r.id) AS action_items_count \
             FROM risks r WHERE 1=1",
        );

        if let Some(status) = &filter.status {
            qb.push(" AND r.status = ").push_bind(status);
        }
        if let Some(search) = &filter.search {
            qb.push(" AND LOWER(r.risk_name) LIKE ")
                .push_bind(format!("%{}%", search.to_lowercase()));
        }
        if let Some(owner) = &filter.risk_owner {
            qb.push(" AND r.risk_owner = ").push_bind(owner);
        }
        if let Some(node_id) = filter.rbs_node_id {
            qb.push(" AND r.rbs_node_id = ").push_bind(node_id);
        }
        if let Some(min_probability) = filter.min_probability {
            qb.push(" AND r.probability >= ").push_bind(min_probability);
        }
        if let Some(min_impact) = filter.min_impact {
            qb.push(" AND r.impact >= ").push_bind(min_impact);
        }

        // SQLite sorts NULL lowest in both directions, which is exactly
        // what unscored risks should do under the score sort.
        let direction = match filter.order.as_deref() {
            Some("asc") => "ASC",
            _ => "DESC",
        };
        qb.push(" ORDER BY ")
            .push(sort_expr(filter.sort_by.as_deref()))
            .push(" ")
            .push(direction)
            .push(", r.id DESC");

        let (limit, offset) = page_window(filter.limit, filter.offset);
        qb.push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build_query_as::<RiskRow>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| RiskRead::new(row.risk, row.action_items_count))
            .collect())
    }

    /// Distinct non-empty risk owners, for filter dropdowns.
    pub async fn owners(&self) -> Result<Vec<String>, ServiceError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT risk_owner FROM risks \
             WHERE risk_owner IS NOT NULL AND risk_owner != '' \
             ORDER BY risk_owner ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    pub async fn get(&self, id: i64) -> Result<Risk, ServiceError> {
        sqlx::query_as::<_, Risk>("SELECT * FROM risks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Risk {} not found", id)))
    }

    pub async fn get_read(&self, id: i64) -> Result<RiskRead, ServiceError> {
        let risk = self.get(id).await?;
        let count = self.action_items_count(id).await?;
        Ok(RiskRead::new(risk, count))
    }

    pub async fn create(&self, input: RiskCreate, actor: &Actor) -> Result<RiskRead, ServiceError> {
        if input.risk_name.trim().is_empty() {
            return Err(ServiceError::Validation("Risk name is required".to_string()));
        }
        // Unrated fields default to the middle of the scale
        let probability = Some(input.probability.unwrap_or(3));
        let impact = Some(input.impact.unwrap_or(3));
        validate_rating("probability", probability)?;
        validate_rating("impact", impact)?;
        let status = input.status.unwrap_or_else(|| "open".to_string());

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO risks (risk_name, risk_description, category, rbs_node_id, probability, \
             impact, status, risk_owner, latest_reviewed_date, probability_basis, impact_basis, \
             notes, owner_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.risk_name)
        .bind(&input.risk_description)
        .bind(&input.category)
        .bind(input.rbs_node_id)
        .bind(probability)
        .bind(impact)
        .bind(&status)
        .bind(&input.risk_owner)
        .bind(input.latest_reviewed_date)
        .bind(&input.probability_basis)
        .bind(&input.impact_basis)
        .bind(&input.notes)
        .bind(actor.user_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let risk = self.get(result.last_insert_rowid()).await?;
        self.audit
            .record(
                ENTITY_RISK,
                risk.id,
                ACTION_CREATE,
                Some(risk_audit_value(&risk)?),
                Some(actor.user_id),
            )
            .await;
        info!("Created risk {} ({})", risk.id, risk.risk_name);
        Ok(RiskRead::new(risk, 0))
    }

    /// Partial update. Only the owner or a manager may modify a risk.
    pub async fn update(
        &self,
        id: i64,
        input: RiskUpdate,
        actor: &Actor,
    ) -> Result<RiskRead, ServiceError> {
        let before = self.get(id).await?;
        if !actor.owns_or_manages(before.owner_id) {
            return Err(ServiceError::Forbidden(
                "Only the risk owner or a manager can modify this risk".to_string(),
            ));
        }

        let mut risk = before.clone();
        if let Some(name) = input.risk_name {
            if name.trim().is_empty() {
                return Err(ServiceError::Validation("Risk name is required".to_string()));
            }
            risk.risk_name = name;
        }
        if let Some(value) = input.risk_description {
            risk.risk_description = value;
        }
        if let Some(value) = input.category {
            risk.category = value;
        }
        if let Some(value) = input.rbs_node_id {
            risk.rbs_node_id = value;
        }
        if let Some(value) = input.probability {
            validate_rating("probability", value)?;
            risk.probability = value;
        }
        if let Some(value) = input.impact {
            validate_rating("impact", value)?;
            risk.impact = value;
        }
        if let Some(value) = input.status {
            risk.status = value;
        }
        if let Some(value) = input.risk_owner {
            risk.risk_owner = value;
        }
        if let Some(value) = input.latest_reviewed_date {
            risk.latest_reviewed_date = value;
        }
        if let Some(value) = input.probability_basis {
            risk.probability_basis = value;
        }
        if let Some(value) = input.impact_basis {
            risk.impact_basis = value;
        }
        if let Some(value) = input.notes {
            risk.notes = value;
        }

        sqlx::query(
            "UPDATE risks SET risk_name = ?, risk_description = ?, category = ?, rbs_node_id = ?, \
             probability = ?, impact = ?, status = ?, risk_owner = ?, latest_reviewed_date = ?, \
             probability_basis = ?, impact_basis = ?, notes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&risk.risk_name)
        .bind(&risk.risk_description)
        .bind(&risk.category)
        .bind(risk.rbs_node_id)
        .bind(risk.probability)
        .bind(risk.impact)
        .bind(&risk.status)
        .bind(&risk.risk_owner)
        .bind(risk.latest_reviewed_date)
        .bind(&risk.probability_basis)
        .bind(&risk.impact_basis)
        .bind(&risk.notes)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        let after = self.get(id).await?;
        let diff = diff_fields(&risk_audit_value(&before)?, &risk_audit_value(&after)?);
        if diff.as_object().is_some_and(|m| !m.is_empty()) {
            self.audit
                .record(ENTITY_RISK, id, ACTION_UPDATE, Some(diff), Some(actor.user_id))
                .await;
        }

        let count = self.action_items_count(id).await?;
        Ok(RiskRead::new(after, count))
    }

    /// Delete a risk together with its action items.
    pub async fn delete(&self, id: i64, actor: &Actor) -> Result<(), ServiceError> {
        let risk = self.get(id).await?;
        if !actor.owns_or_manages(risk.owner_id) {
            return Err(ServiceError::Forbidden(
                "Only the risk owner or a manager can delete this risk".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM action_items WHERE risk_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM risks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.audit
            .record(
                ENTITY_RISK,
                id,
                ACTION_DELETE,
                Some(risk_audit_value(&risk)?),
                Some(actor.user_id),
            )
            .await;
        info!("Deleted risk {} ({})", risk.id, risk.risk_name);
        Ok(())
    }

    async fn action_items_count(&self, risk_id: i64) -> Result<i64, ServiceError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM action_items WHERE risk_id = ?")
                .bind(risk_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

fn sort_expr(sort_by: Option<&str>) -> &'static str {
    match sort_by.unwrap_or("created_at") {
        "risk_name" => "r.risk_name COLLATE NOCASE",
        "probability" => "r.probability",
        "impact" => "r.impact",
        "status" => "r.status",
        "latest_reviewed_date" => "r.latest_reviewed_date",
        "updated_at" => "r.updated_at",
        "score" => "(r.probability * r.impact)",
        _ => "r.created_at",
    }
}

fn validate_rating(field: &str, value: Option<i64>) -> Result<(), ServiceError> {
    if let Some(v) = value {
        if !(RATING_MIN..=RATING_MAX).contains(&v) {
            return Err(ServiceError::Validation(format!(
                "{} must be between {} and {}",
                field, RATING_MIN, RATING_MAX
            )));
        }
    }
    Ok(())
}
