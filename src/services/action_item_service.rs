use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, SqlitePool};
use tracing::info;

use crate::database::models::action_item::{ActionItem, ACTION_TYPES, PRIORITIES, STATUSES};
use crate::services::audit_service::{
    audit_value, diff_fields, AuditService, ACTION_CREATE, ACTION_DELETE, ACTION_UPDATE,
    ENTITY_ACTION_ITEM,
};
use crate::services::{double_option, page_window, Actor, ServiceError};

#[derive(Debug, Deserialize)]
pub struct ActionItemCreate {
    pub risk_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub action_type: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub progress_percent: Option<i64>,
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionItemUpdate {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub action_type: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub progress_percent: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionItemFilter {
    pub risk_id: Option<i64>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct ActionItemService {
    pool: SqlitePool,
    audit: AuditService,
}

impl ActionItemService {
    pub fn new(pool: SqlitePool) -> Self {
        let audit = AuditService::new(pool.clone());
        Self { pool, audit }
    }

    pub async fn list(&self, filter: &ActionItemFilter) -> Result<Vec<ActionItem>, ServiceError> {
        let mut qb: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT * FROM action_items WHERE 1=1");

        if let Some(risk_id) = filter.risk_id {
            qb.push(" AND risk_id = ").push_bind(risk_id);
        }
        if let Some(status) = &filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(priority) = &filter.priority {
            qb.push(" AND priority = ").push_bind(priority);
        }
        if let Some(assigned_to) = &filter.assigned_to {
            qb.push(" AND assigned_to = ").push_bind(assigned_to);
        }

        let (limit, offset) = page_window(filter.limit, filter.offset);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let items = qb
            .build_query_as::<ActionItem>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn get(&self, id: i64) -> Result<ActionItem, ServiceError> {
        sqlx::query_as::<_, ActionItem>("SELECT * FROM action_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Action item {} not found", id)))
    }

    pub async fn create(
        &self,
        input: ActionItemCreate,
        actor: &Actor,
    ) -> Result<ActionItem, ServiceError> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::Validation("Title is required".to_string()));
        }
        let (risk_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM risks WHERE id = ?")
            .bind(input.risk_id)
            .fetch_one(&self.pool)
            .await?;
        if risk_count == 0 {
            return Err(ServiceError::NotFound(format!(
                "Risk {} not found",
                input.risk_id
            )));
        }

        let action_type = input.action_type.unwrap_or_else(|| "mitigation".to_string());
        let priority = input.priority.unwrap_or_else(|| "medium".to_string());
        let mut status = input.status.unwrap_or_else(|| "open".to_string());
        let mut progress = input.progress_percent.unwrap_or(0);
        validate_choice("action_type", &action_type, &ACTION_TYPES)?;
        validate_choice("priority", &priority, &PRIORITIES)?;
        validate_choice("status", &status, &STATUSES)?;
        validate_progress(progress)?;

        let mut completed_date = None;
        if status == "completed" {
            progress = 100;
            completed_date = Some(Utc::now().date_naive());
        } else if progress == 100 {
            status = "completed".to_string();
            completed_date = Some(Utc::now().date_naive());
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO action_items (risk_id, title, description, action_type, priority, \
             status, progress_percent, assigned_to, due_date, completed_date, owner_id, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(input.risk_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&action_type)
        .bind(&priority)
        .bind(&status)
        .bind(progress)
        .bind(&input.assigned_to)
        .bind(input.due_date)
        .bind(completed_date)
        .bind(actor.user_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let item = self.get(result.last_insert_rowid()).await?;
        self.audit
            .record(
                ENTITY_ACTION_ITEM,
                item.id,
                ACTION_CREATE,
                Some(audit_value(&item)?),
                Some(actor.user_id),
            )
            .await;
        info!("Created action item {} for risk {}", item.id, item.risk_id);
        Ok(item)
    }

    /// Partial update. Only the owner or a manager may modify an item.
    pub async fn update(
        &self,
        id: i64,
        input: ActionItemUpdate,
        actor: &Actor,
    ) -> Result<ActionItem, ServiceError> {
        let before = self.get(id).await?;
        if !actor.owns_or_manages(before.owner_id) {
            return Err(ServiceError::Forbidden(
                "Only the item owner or a manager can modify this action item".to_string(),
            ));
        }

        let mut item = before.clone();
        let status_set = input.status.is_some();
        if let Some(title) = input.title {
            if title.trim().is_empty() {
                return Err(ServiceError::Validation("Title is required".to_string()));
            }
            item.title = title;
        }
        if let Some(value) = input.description {
            item.description = value;
        }
        if let Some(value) = input.action_type {
            validate_choice("action_type", &value, &ACTION_TYPES)?;
            item.action_type = value;
        }
        if let Some(value) = input.priority {
            validate_choice("priority", &value, &PRIORITIES)?;
            item.priority = value;
        }
        if let Some(value) = input.status {
            validate_choice("status", &value, &STATUSES)?;
            item.status = value;
        }
        if let Some(value) = input.progress_percent {
            validate_progress(value)?;
            item.progress_percent = value;
            // Reaching full progress completes the item unless the same
            // request set the status explicitly
            if value == 100 && !status_set {
                item.status = "completed".to_string();
            }
        }
        if let Some(value) = input.assigned_to {
            item.assigned_to = value;
        }
        if let Some(value) = input.due_date {
            item.due_date = value;
        }
        apply_completion_rules(&mut item, &before);

        let after = self.persist(&item).await?;
        self.audit_update(&before, &after, actor).await?;
        Ok(after)
    }

    /// Status-only transition, with the completion side effects applied.
    pub async fn set_status(
        &self,
        id: i64,
        status: String,
        actor: &Actor,
    ) -> Result<ActionItem, ServiceError> {
        validate_choice("status", &status, &STATUSES)?;
        let before = self.get(id).await?;

        let mut item = before.clone();
        item.status = status;
        apply_completion_rules(&mut item, &before);

        let after = self.persist(&item).await?;
        self.audit_update(&before, &after, actor).await?;
        Ok(after)
    }

    pub async fn delete(&self, id: i64, actor: &Actor) -> Result<(), ServiceError> {
        let item = self.get(id).await?;
        if !actor.owns_or_manages(item.owner_id) {
            return Err(ServiceError::Forbidden(
                "Only the item owner or a manager can delete this action item".to_string(),
            ));
        }

        sqlx::query("DELETE FROM action_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.audit
            .record(
                ENTITY_ACTION_ITEM,
                id,
                ACTION_DELETE,
                Some(audit_value(&item)?),
                Some(actor.user_id),
            )
            .await;
        info!("Deleted action item {} ({})", item.id, item.title);
        Ok(())
    }

    async fn persist(&self, item: &ActionItem) -> Result<ActionItem, ServiceError> {
        sqlx::query(
            "UPDATE action_items SET title = ?, description = ?, action_type = ?, priority = ?, \
             status = ?, progress_percent = ?, assigned_to = ?, due_date = ?, completed_date = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.action_type)
        .bind(&item.priority)
        .bind(&item.status)
        .bind(item.progress_percent)
        .bind(&item.assigned_to)
        .bind(item.due_date)
        .bind(item.completed_date)
        .bind(Utc::now())
        .bind(item.id)
        .execute(&self.pool)
        .await?;
        self.get(item.id).await
    }

    async fn audit_update(
        &self,
        before: &ActionItem,
        after: &ActionItem,
        actor: &Actor,
    ) -> Result<(), ServiceError> {
        let diff = diff_fields(&audit_value(before)?, &audit_value(after)?);
        if diff.as_object().is_some_and(|m| !m.is_empty()) {
            self.audit
                .record(
                    ENTITY_ACTION_ITEM,
                    after.id,
                    ACTION_UPDATE,
                    Some(diff),
                    Some(actor.user_id),
                )
                .await;
        }
        Ok(())
    }
}

/// Completion bookkeeping: a completed item is fully progressed and
/// carries its completion date; leaving completed clears the date.
fn apply_completion_rules(item: &mut ActionItem, before: &ActionItem) {
    if item.status == "completed" {
        item.progress_percent = 100;
        if before.status != "completed" || item.completed_date.is_none() {
            item.completed_date = item
                .completed_date
                .or_else(|| Some(Utc::now().date_naive()));
        }
    } else {
        item.completed_date = None;
    }
}

fn validate_choice(field: &str, value: &str, allowed: &[&str]) -> Result<(), ServiceError> {
    if !allowed.contains(&value) {
        return Err(ServiceError::Validation(format!(
            "{} must be one of: {}",
            field,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_progress(value: i64) -> Result<(), ServiceError> {
    if !(0..=100).contains(&value) {
        return Err(ServiceError::Validation(
            "progress_percent must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}
