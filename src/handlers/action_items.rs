use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::roles::Permission;
use crate::database::models::ActionItem;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::action_item_service::{
    ActionItemCreate, ActionItemFilter, ActionItemService, ActionItemUpdate,
};

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

/// GET /action-items
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<ActionItemFilter>,
) -> ApiResult<Vec<ActionItem>> {
    user.require(Permission::ViewActionItems)?;
    let items = ActionItemService::new(state.pool.clone())
        .list(&filter)
        .await?;
    Ok(ApiResponse::success(items))
}

/// POST /action-items — create under an existing risk.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ActionItemCreate>,
) -> ApiResult<ActionItem> {
    user.require(Permission::CreateActionItems)?;
    let item = ActionItemService::new(state.pool.clone())
        .create(body, &user.actor())
        .await?;
    Ok(ApiResponse::created(item))
}

/// GET /action-items/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<ActionItem> {
    user.require(Permission::ViewActionItems)?;
    let item = ActionItemService::new(state.pool.clone()).get(id).await?;
    Ok(ApiResponse::success(item))
}

/// PUT /action-items/:id — partial update, owner or manager only.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<ActionItemUpdate>,
) -> ApiResult<ActionItem> {
    user.require(Permission::EditActionItems)?;
    let item = ActionItemService::new(state.pool.clone())
        .update(id, body, &user.actor())
        .await?;
    Ok(ApiResponse::success(item))
}

/// PATCH /action-items/:id/status — status-only transition.
pub async fn set_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<StatusChange>,
) -> ApiResult<ActionItem> {
    user.require(Permission::EditActionItems)?;
    let item = ActionItemService::new(state.pool.clone())
        .set_status(id, body.status, &user.actor())
        .await?;
    Ok(ApiResponse::success(item))
}

/// DELETE /action-items/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    user.require(Permission::DeleteActionItems)?;
    ActionItemService::new(state.pool.clone())
        .delete(id, &user.actor())
        .await?;
    Ok(ApiResponse::no_content())
}
