use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde::Deserialize;

use crate::auth::roles::Permission;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::action_item_service::ActionItemService;
use crate::services::audit_service::{
    AuditLogFilter, AuditLogRead, AuditService, TrendPoint, ENTITY_ACTION_ITEM, ENTITY_RISK,
};
use crate::services::risk_service::RiskService;

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub days: Option<i64>,
}

/// GET /audit/logs — global mutation history.
pub async fn logs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<AuditLogFilter>,
) -> ApiResult<Vec<AuditLogRead>> {
    user.require(Permission::ViewAuditLogs)?;
    let logs = AuditService::new(state.pool.clone()).list(&filter).await?;
    Ok(ApiResponse::success(logs))
}

/// GET /audit/risks/:id/trail — one risk's history, oldest first.
pub async fn risk_trail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<AuditLogRead>> {
    user.require(Permission::ViewRisks)?;
    RiskService::new(state.pool.clone()).get(id).await?;
    let trail = AuditService::new(state.pool.clone())
        .trail(ENTITY_RISK, id)
        .await?;
    Ok(ApiResponse::success(trail))
}

/// GET /audit/action-items/:id/trail
pub async fn action_item_trail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<AuditLogRead>> {
    user.require(Permission::ViewActionItems)?;
    ActionItemService::new(state.pool.clone()).get(id).await?;
    let trail = AuditService::new(state.pool.clone())
        .trail(ENTITY_ACTION_ITEM, id)
        .await?;
    Ok(ApiResponse::success(trail))
}

/// GET /audit/risks/:id/trend?days=N — scoring history over a window,
/// ending at the risk's current state.
pub async fn risk_trend(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Query(query): Query<TrendQuery>,
) -> ApiResult<Vec<TrendPoint>> {
    user.require(Permission::ViewRisks)?;
    let risk = RiskService::new(state.pool.clone()).get(id).await?;
    let days = query.days.unwrap_or(30);
    let trend = AuditService::new(state.pool.clone())
        .risk_trend(&risk, days)
        .await?;
    Ok(ApiResponse::success(trend))
}
