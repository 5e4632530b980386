use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::auth::roles::Permission;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::risk_service::{
    RiskCreate, RiskFilter, RiskRead, RiskService, RiskUpdate,
};

/// GET /risks — org-wide listing with filters, sorting, and pagination.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<RiskFilter>,
) -> ApiResult<Vec<RiskRead>> {
    user.require(Permission::ViewRisks)?;
    let risks = RiskService::new(state.pool.clone()).list(&filter).await?;
    Ok(ApiResponse::success(risks))
}

/// POST /risks
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RiskCreate>,
) -> ApiResult<RiskRead> {
    user.require(Permission::CreateRisks)?;
    let risk = RiskService::new(state.pool.clone())
        .create(body, &user.actor())
        .await?;
    Ok(ApiResponse::created(risk))
}

/// GET /risks/owners — distinct risk owner names for filter dropdowns.
pub async fn owners(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<String>> {
    user.require(Permission::ViewRisks)?;
    let owners = RiskService::new(state.pool.clone()).owners().await?;
    Ok(ApiResponse::success(owners))
}

/// GET /risks/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<RiskRead> {
    user.require(Permission::ViewRisks)?;
    let risk = RiskService::new(state.pool.clone()).get_read(id).await?;
    Ok(ApiResponse::success(risk))
}

/// PUT /risks/:id — partial update, owner or manager only.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<RiskUpdate>,
) -> ApiResult<RiskRead> {
    user.require(Permission::EditRisks)?;
    let risk = RiskService::new(state.pool.clone())
        .update(id, body, &user.actor())
        .await?;
    Ok(ApiResponse::success(risk))
}

/// DELETE /risks/:id — removes the risk and its action items.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    user.require(Permission::DeleteRisks)?;
    RiskService::new(state.pool.clone())
        .delete(id, &user.actor())
        .await?;
    Ok(ApiResponse::no_content())
}
