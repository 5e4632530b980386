use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::auth::roles::Permission;
use crate::database::models::RbsNode;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::rbs_service::{RbsNodeCreate, RbsNodeUpdate, RbsService, RbsTree};

/// GET /rbs — the caller's nodes as a flat list.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<RbsNode>> {
    user.require(Permission::ViewRbs)?;
    let nodes = RbsService::new(state.pool.clone())
        .list(&user.actor())
        .await?;
    Ok(ApiResponse::success(nodes))
}

/// GET /rbs/tree — the same nodes nested parent-to-child.
pub async fn tree(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<RbsTree>> {
    user.require(Permission::ViewRbs)?;
    let tree = RbsService::new(state.pool.clone())
        .tree(&user.actor())
        .await?;
    Ok(ApiResponse::success(tree))
}

/// POST /rbs
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RbsNodeCreate>,
) -> ApiResult<RbsNode> {
    user.require(Permission::EditRbs)?;
    let node = RbsService::new(state.pool.clone())
        .create(body, &user.actor())
        .await?;
    Ok(ApiResponse::created(node))
}

/// PUT /rbs/:id — rename, re-describe, re-parent, or re-position.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<RbsNodeUpdate>,
) -> ApiResult<RbsNode> {
    user.require(Permission::EditRbs)?;
    let node = RbsService::new(state.pool.clone())
        .update(id, body, &user.actor())
        .await?;
    Ok(ApiResponse::success(node))
}

/// DELETE /rbs/:id — children re-parent upward, risks are uncategorized.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    user.require(Permission::EditRbs)?;
    RbsService::new(state.pool.clone())
        .delete(id, &user.actor())
        .await?;
    Ok(ApiResponse::no_content())
}
