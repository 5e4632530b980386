use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::auth::roles::{role_catalog, Permission, RoleInfo};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::user_service::{
    PermissionsRead, UserCreate, UserRead, UserService, UserUpdate,
};

fn service(state: &AppState) -> UserService {
    UserService::new(state.pool.clone(), state.config.security.clone())
}

/// GET /users — all accounts, newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<UserRead>> {
    user.require(Permission::ManageUsers)?;
    let users = service(&state).list().await?;
    Ok(ApiResponse::success(users))
}

/// POST /users — create an account with an explicit role.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UserCreate>,
) -> ApiResult<UserRead> {
    user.require(Permission::ManageUsers)?;
    let created = service(&state).create(body).await?;
    Ok(ApiResponse::created(created))
}

/// GET /users/roles — the role catalog. Public so the login and signup
/// screens can describe what each role grants.
pub async fn roles() -> ApiResult<Vec<RoleInfo>> {
    Ok(ApiResponse::success(role_catalog()))
}

/// GET /users/:id — a single account; callers may always read their own.
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<UserRead> {
    if user.id != id {
        user.require(Permission::ViewUsers)?;
    }
    let found = service(&state).get(id).await?;
    Ok(ApiResponse::success(found))
}

/// PUT /users/:id — update profile, role, active flag, or password.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<UserUpdate>,
) -> ApiResult<UserRead> {
    user.require(Permission::ManageUsers)?;
    let updated = service(&state).update(id, body, &user.actor()).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /users/:id — soft delete.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    user.require(Permission::ManageUsers)?;
    service(&state).deactivate(id, &user.actor()).await?;
    Ok(ApiResponse::no_content())
}

/// GET /users/:id/permissions — the account's resolved permission list.
pub async fn permissions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<PermissionsRead> {
    if user.id != id {
        user.require(Permission::ViewUsers)?;
    }
    let permissions = service(&state).permissions_of(id).await?;
    Ok(ApiResponse::success(permissions))
}
