use axum::{extract::State, Extension, Json};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::auth_service::{AuthService, LoginRequest, LoginResponse, RegisterRequest};
use crate::services::user_service::{UserRead, UserService};

/// POST /auth/register — open registration; new accounts are viewers.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<UserRead> {
    let service = AuthService::new(state.pool.clone(), state.config.security.clone());
    let user = service.register(body).await?;
    Ok(ApiResponse::created(user))
}

/// POST /auth/login — verify credentials and issue a bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let service = AuthService::new(state.pool.clone(), state.config.security.clone());
    let response = service.login(body).await?;
    Ok(ApiResponse::success(response))
}

/// GET /auth/me — the caller's own account.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<UserRead> {
    let service = UserService::new(state.pool.clone(), state.config.security.clone());
    let me = service.get(user.id).await?;
    Ok(ApiResponse::success(me))
}
