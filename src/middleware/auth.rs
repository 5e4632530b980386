use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::roles::{Permission, Role};
use crate::error::ApiError;
use crate::server::AppState;
use crate::services::{Actor, AuthService};

/// The authenticated account, resolved from the bearer token and
/// injected into request extensions for handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            role: self.role,
        }
    }

    /// Permission gate used at the top of every protected handler.
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.role.has(permission) {
            return Ok(());
        }
        Err(ApiError::forbidden(format!(
            "Requires the '{}' permission",
            permission.as_str()
        )))
    }
}

/// Bearer-token authentication for the protected route group. The user
/// row is re-read on every request so role changes and deactivations
/// take effect immediately.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)?;

    let service = AuthService::new(state.pool.clone(), state.config.security.clone());
    let user = service.authenticate(token).await?;

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role_enum(),
    });
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header"))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use the Bearer scheme"))?
        .trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized("Empty bearer token"));
    }
    Ok(token)
}
