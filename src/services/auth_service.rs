use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::{self, JwtError};
use crate::config::SecurityConfig;
use crate::database::models::User;
use crate::services::user_service::UserRead;
use crate::services::normalize_email;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Account is deactivated")]
    AccountDisabled,
    #[error("Email already registered: {0}")]
    EmailTaken(String),
    #[error("{0}")]
    InvalidToken(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserRead,
}

pub struct AuthService {
    pool: SqlitePool,
    security: SecurityConfig,
}

impl AuthService {
    pub fn new(pool: SqlitePool, security: SecurityConfig) -> Self {
        Self { pool, security }
    }

    /// Create a new viewer account.
    pub async fn register(&self, req: RegisterRequest) -> Result<UserRead, AuthError> {
        let email = normalize_email(&req.email)
            .ok_or_else(|| AuthError::Validation("Invalid email address".to_string()))?;
        if req.password.chars().count() < 8 {
            return Err(AuthError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(&email)
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Err(AuthError::EmailTaken(email));
        }

        let hashed = auth::hash_password(&req.password, self.security.bcrypt_cost)?;
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (email, hashed_password, full_name, role, is_active, created_at, updated_at)
             VALUES (?, ?, ?, 'viewer', 1, ?, ?)",
        )
        .bind(&email)
        .bind(&hashed)
        .bind(&req.full_name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let user = self
            .user_by_id(result.last_insert_rowid())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        info!("Registered user {}", user.email);
        Ok(UserRead::from(user))
    }

    /// Verify credentials and issue a bearer token.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AuthError> {
        let email = normalize_email(&req.email).ok_or(AuthError::InvalidCredentials)?;
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !auth::verify_password(&req.password, &user.hashed_password)? {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let access_token = auth::generate_jwt(user.id, &self.security)?;
        info!("User {} logged in", user.email);
        Ok(LoginResponse {
            access_token,
            token_type: "bearer".to_string(),
            user: UserRead::from(user),
        })
    }

    /// Resolve a bearer token to its active user row.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = auth::decode_jwt(token, &self.security)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let user_id = claims
            .user_id()
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let user = self
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::InvalidToken("Unknown user".to_string()))?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(user)
    }

    pub async fn user_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

