use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::auth;
use crate::auth::roles::{permissions_for, Permission, Role};
use crate::config::SecurityConfig;
use crate::database::models::User;
use crate::services::{double_option, normalize_email, Actor, ServiceError};

/// User row shaped for responses. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserRead {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserRead {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default, deserialize_with = "double_option")]
    pub full_name: Option<Option<String>>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

/// Resolved permissions for one account.
#[derive(Debug, Serialize)]
pub struct PermissionsRead {
    pub user_id: i64,
    pub email: String,
    pub role: String,
    pub permissions: Vec<Permission>,
}

pub struct UserService {
    pool: SqlitePool,
    security: SecurityConfig,
}

impl UserService {
    pub fn new(pool: SqlitePool, security: SecurityConfig) -> Self {
        Self { pool, security }
    }

    pub async fn list(&self) -> Result<Vec<UserRead>, ServiceError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users.into_iter().map(UserRead::from).collect())
    }

    /// Create an account with an explicit role.
    pub async fn create(&self, input: UserCreate) -> Result<UserRead, ServiceError> {
        let email = normalize_email(&input.email)
            .ok_or_else(|| ServiceError::Validation("Invalid email address".to_string()))?;
        if input.password.chars().count() < 8 {
            return Err(ServiceError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        let role = parse_role(input.role.as_deref().unwrap_or("viewer"))?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(&email)
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Err(ServiceError::Conflict(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let hashed = auth::hash_password(&input.password, self.security.bcrypt_cost)
            .map_err(|e| ServiceError::Internal(format!("Failed to hash password: {}", e)))?;
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (email, hashed_password, full_name, role, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&email)
        .bind(&hashed)
        .bind(&input.full_name)
        .bind(role.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let user = self.get_row(result.last_insert_rowid()).await?;
        info!("Created user {} with role {}", user.email, user.role);
        Ok(UserRead::from(user))
    }

    pub async fn get(&self, id: i64) -> Result<UserRead, ServiceError> {
        Ok(UserRead::from(self.get_row(id).await?))
    }

    /// Update profile, role, active flag, or password.
    pub async fn update(
        &self,
        id: i64,
        input: UserUpdate,
        actor: &Actor,
    ) -> Result<UserRead, ServiceError> {
        let user = self.get_row(id).await?;

        let role = match &input.role {
            Some(value) => {
                let parsed = parse_role(value)?;
                if actor.user_id == id && parsed != user.role_enum() {
                    return Err(ServiceError::Validation(
                        "You cannot change your own role".to_string(),
                    ));
                }
                parsed
            }
            None => user.role_enum(),
        };

        let is_active = match input.is_active {
            Some(false) if actor.user_id == id => {
                return Err(ServiceError::Validation(
                    "You cannot deactivate your own account".to_string(),
                ));
            }
            Some(value) => value,
            None => user.is_active,
        };

        let hashed_password = match &input.password {
            Some(password) => {
                if password.chars().count() < 8 {
                    return Err(ServiceError::Validation(
                        "Password must be at least 8 characters".to_string(),
                    ));
                }
                auth::hash_password(password, self.security.bcrypt_cost)
                    .map_err(|e| ServiceError::Internal(format!("Failed to hash password: {}", e)))?
            }
            None => user.hashed_password.clone(),
        };

        let full_name = match input.full_name {
            Some(value) => value,
            None => user.full_name.clone(),
        };

        sqlx::query(
            "UPDATE users SET full_name = ?, role = ?, is_active = ?, hashed_password = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&full_name)
        .bind(role.as_str())
        .bind(is_active)
        .bind(&hashed_password)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        let updated = self.get_row(id).await?;
        info!("Updated user {}", updated.email);
        Ok(UserRead::from(updated))
    }

    /// Soft delete: the account stays for audit references but can no
    /// longer log in.
    pub async fn deactivate(&self, id: i64, actor: &Actor) -> Result<(), ServiceError> {
        if actor.user_id == id {
            return Err(ServiceError::Validation(
                "You cannot deactivate your own account".to_string(),
            ));
        }
        let user = self.get_row(id).await?;

        sqlx::query("UPDATE users SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!("Deactivated user {}", user.email);
        Ok(())
    }

    pub async fn permissions_of(&self, id: i64) -> Result<PermissionsRead, ServiceError> {
        let user = self.get_row(id).await?;
        let role = user.role_enum();
        Ok(PermissionsRead {
            user_id: user.id,
            email: user.email,
            role: user.role,
            permissions: permissions_for(role),
        })
    }

    async fn get_row(&self, id: i64) -> Result<User, ServiceError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }
}

fn parse_role(value: &str) -> Result<Role, ServiceError> {
    Role::parse(value)
        .ok_or_else(|| ServiceError::Validation(format!("Unknown role '{}'", value)))
}
