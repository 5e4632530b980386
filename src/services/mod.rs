pub mod action_item_service;
pub mod audit_service;
pub mod auth_service;
pub mod rbs_service;
pub mod risk_service;
pub mod snapshot_service;
pub mod user_service;

pub use action_item_service::ActionItemService;
pub use audit_service::AuditService;
pub use auth_service::AuthService;
pub use rbs_service::RbsService;
pub use risk_service::RiskService;
pub use snapshot_service::SnapshotService;
pub use user_service::UserService;

use crate::auth::roles::Role;

/// Shared error type for the register services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Internal(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The authenticated account a mutation runs as. Resolved by the auth
/// middleware from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn is_manager(&self) -> bool {
        matches!(self.role, Role::Manager)
    }

    /// Owners may touch their own records; managers may touch anything.
    pub fn owns_or_manages(&self, owner_id: i64) -> bool {
        self.is_manager() || self.user_id == owner_id
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Clamp list pagination to sane bounds.
pub fn page_window(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// Lowercase and trim an email, rejecting obviously malformed values.
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();
    if email.len() < 3 || !email.contains('@') {
        return None;
    }
    Some(email)
}

/// Deserializer for update fields where `null` means "clear" and an
/// absent field means "leave unchanged". Use together with
/// `#[serde(default)]` on an `Option<Option<T>>` field.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window_defaults_and_clamps() {
        assert_eq!(page_window(None, None), (DEFAULT_PAGE_SIZE, 0));
        assert_eq!(page_window(Some(0), Some(-5)), (1, 0));
        assert_eq!(page_window(Some(10_000), Some(30)), (MAX_PAGE_SIZE, 30));
        assert_eq!(page_window(Some(25), Some(50)), (25, 50));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Ada@Example.COM ").as_deref(),
            Some("ada@example.com")
        );
        assert_eq!(normalize_email("not-an-email"), None);
        assert_eq!(normalize_email(""), None);
    }

    #[test]
    fn test_double_option_distinguishes_null_from_absent() {
        #[derive(serde::Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "double_option")]
            note: Option<Option<String>>,
        }

        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.note, None);

        let cleared: Patch = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(cleared.note, Some(None));

        let set: Patch = serde_json::from_str(r#"{"note": "hi"}"#).unwrap();
        assert_eq!(set.note, Some(Some("hi".to_string())));
    }
}
