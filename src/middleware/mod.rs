pub mod auth;
pub mod response;

pub use auth::{require_auth, AuthUser};
pub use response::{ApiResponse, ApiResult};
