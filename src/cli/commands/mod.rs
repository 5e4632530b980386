pub mod env;
pub mod seed;
pub mod user;

use sqlx::SqlitePool;

use crate::auth::roles::Role;
use crate::services::Actor;
use crate::{config, database};

/// Open the configured database and bring its schema up to date.
pub async fn open_pool() -> anyhow::Result<SqlitePool> {
    let config = config::config();
    let pool = database::connect(&config.database.url, config.database.max_connections).await?;
    database::migrate(&pool).await?;
    Ok(pool)
}

/// The CLI acts with manager rights and no user id, so ownership and
/// self-modification guards never trip.
pub fn cli_actor() -> Actor {
    Actor {
        user_id: 0,
        role: Role::Manager,
    }
}
