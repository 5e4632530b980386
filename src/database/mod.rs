pub mod models;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Errors from pool setup and schema management
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL: {0}")]
    Connection(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Open a SQLite pool for the given URL, creating the file if needed.
/// Only `sqlite:` URLs are accepted; a bare path would otherwise be
/// silently created as a new database file.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, DatabaseError> {
    if !url.starts_with("sqlite:") {
        return Err(DatabaseError::Connection(format!(
            "expected a sqlite: URL, got '{}'",
            url
        )));
    }

    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| DatabaseError::Connection(e.to_string()))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    info!("Database pool ready: {}", url);
    Ok(pool)
}

/// Apply the embedded migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<(), DatabaseError> {
    sqlx::migrate!()
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    info!("Database migrations applied");
    Ok(())
}

/// Pings the pool to ensure connectivity
pub async fn health_check(pool: &SqlitePool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connects_and_migrates_in_memory() {
        // A single connection keeps the in-memory database shared
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        migrate(&pool).await.unwrap();
        health_check(&pool).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn rejects_non_sqlite_urls() {
        // Bare paths must not be treated as filenames to create
        let result = connect("not-a-database-url", 1).await;
        assert!(matches!(result, Err(DatabaseError::Connection(_))));

        let result = connect("postgres://localhost/riskworks", 1).await;
        assert!(matches!(result, Err(DatabaseError::Connection(_))));
    }
}
