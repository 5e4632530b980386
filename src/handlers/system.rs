use axum::{extract::State, Extension};
use serde_json::{json, Value};
use sysinfo::System;

use crate::auth::roles::Permission;
use crate::database;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;

/// GET / — service banner.
pub async fn root() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": "RiskWorks API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Risk register backend with scoring, snapshots, and audit trails",
    })))
}

/// GET /health — liveness probe, no auth.
pub async fn health() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "status": "healthy",
        "service": "riskworks-api",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

/// GET /system/status — host metrics, database health, entity counts.
pub async fn status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Value> {
    user.require(Permission::ViewSystemStatus)?;

    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu();

    let database_healthy = database::health_check(&state.pool).await.is_ok();
    let counts = entity_counts(&state).await;

    Ok(ApiResponse::success(json!({
        "service": {
            "name": "riskworks-api",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment.as_str(),
        },
        "host": {
            "hostname": System::host_name(),
            "os": System::long_os_version(),
            "cpu_count": sys.cpus().len(),
            "memory_total_bytes": sys.total_memory(),
            "memory_used_bytes": sys.used_memory(),
        },
        "database": {
            "healthy": database_healthy,
            "counts": counts,
        },
    })))
}

async fn entity_counts(state: &AppState) -> Value {
    let count = |table: &'static str| {
        let pool = state.pool.clone();
        async move {
            sqlx::query_as::<_, (i64,)>(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .map(|(n,)| n)
                .unwrap_or(0)
        }
    };

    json!({
        "users": count("users").await,
        "risks": count("risks").await,
        "action_items": count("action_items").await,
        "snapshots": count("snapshots").await,
    })
}
