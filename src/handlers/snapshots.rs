use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Json as ResponseJson, Response},
    Extension, Json,
};
use serde::Deserialize;

use crate::auth::roles::Permission;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;
use crate::services::snapshot_service::{
    RestoreSummary, SnapshotCreate, SnapshotImport, SnapshotRead, SnapshotService, SnapshotUpdate,
};

#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// GET /snapshots — the caller's snapshots with entity counts.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<SnapshotRead>> {
    user.require(Permission::ViewSnapshots)?;
    let snapshots = SnapshotService::new(state.pool.clone())
        .list(&user.actor())
        .await?;
    Ok(ApiResponse::success(snapshots))
}

/// POST /snapshots — capture the current register.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SnapshotCreate>,
) -> ApiResult<SnapshotRead> {
    user.require(Permission::CreateSnapshots)?;
    let snapshot = SnapshotService::new(state.pool.clone())
        .capture(body, &user.actor())
        .await?;
    Ok(ApiResponse::created(snapshot))
}

/// POST /snapshots/import — store a previously exported document.
pub async fn import(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SnapshotImport>,
) -> ApiResult<SnapshotRead> {
    user.require(Permission::CreateSnapshots)?;
    let snapshot = SnapshotService::new(state.pool.clone())
        .import(body, &user.actor())
        .await?;
    Ok(ApiResponse::created(snapshot))
}

/// GET /snapshots/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<SnapshotRead> {
    user.require(Permission::ViewSnapshots)?;
    let snapshot = SnapshotService::new(state.pool.clone())
        .get(id, &user.actor())
        .await?;
    Ok(ApiResponse::success(snapshot))
}

/// PUT /snapshots/:id — rename or re-describe.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<SnapshotUpdate>,
) -> ApiResult<SnapshotRead> {
    user.require(Permission::CreateSnapshots)?;
    let snapshot = SnapshotService::new(state.pool.clone())
        .update(id, body, &user.actor())
        .await?;
    Ok(ApiResponse::success(snapshot))
}

/// DELETE /snapshots/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    user.require(Permission::DeleteSnapshots)?;
    SnapshotService::new(state.pool.clone())
        .delete(id, &user.actor())
        .await?;
    Ok(ApiResponse::no_content())
}

/// POST /snapshots/:id/restore — replace live data with the snapshot.
/// Destructive, so the body must carry an explicit confirmation.
pub async fn restore(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<RestoreRequest>,
) -> ApiResult<RestoreSummary> {
    user.require(Permission::RestoreSnapshots)?;
    if !body.confirm {
        return Err(ApiError::unprocessable_entity(
            "Restoring replaces all current risks and action items; pass \"confirm\": true",
        ));
    }
    let summary = SnapshotService::new(state.pool.clone())
        .restore(id, &user.actor())
        .await?;
    Ok(ApiResponse::success(summary))
}

/// GET /snapshots/:id/export — the raw document as a JSON attachment.
pub async fn export(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    user.require(Permission::ViewSnapshots)?;
    let (name, payload) = SnapshotService::new(state.pool.clone())
        .export(id, &user.actor())
        .await?;

    let disposition = format!("attachment; filename=\"{}.json\"", filename_stem(&name));
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        ResponseJson(payload),
    )
        .into_response())
}

/// Reduce a snapshot name to a header-safe file name stem.
fn filename_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if stem.is_empty() {
        "snapshot".to_string()
    } else {
        stem
    }
}
