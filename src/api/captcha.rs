//! Operator controls for pending CAPTCHA checkpoints.

use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use uuid::Uuid;

use super::{ApiError, ApiResponse, AppState, CheckpointActionDto};
use crate::domain::CheckpointId;
use crate::services::PendingCheckpoint;

pub async fn list_pending(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<PendingCheckpoint>>> {
    Json(ApiResponse::success(state.captcha().pending()))
}

/// Releases the lookup waiting on `id` once the operator has solved the CAPTCHA.
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CheckpointActionDto>>, ApiError> {
    let id = CheckpointId::from(id);
    if !state.captcha().confirm(id) {
        return Err(ApiError::not_found("Checkpoint", id));
    }

    Ok(Json(ApiResponse::success(CheckpointActionDto {
        id,
        action: "confirmed",
    })))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CheckpointActionDto>>, ApiError> {
    let id = CheckpointId::from(id);
    if !state.captcha().cancel(id) {
        return Err(ApiError::not_found("Checkpoint", id));
    }

    Ok(Json(ApiResponse::success(CheckpointActionDto {
        id,
        action: "cancelled",
    })))
}
