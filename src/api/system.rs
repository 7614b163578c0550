use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiResponse, AppState, SystemStatus};

/// Returns service status.
///
/// # Endpoint
/// `GET /api/system/status`
///
/// Database reachability is reported rather than failing the request.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SystemStatus>> {
    let database_reachable = match state.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database ping failed");
            false
        }
    };

    Json(ApiResponse::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        database_reachable,
        pending_checkpoints: state.captcha().pending_count(),
        metrics_enabled: state.prometheus_handle.is_some(),
    }))
}
