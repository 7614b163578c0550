use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_limit;
use super::{ApiError, ApiResponse, AppState, QueryRecordDto};

const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct QueriesParams {
    pub limit: Option<usize>,
}

/// `GET /api/queries?limit=N`, newest first.
pub async fn list_queries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueriesParams>,
) -> Result<Json<ApiResponse<Vec<QueryRecordDto>>>, ApiError> {
    let limit = validate_limit(params.limit.unwrap_or(DEFAULT_LIMIT))?;

    let records = state.store().recent_queries(limit as u64).await?;
    let dtos = records.into_iter().map(QueryRecordDto::from).collect();

    Ok(Json(ApiResponse::success(dtos)))
}
