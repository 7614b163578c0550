use chrono::NaiveDateTime;
use serde::Serialize;

use crate::db::QueryRecord;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// A stored lookup without its page content.
#[derive(Debug, Serialize)]
pub struct QueryRecordDto {
    pub id: i32,
    pub query_data: serde_json::Value,
    pub raw_response_length: usize,
    pub timestamp: NaiveDateTime,
}

impl From<QueryRecord> for QueryRecordDto {
    fn from(record: QueryRecord) -> Self {
        Self {
            id: record.id,
            query_data: record.query_data,
            raw_response_length: record.raw_response.map_or(0, |r| r.len()),
            timestamp: record.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub database_reachable: bool,
    pub pending_checkpoints: usize,
    pub metrics_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckpointActionDto {
    pub id: crate::domain::CheckpointId,
    pub action: &'static str,
}
