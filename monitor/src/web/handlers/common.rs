// Common types and utilities for API handlers

use axum::{http::StatusCode, response::Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::MonitorError;

// Helper type for API responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Map an engine error to a status code and error body
pub fn error_response(context: &str, e: MonitorError) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = match &e {
        MonitorError::MonitorNotFound { .. } | MonitorError::SiteNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        MonitorError::InvalidMonitor { .. } => StatusCode::BAD_REQUEST,
        MonitorError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            StatusCode::CONFLICT
        }
        _ => {
            error!("{}: {}", context, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(ApiResponse::error(e.to_string())))
}

// Query parameters
#[derive(Deserialize)]
pub struct SiteQuery {
    pub site_id: Option<String>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: u32,
}

fn default_history_limit() -> u32 {
    100
}
