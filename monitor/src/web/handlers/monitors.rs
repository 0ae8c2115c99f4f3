// Monitor endpoints

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use tracing::info;

use super::common::{error_response, ApiResponse, ApiResult, HistoryQuery, SiteQuery};
use crate::config::MonitorConfig;
use crate::database::HistoryEntry;
use crate::types::{CheckResult, Monitor};
use crate::web::AppState;

#[derive(Deserialize)]
pub struct CreateMonitorRequest {
    pub id: String,
    pub site_id: String,
    #[serde(flatten)]
    pub config: MonitorConfig,
}

/// List monitors, optionally for one site
pub async fn list_monitors(
    Query(query): Query<SiteQuery>,
    State(state): State<AppState>,
) -> ApiResult<Vec<Monitor>> {
    state
        .monitoring
        .list_monitors(query.site_id.as_deref())
        .await
        .map(|monitors| Json(ApiResponse::success(monitors)))
        .map_err(|e| error_response("Failed to list monitors", e))
}

pub async fn get_monitor(
    Path(monitor_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Monitor> {
    state
        .monitoring
        .get_monitor(&monitor_id)
        .await
        .map(|monitor| Json(ApiResponse::success(monitor)))
        .map_err(|e| error_response("Failed to load monitor", e))
}

/// Newest history rows first
pub async fn get_monitor_history(
    Path(monitor_id): Path<String>,
    Query(query): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> ApiResult<Vec<HistoryEntry>> {
    state
        .monitoring
        .history(&monitor_id, query.limit)
        .await
        .map(|history| Json(ApiResponse::success(history)))
        .map_err(|e| error_response("Failed to load history", e))
}

/// Run a manual check and return its result
pub async fn check_monitor_now(
    Path(monitor_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<CheckResult> {
    info!("Manual check requested for: {}", monitor_id);

    state
        .monitoring
        .check_now(&monitor_id)
        .await
        .map(|result| Json(ApiResponse::success(result)))
        .map_err(|e| error_response("Manual check failed", e))
}

pub async fn add_monitor(
    State(state): State<AppState>,
    Json(request): Json<CreateMonitorRequest>,
) -> ApiResult<Monitor> {
    let monitor = request.config.into_monitor(&request.id, &request.site_id);

    state
        .monitoring
        .add_monitor(monitor)
        .await
        .map(|monitor| Json(ApiResponse::success(monitor)))
        .map_err(|e| error_response("Failed to add monitor", e))
}
