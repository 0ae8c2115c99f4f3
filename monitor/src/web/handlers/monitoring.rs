// Monitoring lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};
use tracing::info;

use super::common::{error_response, ApiResponse, ApiResult, SiteQuery};
use crate::services::{StartSummary, StopSummary};
use crate::web::AppState;

pub async fn start_monitoring(
    Query(query): Query<SiteQuery>,
    State(state): State<AppState>,
) -> ApiResult<StartSummary> {
    info!(
        "Start monitoring requested for: {}",
        query.site_id.as_deref().unwrap_or("all sites")
    );

    state
        .monitoring
        .start_monitoring(query.site_id.as_deref())
        .await
        .map(|summary| Json(ApiResponse::success(summary)))
        .map_err(|e| error_response("Failed to start monitoring", e))
}

pub async fn stop_monitoring(
    Query(query): Query<SiteQuery>,
    State(state): State<AppState>,
) -> ApiResult<StopSummary> {
    info!(
        "Stop monitoring requested for: {}",
        query.site_id.as_deref().unwrap_or("all sites")
    );

    state
        .monitoring
        .stop_monitoring(query.site_id.as_deref())
        .await
        .map(|summary| Json(ApiResponse::success(summary)))
        .map_err(|e| error_response("Failed to stop monitoring", e))
}

/// Delete a site with its monitors and their history
pub async fn delete_site(
    Path(site_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Value> {
    info!("Site deletion requested for: {}", site_id);

    match state.monitoring.delete_site(&site_id).await {
        Ok(removed) => Ok(Json(ApiResponse::success(json!({
            "message": format!("Site {} deleted", site_id),
            "monitors_removed": removed
        })))),
        Err(e) => Err(error_response("Failed to delete site", e)),
    }
}
