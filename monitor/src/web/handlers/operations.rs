// Operation inspection endpoints

use axum::{extract::State, response::Json};

use super::common::{ApiResponse, ApiResult};
use crate::operation_registry::RegistryStatus;
use crate::web::AppState;

/// Get all registered check operations
pub async fn get_active_operations(State(state): State<AppState>) -> ApiResult<RegistryStatus> {
    let operations = state.monitoring.active_operations().await;
    Ok(Json(ApiResponse::success(operations)))
}
