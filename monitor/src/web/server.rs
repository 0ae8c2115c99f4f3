// File: monitor/src/web/server.rs
use crate::web::{handlers, AppState};
use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub async fn start_web_server(state: AppState) -> Result<()> {
    let app = create_router(state.clone());
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // === MONITOR ROUTES ===
        .route(
            "/api/monitors",
            get(handlers::list_monitors).post(handlers::add_monitor),
        )
        .route("/api/monitors/{monitor_id}", get(handlers::get_monitor))
        .route(
            "/api/monitors/{monitor_id}/history",
            get(handlers::get_monitor_history),
        )
        .route(
            "/api/monitors/{monitor_id}/check",
            post(handlers::check_monitor_now),
        )
        // === MONITORING LIFECYCLE ROUTES ===
        .route(
            "/api/monitoring/start",
            post(handlers::start_monitoring),
        )
        .route("/api/monitoring/stop", post(handlers::stop_monitoring))
        .route("/api/sites/{site_id}", delete(handlers::delete_site))
        // === OPERATION ROUTES ===
        .route(
            "/api/operations/active",
            get(handlers::get_active_operations),
        )
        // === EVENT STREAM ===
        .route("/api/events", get(handlers::stream_events))
        // Add middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
