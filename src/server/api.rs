//! API route definitions

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "message": "Not found. See /health and /monitor/status.",
        })),
    )
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Serving
        .route("/predict", post(handlers::predict))
        // Monitoring
        .route("/monitor/status", get(handlers::monitor_status))
        .route("/monitor/trigger_now", post(handlers::trigger_now))
        .route("/monitor/generate_report", get(handlers::generate_report))
        .route("/monitor/report/latest", get(handlers::latest_report))
        // System
        .route("/health", get(handlers::health_check))
        .fallback(handle_404)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
