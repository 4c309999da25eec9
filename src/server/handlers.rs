//! HTTP request handlers

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use crate::buffer::FeatureRecord;
use crate::drift::DriftReport;
use crate::error::MonitorError;
use crate::scheduler::Trigger;

use super::error::{Result, ServerError};
use super::state::AppState;

// ============================================================================
// Serving
// ============================================================================

/// Accept a feature map, predict, and log the record for monitoring.
///
/// The record is appended to the production buffer unconditionally on
/// success, whether or not an analysis run is in flight; this path never
/// waits on scheduler state.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(features): Json<BTreeMap<String, f64>>,
) -> Result<Json<serde_json::Value>> {
    let prediction = state
        .engine
        .predict(&features)
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;

    let record = FeatureRecord::new(features).with_prediction(prediction.class_id);
    state.buffer.append(record);

    debug!(
        class = %prediction.class,
        buffer_size = state.buffer.len(),
        "prediction made"
    );

    Ok(Json(json!({
        "class": prediction.class,
        "class_id": prediction.class_id,
    })))
}

// ============================================================================
// Monitoring
// ============================================================================

/// Read-only view over scheduler state, buffer fill, and report history.
pub async fn monitor_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let buffer_size = state.buffer.len();
    let min_samples = state.scheduler.min_samples();

    let recent_reports = state.store.list_recent(10);
    let latest = state.store.latest().map(|report| {
        json!({
            "id": report.id,
            "generated_at": report.generated_at,
            "verdict": report.analysis.verdict(),
            "drift_detected": report.analysis.drift_detected,
            "n_drifted": report.analysis.n_drifted,
        })
    });

    Json(json!({
        "scheduler_state": state.scheduler.state(),
        "interval_seconds": state.scheduler.interval().as_secs(),
        "buffer_size": buffer_size,
        "buffer_capacity": state.buffer.capacity(),
        "minimum_samples": min_samples,
        "ready_for_analysis": buffer_size >= min_samples,
        "recent_reports": recent_reports,
        "latest_report": latest,
        "serving": state.engine.metrics().stats(),
        "started_at": state.started_at,
    }))
}

fn run_response(outcome: crate::error::Result<DriftReport>) -> Response {
    match outcome {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "status": "completed",
                "report_id": report.id,
                "verdict": report.analysis.verdict(),
                "drift_detected": report.analysis.drift_detected,
                "drifted_features": report.analysis.drifted_features(),
                "data_points_analyzed": report.analysis.window_size,
            })),
        )
            .into_response(),
        Err(MonitorError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(json!({
                "status": "already_running",
                "message": "a drift analysis run is already in progress",
            })),
        )
            .into_response(),
        // Expected and common below the minimum-samples gate, not an error.
        Err(MonitorError::InsufficientData { have, need }) => (
            StatusCode::OK,
            Json(json!({
                "status": "insufficient_data",
                "message": "not enough data to generate a report, run the simulator first",
                "current_data_points": have,
                "minimum_data_points_required": need,
            })),
        )
            .into_response(),
        Err(MonitorError::SchemaMismatch { feature }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "status": "failed",
                "message": format!("window record missing feature '{}'", feature),
            })),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "failed",
                "message": "report generation failed, check server logs",
            })),
        )
            .into_response(),
    }
}

/// Immediately run drift detection, bypassing the schedule.
pub async fn trigger_now(State(state): State<Arc<AppState>>) -> Response {
    run_response(state.scheduler.run_once(Trigger::Manual).await)
}

/// Legacy synchronous alias for [`trigger_now`].
pub async fn generate_report(State(state): State<Arc<AppState>>) -> Response {
    run_response(state.scheduler.run_once(Trigger::Manual).await)
}

/// Full JSON body of the most recent successfully completed report.
pub async fn latest_report(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DriftReport>> {
    state
        .store
        .latest()
        .map(Json)
        .ok_or_else(|| ServerError::NotFound("no drift report generated yet".to_string()))
}

// ============================================================================
// System
// ============================================================================

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
