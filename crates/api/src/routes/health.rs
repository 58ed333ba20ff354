//! Health and Metrics Routes

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` when the model is loaded, `degraded` otherwise
    pub status: &'static str,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: ModelStatus,
}

/// Loaded model details
#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub ready: bool,
    pub run_id: Option<Uuid>,
    pub n_features: Option<usize>,
    /// Load failure, when the model is unavailable
    pub error: Option<String>,
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let context = state.engine.context();
    let model = ModelStatus {
        ready: context.is_some(),
        run_id: context.and_then(|c| c.run_id()),
        n_features: context.map(|c| c.n_features()),
        error: state.engine.unavailable_reason().map(|e| e.to_string()),
    };

    Json(HealthResponse {
        status: if model.ready { "healthy" } else { "degraded" },
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model,
    })
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics are disabled\n".to_string()),
    }
}
