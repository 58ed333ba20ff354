//! Fraud Scoring API Server
//!
//! REST front-end over the inference engine. The engine is loaded once at
//! startup and shared read-only by every request.

pub mod config;
pub mod rate_limit;
mod routes;

use crate::config::{LoggingConfig, ServerConfig};
use crate::rate_limit::{create_governor_config, spawn_cleanup, DefaultGovernorConfig};
use axum::{
    routing::{get, post},
    Router,
};
use data_validator::Validator;
use inference_engine::InferenceEngine;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use storage::ArtifactStore;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Server start-up errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Logging setup failed: {0}")]
    Logging(String),
    #[error("Metrics setup failed: {0}")]
    Metrics(String),
    #[error("Invalid rate limit: {0}")]
    RateLimit(String),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Application state shared across handlers
pub struct AppState {
    /// Scoring engine, ready or permanently unavailable
    pub engine: Arc<InferenceEngine>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(engine: InferenceEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the application router
pub fn create_router(
    state: Arc<AppState>,
    rate_limit: Option<Arc<DefaultGovernorConfig>>,
) -> Router {
    let mut scoring = Router::new()
        .route("/api/v1/predict", post(routes::predict::predict))
        .route("/predict", post(routes::predict::predict));
    if let Some(config) = rate_limit {
        scoring = scoring.layer(GovernorLayer { config });
    }

    Router::new()
        .merge(scoring)
        .route("/api/v1/health", get(routes::health::health))
        .route("/metrics", get(routes::health::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), ApiError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ApiError::Logging(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
    .map_err(|e| ApiError::Logging(e.to_string()))
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Result<PrometheusHandle, ApiError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ApiError::Metrics(e.to_string()))
}

/// Load the model artifacts, then serve until interrupted
pub async fn run_server(config: ServerConfig) -> Result<(), ApiError> {
    let store = ArtifactStore::new(&config.artifacts.dir);
    let engine = InferenceEngine::load(&store, Validator::new(config.validation.clone()));
    if !engine.is_ready() {
        warn!("Serving without a model; prediction requests will fail with artifact_missing");
    }

    let mut state = AppState::new(engine);
    if config.metrics.enabled {
        state = state.with_metrics(install_metrics()?);
    }

    let governor = create_governor_config(&config.rate_limit)?;
    if let Some(governor) = &governor {
        spawn_cleanup(governor, Duration::from_secs(60));
    }
    let app = create_router(Arc::new(state), governor);

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .map_err(|source| ApiError::Bind {
            addr: config.server.addr.clone(),
            source,
        })?;
    info!(addr = %config.server.addr, "Starting API server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(ApiError::Serve)?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
