//! API Anomaly Detection Service
//!
//! Flags unusual API access-log records with an isolation forest trained
//! on recent traffic.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      API ANOMALY SERVICE                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────────┐   ┌────────────────────┐  │
//! │  │  HTTP     │──▶│ AnomalyEngine │──▶│ ArtifactStore      │  │
//! │  │  (Axum)   │   │ train/detect  │   │ scaler + forest    │  │
//! │  └───────────┘   └───────┬───────┘   └────────────────────┘  │
//! │                          ▼                                   │
//! │       features ──▶ StandardScaler ──▶ IsolationForest        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod metrics;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};

use logic::{AnomalyEngine, ArtifactStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub engine: Arc<AnomalyEngine>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let engine = AnomalyEngine::new(ArtifactStore::new(&config.model_dir), config.forest);
        Self {
            config,
            engine: Arc::new(engine),
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/metrics", get(handlers::metrics::export));

    // Model routes (API token auth)
    let model_routes = Router::new()
        .route("/train", post(handlers::train::train))
        .route("/detect", post(handlers::detect::detect))
        .route("/status", get(handlers::status::status))
        .route("/load-model", post(handlers::model::load))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_api_token,
        ));

    Router::new()
        .merge(public_routes)
        .merge(model_routes)
        .route_layer(axum_middleware::from_fn(middleware::metrics::track_metrics))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
