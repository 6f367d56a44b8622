//! Liveness check

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Liveness {
    status: &'static str,
    version: &'static str,
    timestamp: DateTime<Utc>,
    /// Whether a snapshot is published; an untrained service is still healthy
    model_loaded: bool,
}

pub async fn check(State(state): State<AppState>) -> Json<Liveness> {
    Json(Liveness {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        model_loaded: state.engine.is_trained(),
    })
}
