//! Training handler

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::models::{TrainRequest, TrainResponse, ValidatedJson};
use crate::{AppResult, AppState};

/// Fit a new model on the submitted batch and publish it
pub async fn train(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TrainRequest>,
) -> AppResult<Json<TrainResponse>> {
    tracing::info!(records = req.logs.len(), test_size = req.test_size, "training requested");

    let engine = Arc::clone(&state.engine);
    let summary = tokio::task::spawn_blocking(move || engine.train(&req.logs, req.test_size))
        .await??;

    Ok(Json(summary.into()))
}
