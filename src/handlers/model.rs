//! Model lifecycle handlers

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::models::LoadResponse;
use crate::{AppResult, AppState};

/// Replace the current model with the artifacts on disk
pub async fn load(State(state): State<AppState>) -> AppResult<Json<LoadResponse>> {
    let engine = Arc::clone(&state.engine);
    let status = tokio::task::spawn_blocking(move || engine.load()).await??;

    tracing::info!(trained_at = ?status.training_date, "model loaded from disk");
    Ok(Json(LoadResponse::loaded()))
}
