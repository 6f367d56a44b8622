//! Detection handler

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::logic::AnomalyReport;
use crate::models::{DetectRequest, ValidatedJson};
use crate::{AppResult, AppState};

/// Score a batch against the current model
pub async fn detect(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<DetectRequest>,
) -> AppResult<Json<AnomalyReport>> {
    let engine = Arc::clone(&state.engine);
    let report = tokio::task::spawn_blocking(move || engine.detect(&req.logs, req.threshold))
        .await??;

    Ok(Json(report))
}
