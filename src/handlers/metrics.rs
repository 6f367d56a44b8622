//! Prometheus exposition handler

use axum::{http::StatusCode, response::IntoResponse};

use crate::metrics::METRICS;

pub async fn export() -> impl IntoResponse {
    match METRICS.gather() {
        Ok(text) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            text,
        ),
        Err(e) => {
            tracing::error!("Failed to gather metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Error gathering metrics: {e}"),
            )
        }
    }
}
