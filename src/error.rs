//! Error handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::logic::{DetectError, LoadError, TrainError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Auth errors
    Unauthorized,

    // Request errors
    BadRequest(String),
    NotFound(String),
    ValidationError(String),
    PayloadTooLarge,

    // Pipeline errors
    TrainingFailed(String),
    DetectionFailed(String),
    LoadFailed(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Invalid authentication token".to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ValidationError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
            }
            AppError::TrainingFailed(msg) => {
                tracing::error!("Training failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Training failed: {}", msg))
            }
            AppError::DetectionFailed(msg) => {
                tracing::error!("Detection failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Detection failed: {}", msg))
            }
            AppError::LoadFailed(msg) => {
                tracing::error!("Model loading failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Model loading failed: {}", msg))
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<TrainError> for AppError {
    fn from(err: TrainError) -> Self {
        match err {
            TrainError::InvalidSplit(_) | TrainError::InsufficientData { .. } => {
                AppError::ValidationError(err.to_string())
            }
            TrainError::Model(_) | TrainError::Storage(_) => {
                AppError::TrainingFailed(err.to_string())
            }
        }
    }
}

impl From<DetectError> for AppError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::NotTrained => AppError::BadRequest(err.to_string()),
            DetectError::Model(e) => AppError::DetectionFailed(e.to_string()),
        }
    }
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::NotFound(_) => AppError::NotFound(err.to_string()),
            LoadError::Failed(e) => AppError::LoadFailed(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(err.to_string())
    }
}
