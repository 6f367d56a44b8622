//! Training request/response

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::logic::{LogRecord, TrainingSummary, DEFAULT_TEST_SIZE};

fn default_test_size() -> f64 {
    DEFAULT_TEST_SIZE
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrainRequest {
    #[validate(nested)]
    pub logs: Vec<LogRecord>,

    /// Held-out fraction, strictly between 0 and 1
    #[serde(default = "default_test_size")]
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub test_size: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrainResponse {
    pub status: String,
    pub message: String,
    pub training_samples: usize,
    pub train_anomalies: usize,
    pub test_anomalies: usize,
    pub model_accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl From<TrainingSummary> for TrainResponse {
    fn from(summary: TrainingSummary) -> Self {
        Self {
            status: "success".to_string(),
            message: "Model trained successfully".to_string(),
            training_samples: summary.training_samples,
            train_anomalies: summary.train_anomalies,
            test_anomalies: summary.test_anomalies,
            model_accuracy: summary.model_accuracy,
            timestamp: summary.timestamp,
        }
    }
}
