//! Trainer
//!
//! Fits a fresh scaler and forest on a batch and reports how the fitted
//! model classifies both the training rows and a held-out split.
//! Persisting and publishing the result is left to the engine, so a
//! failure here never touches the current state.

use chrono::{DateTime, Utc};
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::features::extract_matrix;
use crate::logic::model::{
    FeatureScaler, ForestConfig, IsolationForest, ModelError, ModelSnapshot, OutlierModel,
    StandardScaler,
};
use crate::logic::record::LogRecord;
use crate::logic::storage::StorageError;

/// Held-out fraction used when the caller gives none
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("test_size must be strictly between 0 and 1, got {0}")]
    InvalidSplit(f64),

    #[error("not enough data to train: {records} records leave an empty training split")]
    InsufficientData { records: usize },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Rows in the submitted batch, both splits included
    pub training_samples: usize,
    pub train_anomalies: usize,
    pub test_anomalies: usize,
    /// Fraction of held-out rows classified normal
    pub model_accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Shuffle `0..n` with a seeded PRNG and cut it into (train, test).
/// The training part holds `round(n * (1 - test_size))` indices.
pub fn split_indices(n: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train_len = ((n as f64) * (1.0 - test_size)).round() as usize;
    let test = indices.split_off(train_len.min(n));
    (indices, test)
}

/// Fit a new snapshot on `logs`
pub fn fit_snapshot(
    logs: &[LogRecord],
    test_size: f64,
    forest: &ForestConfig,
) -> Result<(ModelSnapshot, TrainingSummary), TrainError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TrainError::InvalidSplit(test_size));
    }

    let (train_idx, test_idx) = split_indices(logs.len(), test_size, forest.seed);
    if train_idx.is_empty() {
        return Err(TrainError::InsufficientData { records: logs.len() });
    }

    let features = extract_matrix(logs);
    let train = features.select(Axis(0), &train_idx);
    let test = features.select(Axis(0), &test_idx);

    let (scaler, train_scaled) = StandardScaler::fit_transform(&train)?;
    let model = IsolationForest::fit(&train_scaled, forest)?;

    let train_anomalies = count_anomalies(&model, &train_scaled)?;
    let (test_anomalies, model_accuracy) = if test_idx.is_empty() {
        (0, None)
    } else {
        let test_scaled = scaler.transform(&test)?;
        let flagged = count_anomalies(&model, &test_scaled)?;
        let accuracy = (test_idx.len() - flagged) as f64 / test_idx.len() as f64;
        (flagged, Some(accuracy))
    };

    let trained_at = Utc::now();
    let summary = TrainingSummary {
        training_samples: logs.len(),
        train_anomalies,
        test_anomalies,
        model_accuracy,
        timestamp: trained_at,
    };

    tracing::info!(
        samples = logs.len(),
        train_rows = train_idx.len(),
        test_rows = test_idx.len(),
        train_anomalies,
        test_anomalies,
        accuracy = ?model_accuracy,
        "model trained"
    );

    Ok((ModelSnapshot::new(scaler, model, trained_at, model_accuracy), summary))
}

fn count_anomalies(
    model: &dyn OutlierModel,
    data: &ndarray::Array2<f64>,
) -> Result<usize, ModelError> {
    Ok(model
        .predict(data)?
        .into_iter()
        .filter(|v| v.is_anomalous())
        .count())
}
