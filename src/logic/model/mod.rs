//! Model Module - scaling transform, outlier model and trained state
//!
//! The trainer and detector only see the collaborators through
//! `FeatureScaler` and `OutlierModel`, so the concrete scaler and forest
//! can be swapped (or stubbed in tests) without touching the pipeline.

pub mod scaler;
pub mod forest;
pub mod state;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export common types
pub use scaler::StandardScaler;
pub use forest::{ForestConfig, IsolationForest};
pub use state::{ModelSnapshot, ModelStore};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot run {0} on an empty matrix")]
    EmptyInput(&'static str),

    #[error("expected {expected} feature columns, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("model returned {actual} results for {expected} rows")]
    LengthMismatch { expected: usize, actual: usize },
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Binary model output for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Normal,
    Anomalous,
}

impl Verdict {
    /// Negative decision values are anomalous
    pub fn from_decision(score: f64) -> Self {
        if score < 0.0 {
            Verdict::Anomalous
        } else {
            Verdict::Normal
        }
    }

    pub fn is_anomalous(self) -> bool {
        self == Verdict::Anomalous
    }
}

/// Fit-once, apply-many feature normalization
pub trait FeatureScaler: Send + Sync {
    fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, ModelError>;
}

/// Trained outlier model
pub trait OutlierModel: Send + Sync {
    /// Binary classification per row
    fn predict(&self, data: &Array2<f64>) -> Result<Vec<Verdict>, ModelError>;

    /// Continuous score per row, lower is more anomalous
    fn decision_function(&self, data: &Array2<f64>) -> Result<Vec<f64>, ModelError>;
}
