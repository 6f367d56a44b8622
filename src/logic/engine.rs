//! Anomaly Engine
//!
//! Service object behind the HTTP handlers. Owns the published model
//! snapshot, the artifact directory and the forest configuration.
//! All methods are synchronous and CPU-bound; callers on an async
//! runtime should run them on a blocking thread.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::detector::{self, AnomalyReport, DetectError};
use crate::logic::features::FEATURE_COUNT;
use crate::logic::model::{ForestConfig, ModelStore};
use crate::logic::record::LogRecord;
use crate::logic::storage::{ArtifactStore, StorageError};
use crate::logic::trainer::{self, TrainError, TrainingSummary};
use crate::metrics;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No trained model found on disk")]
    NotFound(PathBuf),

    #[error(transparent)]
    Failed(StorageError),
}

impl From<StorageError> for LoadError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(dir) => LoadError::NotFound(dir),
            other => LoadError::Failed(other),
        }
    }
}

/// Current model state as reported on `/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub is_trained: bool,
    pub training_date: Option<DateTime<Utc>>,
    pub model_accuracy: Option<f64>,
    pub feature_count: usize,
}

pub struct AnomalyEngine {
    store: ModelStore,
    artifacts: ArtifactStore,
    forest: ForestConfig,
    /// Held while artifacts are written or read and the result published,
    /// so the files on disk always match the published snapshot
    write_lock: Mutex<()>,
}

impl AnomalyEngine {
    pub fn new(artifacts: ArtifactStore, forest: ForestConfig) -> Self {
        Self {
            store: ModelStore::new(),
            artifacts,
            forest,
            write_lock: Mutex::new(()),
        }
    }

    /// Fit, persist, then publish a new snapshot.
    /// The current snapshot stays in place if any step fails. Fitting runs
    /// unlocked; concurrent trains serialize only on persist and publish.
    pub fn train(
        &self,
        logs: &[LogRecord],
        test_size: f64,
    ) -> Result<TrainingSummary, TrainError> {
        let result = trainer::fit_snapshot(logs, test_size, &self.forest).and_then(
            |(snapshot, summary)| {
                let _guard = self.write_lock.lock();
                self.artifacts.save_snapshot(&snapshot)?;
                self.store.publish(snapshot);
                Ok(summary)
            },
        );

        metrics::record_training(result.is_ok());
        result
    }

    /// Score a batch against the snapshot published when the call starts
    pub fn detect(&self, logs: &[LogRecord], threshold: f64) -> Result<AnomalyReport, DetectError> {
        let snapshot = self.store.current();
        detector::detect(snapshot.as_deref(), logs, threshold)
    }

    /// Replace the current snapshot with the one on disk
    pub fn load(&self) -> Result<ModelStatus, LoadError> {
        let _guard = self.write_lock.lock();
        let snapshot = self.artifacts.load_snapshot()?;
        self.store.publish(snapshot);
        Ok(self.status())
    }

    pub fn is_trained(&self) -> bool {
        self.store.is_trained()
    }

    pub fn status(&self) -> ModelStatus {
        match self.store.current() {
            Some(snapshot) => ModelStatus {
                is_trained: true,
                training_date: Some(snapshot.trained_at),
                model_accuracy: snapshot.model_accuracy,
                feature_count: FEATURE_COUNT,
            },
            None => ModelStatus {
                is_trained: false,
                training_date: None,
                model_accuracy: None,
                feature_count: 0,
            },
        }
    }
}
