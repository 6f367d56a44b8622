//! Trained model state
//!
//! A snapshot pairs the scaler and forest from one training run and is
//! never mutated after construction. The store publishes snapshots by
//! replacing one `Arc`; readers clone the `Arc` once and keep using it
//! even if a newer snapshot is published while they run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{IsolationForest, StandardScaler};

/// Immutable (scaler, model) pair from a single training run
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    pub id: Uuid,
    pub scaler: StandardScaler,
    pub model: IsolationForest,
    pub trained_at: DateTime<Utc>,
    /// Fraction of held-out rows classified normal, if there were any
    pub model_accuracy: Option<f64>,
}

impl ModelSnapshot {
    pub fn new(
        scaler: StandardScaler,
        model: IsolationForest,
        trained_at: DateTime<Utc>,
        model_accuracy: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            scaler,
            model,
            trained_at,
            model_accuracy,
        }
    }
}

/// Currently published snapshot; `None` until the first train or load
#[derive(Debug, Default)]
pub struct ModelStore {
    current: RwLock<Option<Arc<ModelSnapshot>>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot to use for the whole of one operation
    pub fn current(&self) -> Option<Arc<ModelSnapshot>> {
        self.current.read().clone()
    }

    pub fn is_trained(&self) -> bool {
        self.current.read().is_some()
    }

    /// Replace the published snapshot
    pub fn publish(&self, snapshot: ModelSnapshot) -> Arc<ModelSnapshot> {
        let snapshot = Arc::new(snapshot);
        let previous = self.current.write().replace(Arc::clone(&snapshot));

        tracing::info!(
            snapshot = %snapshot.id,
            replaced = ?previous.map(|p| p.id),
            "published model snapshot"
        );

        snapshot
    }
}
