//! Artifact storage
//!
//! Scaler and model are persisted as two JSON files in one directory.
//! Both carry the id of the snapshot they came from plus the feature
//! layout they were fitted against; loading checks both before a
//! snapshot is rebuilt. No versioning: every save overwrites.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::logic::features::layout::{LayoutInfo, LayoutMismatchError};
use crate::logic::model::{IsolationForest, ModelSnapshot, StandardScaler};

/// File name of the persisted scaler
pub const SCALER_ARTIFACT: &str = "scaler.json";

/// File name of the persisted outlier model
pub const MODEL_ARTIFACT: &str = "isolation_forest.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no trained model found in {0}")]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    LayoutMismatch(#[from] LayoutMismatchError),

    #[error("scaler belongs to snapshot {scaler} but model belongs to snapshot {model}")]
    SnapshotMismatch { scaler: Uuid, model: Uuid },
}

/// On-disk envelope around a scaler or model
#[derive(Debug, Serialize, Deserialize)]
pub struct Artifact<T> {
    pub snapshot_id: Uuid,
    pub layout: LayoutInfo,
    pub trained_at: DateTime<Utc>,
    pub model_accuracy: Option<f64>,
    pub payload: T,
}

impl<T> Artifact<T> {
    fn describing(snapshot: &ModelSnapshot, payload: T) -> Self {
        Self {
            snapshot_id: snapshot.id,
            layout: LayoutInfo::current(),
            trained_at: snapshot.trained_at,
            model_accuracy: snapshot.model_accuracy,
            payload,
        }
    }
}

/// Named artifacts under one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Write an artifact, creating the directory if needed.
    /// Goes through a temporary file so a crash never leaves half a file.
    pub fn save<T: Serialize>(&self, name: &str, artifact: &T) -> Result<(), StorageError> {
        let staged = self.stage(name, artifact)?;
        self.commit(&staged, name)
    }

    /// Serialize `artifact` into a temporary file unique to this call
    fn stage<T: Serialize>(&self, name: &str, artifact: &T) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.dir)?;

        let tmp = self.path(&format!("{}.{}.tmp", name, Uuid::new_v4().simple()));
        let written = serde_json::to_vec(artifact)
            .map_err(StorageError::from)
            .and_then(|json| fs::write(&tmp, json).map_err(StorageError::from));
        if let Err(err) = written {
            discard(&tmp);
            return Err(err);
        }
        Ok(tmp)
    }

    /// Move a staged file over `name`
    fn commit(&self, staged: &Path, name: &str) -> Result<(), StorageError> {
        let path = self.path(name);
        if let Err(err) = fs::rename(staged, &path) {
            discard(staged);
            return Err(err.into());
        }

        tracing::debug!(path = %path.display(), "saved artifact");
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, StorageError> {
        let path = self.path(name);
        if !path.is_file() {
            return Err(StorageError::NotFound(self.dir.clone()));
        }

        let data = fs::read(&path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Persist both halves of a snapshot.
    /// Both files are staged before either is renamed into place, so a
    /// failed write leaves the previous pair on disk.
    pub fn save_snapshot(&self, snapshot: &ModelSnapshot) -> Result<(), StorageError> {
        let scaler_artifact = Artifact::describing(snapshot, &snapshot.scaler);
        let model_artifact = Artifact::describing(snapshot, &snapshot.model);

        let scaler = self.stage(SCALER_ARTIFACT, &scaler_artifact)?;
        let model = match self.stage(MODEL_ARTIFACT, &model_artifact) {
            Ok(model) => model,
            Err(err) => {
                discard(&scaler);
                return Err(err);
            }
        };

        // Model first: if its rename fails the old scaler still matches the old model
        if let Err(err) = self.commit(&model, MODEL_ARTIFACT) {
            discard(&scaler);
            return Err(err);
        }
        self.commit(&scaler, SCALER_ARTIFACT)?;

        tracing::info!(
            snapshot = %snapshot.id,
            dir = %self.dir.display(),
            "model artifacts saved"
        );
        Ok(())
    }

    /// Whether both artifacts are present
    pub fn has_snapshot(&self) -> bool {
        self.exists(SCALER_ARTIFACT) && self.exists(MODEL_ARTIFACT)
    }

    /// Rebuild a snapshot from disk
    pub fn load_snapshot(&self) -> Result<ModelSnapshot, StorageError> {
        if !self.has_snapshot() {
            return Err(StorageError::NotFound(self.dir.clone()));
        }

        let scaler: Artifact<StandardScaler> = self.load(SCALER_ARTIFACT)?;
        let model: Artifact<IsolationForest> = self.load(MODEL_ARTIFACT)?;

        scaler.layout.validate()?;
        model.layout.validate()?;

        if scaler.snapshot_id != model.snapshot_id {
            return Err(StorageError::SnapshotMismatch {
                scaler: scaler.snapshot_id,
                model: model.snapshot_id,
            });
        }

        Ok(ModelSnapshot {
            id: model.snapshot_id,
            scaler: scaler.payload,
            model: model.payload,
            trained_at: model.trained_at,
            model_accuracy: model.model_accuracy,
        })
    }
}

fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %err, "failed to remove temporary artifact");
    }
}
