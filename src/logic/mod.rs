//! Logic Module - Business Logic & Engines
//!
//! - `record` - API log record wire schema
//! - `features/` - Feature extraction (per-record, per-user, per-endpoint, recency)
//! - `model/` - Scaler, isolation forest and published snapshot
//! - `storage` - Artifact persistence
//! - `trainer` / `detector` - Train and detect pipelines
//! - `engine` - Service object tying the above together

pub mod record;
pub mod features;
pub mod model;
pub mod storage;
pub mod trainer;
pub mod detector;
pub mod engine;


pub use detector::{AnomalyRecord, AnomalyReport, DetectError, Severity, DEFAULT_THRESHOLD};
pub use engine::{AnomalyEngine, LoadError, ModelStatus};
pub use record::LogRecord;
pub use storage::{ArtifactStore, StorageError};
pub use trainer::{TrainError, TrainingSummary, DEFAULT_TEST_SIZE};
