//! Features Module - Feature Extraction Engine
//!
//! Turns batches of API log records into the numeric matrix consumed by
//! the scaler and the outlier model.

pub mod layout;
pub mod vector;
pub mod extractor;


// Re-export common types
pub use layout::{FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION, LayoutInfo};
pub use vector::{FeatureMatrix, FeatureVector};
pub use extractor::{extract_features, extract_matrix};
