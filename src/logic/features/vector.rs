//! Feature Vector - one row of model input
//!
//! Rows are only produced by the extractor. Column order follows
//! `layout::FEATURE_LAYOUT`.

use ndarray::Array2;
use serde::Serialize;

use super::layout::{feature_index, FEATURE_COUNT, FEATURE_LAYOUT};

/// Feature matrix: one row per log record, `FEATURE_COUNT` columns
pub type FeatureMatrix = Array2<f64>;

/// Derived features for a single log record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub(crate) fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Get values as slice
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        feature_index(name).and_then(|i| self.get(i))
    }

    /// Named values, for debug logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::Value::Object(
            FEATURE_LAYOUT
                .iter()
                .zip(self.values.iter())
                .map(|(name, value)| (name.to_string(), serde_json::json!(value)))
                .collect(),
        )
    }
}

/// Stack rows into a matrix
pub fn to_matrix(rows: &[FeatureVector]) -> FeatureMatrix {
    Array2::from_shape_fn((rows.len(), FEATURE_COUNT), |(i, j)| rows[i].values[j])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_name() {
        let mut values = [0.0; FEATURE_COUNT];
        values[3] = 0.25;
        let vector = FeatureVector::from_values(values);

        assert_eq!(vector.get_by_name("response_time"), Some(0.25));
        assert_eq!(vector.get_by_name("nonexistent"), None);
        assert_eq!(vector.get(FEATURE_COUNT), None);
    }

    #[test]
    fn test_to_matrix_shape() {
        let rows = vec![FeatureVector::from_values([1.0; FEATURE_COUNT]); 3];
        let matrix = to_matrix(&rows);
        assert_eq!(matrix.dim(), (3, FEATURE_COUNT));

        let empty = to_matrix(&[]);
        assert_eq!(empty.dim(), (0, FEATURE_COUNT));
    }

    #[test]
    fn test_to_log_entry() {
        let vector = FeatureVector::from_values([2.0; FEATURE_COUNT]);
        let log = vector.to_log_entry();
        assert_eq!(log["hour"], 2.0);
        assert_eq!(log.as_object().unwrap().len(), FEATURE_COUNT);
    }
}
