//! Standard Scaler
//!
//! Per-column z-score normalization. Parameters are captured at fit time
//! from the training split and reused unchanged for every later transform.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{FeatureScaler, ModelError};

/// Columns with a standard deviation below this are left unscaled
const MIN_SCALE: f64 = 1e-12;

/// Fitted z-score parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
    n_samples_seen: usize,
}

impl StandardScaler {
    /// Fit on the rows of `data`
    pub fn fit(data: &Array2<f64>) -> Result<Self, ModelError> {
        if data.nrows() == 0 {
            return Err(ModelError::EmptyInput("scaler fit"));
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or(ModelError::EmptyInput("scaler fit"))?;
        // Population standard deviation; constant columns keep scale 1
        let scale = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < MIN_SCALE || !s.is_finite() { 1.0 } else { s });

        Ok(Self {
            mean,
            scale,
            n_samples_seen: data.nrows(),
        })
    }

    /// Fit, then transform the same rows
    pub fn fit_transform(data: &Array2<f64>) -> Result<(Self, Array2<f64>), ModelError> {
        let scaler = Self::fit(data)?;
        let scaled = scaler.transform(data)?;
        Ok((scaler, scaled))
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }
}

impl FeatureScaler for StandardScaler {
    fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        if data.ncols() != self.n_features() {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features(),
                actual: data.ncols(),
            });
        }

        Ok((data - &self.mean) / &self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_centers_columns() {
        let data = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let (scaler, scaled) = StandardScaler::fit_transform(&data).unwrap();

        assert_eq!(scaler.n_features(), 2);
        assert_eq!(scaler.n_samples_seen(), 3);

        let col0 = scaled.column(0);
        assert!((col0.sum()).abs() < 1e-12);
        // population std of [1, 3, 5] is sqrt(8/3)
        let expected = 2.0 / (8.0f64 / 3.0).sqrt();
        assert!((col0[2] - expected).abs() < 1e-12);

        // Constant column is centered but not divided by zero
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_transform_uses_fit_parameters() {
        let train = array![[0.0], [2.0]];
        let scaler = StandardScaler::fit(&train).unwrap();

        let scaled = scaler.transform(&array![[4.0]]).unwrap();
        assert_eq!(scaled[[0, 0]], 3.0);
    }

    #[test]
    fn test_rejects_empty_and_mismatched_input() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            StandardScaler::fit(&empty),
            Err(ModelError::EmptyInput(_))
        ));

        let scaler = StandardScaler::fit(&array![[1.0, 2.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0, 2.0, 3.0]]),
            Err(ModelError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }
}
