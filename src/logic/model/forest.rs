//! Isolation Forest
//!
//! Anomalies are easier to isolate and thus have shorter path lengths in
//! randomly grown trees. Each tree is grown on a subsample drawn without
//! replacement; all randomness comes from one seeded `StdRng` so a fit is
//! reproducible for the same data and config.
//!
//! Scores follow the usual convention:
//! `s(x) = 2^(-E[h(x)] / c(psi))`, close to 1 for anomalies and around 0.5
//! or below for inliers. The offset is the `1 - contamination` quantile of
//! `s` over the training rows. The decision function maps `s` to
//! `(offset - s) / spread`, where `spread` is the mean distance of the
//! training rows above the offset. 0 is the boundary and a typical
//! contaminating training row lands at -1; rows more isolated than that
//! fall below -1.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{ModelError, OutlierModel, Verdict};

/// Euler–Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Forest hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees
    pub n_estimators: usize,
    /// Upper bound on rows drawn per tree
    pub max_samples: usize,
    /// Expected fraction of anomalous training rows
    pub contamination: f64,
    /// Seed for subsampling and split selection
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: 42,
        }
    }
}

/// Trained isolation forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    /// Rows drawn per tree
    sample_size: usize,
    n_features: usize,
    /// Raw-score boundary between normal and anomalous
    offset: f64,
    /// Mean raw score above the offset minus the offset
    spread: f64,
}

impl IsolationForest {
    /// Grow the forest on the rows of `data`
    pub fn fit(data: &Array2<f64>, config: &ForestConfig) -> Result<Self, ModelError> {
        let n_rows = data.nrows();
        if n_rows == 0 {
            return Err(ModelError::EmptyInput("forest fit"));
        }
        if config.n_estimators == 0 {
            return Err(ModelError::InvalidConfig("n_estimators must be positive".into()));
        }
        if !(config.contamination > 0.0 && config.contamination <= 0.5) {
            return Err(ModelError::InvalidConfig(format!(
                "contamination must be in (0, 0.5], got {}",
                config.contamination
            )));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let sample_size = config.max_samples.max(1).min(n_rows);
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;

        let trees = (0..config.n_estimators)
            .map(|_| {
                let rows = index::sample(&mut rng, n_rows, sample_size).into_vec();
                IsolationTree::build(data, &rows, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            n_features: data.ncols(),
            offset: 0.5,
            spread: 0.0,
        };

        let mut training_scores: Vec<f64> = data
            .rows()
            .into_iter()
            .map(|row| forest.raw_score(row))
            .collect();
        forest.offset = quantile(&mut training_scores, 1.0 - config.contamination);
        forest.spread = tail_spread(&training_scores, forest.offset);

        tracing::debug!(
            trees = forest.trees.len(),
            sample_size,
            offset = forest.offset,
            spread = forest.spread,
            "isolation forest fitted"
        );

        Ok(forest)
    }

    /// Calculate average path length of an unsuccessful BST search, c(n)
    fn average_path_length(n: usize) -> f64 {
        match n {
            0 | 1 => 0.0,
            2 => 1.0,
            _ => {
                let n = n as f64;
                2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
            }
        }
    }

    /// Raw anomaly score in (0, 1], higher is more anomalous
    fn raw_score(&self, row: ArrayView1<f64>) -> f64 {
        let norm = Self::average_path_length(self.sample_size);
        if self.trees.is_empty() || norm == 0.0 {
            return 0.5;
        }

        let total: f64 = self.trees.iter().map(|tree| tree.path_length(row)).sum();
        let avg_path = total / self.trees.len() as f64;

        2.0_f64.powf(-avg_path / norm)
    }

    fn decision(&self, raw: f64) -> f64 {
        if self.spread > f64::EPSILON {
            (self.offset - raw) / self.spread
        } else {
            self.offset - raw
        }
    }

    fn check_dims(&self, data: &Array2<f64>) -> Result<(), ModelError> {
        if data.ncols() != self.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features,
                actual: data.ncols(),
            });
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn spread(&self) -> f64 {
        self.spread
    }
}

impl OutlierModel for IsolationForest {
    fn decision_function(&self, data: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        self.check_dims(data)?;
        Ok(data
            .rows()
            .into_iter()
            .map(|row| self.decision(self.raw_score(row)))
            .collect())
    }

    fn predict(&self, data: &Array2<f64>) -> Result<Vec<Verdict>, ModelError> {
        Ok(self
            .decision_function(data)?
            .into_iter()
            .map(Verdict::from_decision)
            .collect())
    }
}

/// Linear-interpolated quantile, `q` in [0, 1]
fn quantile(values: &mut [f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.5;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
}

/// Mean excess over `offset` of the scores above it, 0 if none are
fn tail_spread(scores: &[f64], offset: f64) -> f64 {
    let tail: Vec<f64> = scores.iter().filter(|s| **s > offset).map(|s| s - offset).collect();
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}

/// A single isolation tree
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IsolationTree {
    root: IsolationNode,
}

/// Node in an isolation tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum IsolationNode {
    Internal {
        feature: usize,
        split: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationTree {
    fn build<R: Rng>(data: &Array2<f64>, rows: &[usize], max_depth: usize, rng: &mut R) -> Self {
        Self {
            root: Self::build_node(data, rows, 0, max_depth, rng),
        }
    }

    fn build_node<R: Rng>(
        data: &Array2<f64>,
        rows: &[usize],
        depth: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> IsolationNode {
        if depth >= max_depth || rows.len() <= 1 {
            return IsolationNode::Leaf { size: rows.len() };
        }

        // Only features that still vary within this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..data.ncols())
            .filter_map(|feature| {
                let (min, max) = rows.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &r| {
                    let v = data[[r, feature]];
                    (lo.min(v), hi.max(v))
                });
                (max > min).then_some((feature, min, max))
            })
            .collect();

        let Some(&(feature, min, max)) = candidates.choose(rng) else {
            return IsolationNode::Leaf { size: rows.len() };
        };

        let split = rng.gen_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&r| data[[r, feature]] < split);

        IsolationNode::Internal {
            feature,
            split,
            left: Box::new(Self::build_node(data, &left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(data, &right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;

        loop {
            match node {
                IsolationNode::Leaf { size } => {
                    return depth as f64 + IsolationForest::average_path_length(*size);
                }
                IsolationNode::Internal { feature, split, left, right } => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    node = if value < *split { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// 200 rows drawn uniformly from [40, 60) in every column
    fn inliers() -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(7);
        Array2::from_shape_fn((200, 4), |_| rng.gen_range(40.0..60.0))
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_estimators: 50,
            max_samples: 64,
            ..Default::default()
        }
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(IsolationForest::average_path_length(1), 0.0);
        assert_eq!(IsolationForest::average_path_length(2), 1.0);

        let c_10 = IsolationForest::average_path_length(10);
        let c_100 = IsolationForest::average_path_length(100);
        assert!(c_100 > c_10, "c(100)={} should be > c(10)={}", c_100, c_10);
    }

    #[test]
    fn test_fit_builds_requested_trees() {
        let forest = IsolationForest::fit(&inliers(), &small_config()).unwrap();
        assert_eq!(forest.n_estimators(), 50);
        assert_eq!(forest.n_features(), 4);
        assert!(forest.offset() > 0.0 && forest.offset() < 1.0);
    }

    #[test]
    fn test_outlier_scores_lower_than_inlier() {
        let forest = IsolationForest::fit(&inliers(), &small_config()).unwrap();

        let sample = ndarray::array![[50.0, 50.0, 50.0, 50.0], [500.0, 500.0, 500.0, 500.0]];
        let scores = forest.decision_function(&sample).unwrap();
        assert!(scores[1] < scores[0], "outlier {} vs inlier {}", scores[1], scores[0]);
        assert!(scores[1] < 0.0);

        let verdicts = forest.predict(&sample).unwrap();
        assert_eq!(verdicts[1], Verdict::Anomalous);
    }

    #[test]
    fn test_contamination_share_flagged_on_training_data() {
        let data = inliers();
        let forest = IsolationForest::fit(&data, &small_config()).unwrap();
        let flagged = forest
            .predict(&data)
            .unwrap()
            .into_iter()
            .filter(|v| *v == Verdict::Anomalous)
            .count();
        // Only rows strictly above the 90th percentile are flagged
        assert!(flagged > 0 && flagged <= 20, "flagged {}", flagged);
    }

    #[test]
    fn test_contaminating_rows_average_minus_one() {
        let data = inliers();
        let forest = IsolationForest::fit(&data, &small_config()).unwrap();
        assert!(forest.spread() > 0.0);

        let tail: Vec<f64> = forest
            .decision_function(&data)
            .unwrap()
            .into_iter()
            .filter(|d| *d < 0.0)
            .collect();
        assert!(!tail.is_empty());
        let mean = tail.iter().sum::<f64>() / tail.len() as f64;
        assert!((mean + 1.0).abs() < 1e-9, "tail mean {}", mean);
    }

    #[test]
    fn test_planted_cluster_scores_below_default_threshold() {
        // 90 tight rows plus 10 rows far away in every column
        let mut rng = StdRng::seed_from_u64(11);
        let data = Array2::from_shape_fn((100, 4), |(r, _)| {
            if r < 90 {
                rng.gen_range(0.0..1.0)
            } else {
                rng.gen_range(20.0..21.0)
            }
        });
        let forest = IsolationForest::fit(&data, &small_config()).unwrap();

        let fresh = ndarray::array![[20.5, 20.5, 20.5, 20.5], [0.5, 0.5, 0.5, 0.5]];
        let scores = forest.decision_function(&fresh).unwrap();
        assert!(scores[0] < -0.5, "planted row {}", scores[0]);
        assert!(scores[1] > scores[0]);
    }

    #[test]
    fn test_tail_spread() {
        assert!((tail_spread(&[0.4, 0.5, 0.6, 0.8], 0.5) - 0.2).abs() < 1e-12);
        assert_eq!(tail_spread(&[0.5, 0.5], 0.5), 0.0);
    }

    #[test]
    fn test_identical_rows_are_not_anomalous() {
        let data = Array2::<f64>::zeros((10, 3));
        let forest = IsolationForest::fit(&data, &ForestConfig::default()).unwrap();
        let scores = forest.decision_function(&data).unwrap();
        assert!(scores.iter().all(|s| *s == 0.0));
        assert!(forest.predict(&data).unwrap().iter().all(|v| *v == Verdict::Normal));
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let data = inliers();
        let a = IsolationForest::fit(&data, &small_config()).unwrap();
        let b = IsolationForest::fit(&data, &small_config()).unwrap();
        assert_eq!(a.decision_function(&data).unwrap(), b.decision_function(&data).unwrap());
    }

    #[test]
    fn test_rejects_bad_input() {
        let empty = Array2::<f64>::zeros((0, 4));
        assert!(matches!(
            IsolationForest::fit(&empty, &ForestConfig::default()),
            Err(ModelError::EmptyInput(_))
        ));

        let config = ForestConfig { contamination: 0.0, ..Default::default() };
        assert!(matches!(
            IsolationForest::fit(&inliers(), &config),
            Err(ModelError::InvalidConfig(_))
        ));

        let forest = IsolationForest::fit(&inliers(), &small_config()).unwrap();
        assert!(matches!(
            forest.decision_function(&Array2::zeros((1, 2))),
            Err(ModelError::DimensionMismatch { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_quantile_interpolates() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(&mut values, 0.0), 1.0);
        assert_eq!(quantile(&mut values, 1.0), 4.0);
        assert_eq!(quantile(&mut values, 0.5), 2.5);
    }
}
