//! Detector
//!
//! Scores a batch against a trained snapshot and reports the rows the
//! model classifies as anomalous with a score under the caller's
//! threshold. The scaler is applied as fitted; it is never refit here.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::features::extract_features;
use crate::logic::features::vector::to_matrix;
use crate::logic::model::{FeatureScaler, ModelError, ModelSnapshot, OutlierModel};
use crate::logic::record::LogRecord;
use crate::metrics;

/// Threshold used when the caller gives none
pub const DEFAULT_THRESHOLD: f64 = -0.5;

/// Scores below this are high severity
pub const HIGH_SEVERITY_BELOW: f64 = -0.8;

/// Scores below this (and not high) are medium severity
pub const MEDIUM_SEVERITY_BELOW: f64 = -0.5;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Model not trained. Please train the model first.")]
    NotTrained,

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score < HIGH_SEVERITY_BELOW {
            Severity::High
        } else if score < MEDIUM_SEVERITY_BELOW {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// One flagged row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Position of the row in the submitted batch
    pub log_index: usize,
    pub timestamp: DateTime<FixedOffset>,
    pub user_id: String,
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    pub response_time: f64,
    pub anomaly_score: f64,
    pub severity: Severity,
}

impl AnomalyRecord {
    fn new(log_index: usize, log: &LogRecord, score: f64) -> Self {
        Self {
            log_index,
            timestamp: log.timestamp,
            user_id: log.user_id.clone(),
            endpoint: log.endpoint.clone(),
            method: log.method.clone(),
            status_code: log.status_code,
            response_time: log.response_time,
            anomaly_score: score,
            severity: Severity::from_score(score),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub anomalies: Vec<AnomalyRecord>,
    pub total_logs: usize,
    pub anomaly_count: usize,
    pub anomaly_rate: f64,
    /// Mean score over every row, 0 for an empty batch
    pub model_confidence: f64,
}

/// Score `logs` with the published snapshot
pub fn detect(
    snapshot: Option<&ModelSnapshot>,
    logs: &[LogRecord],
    threshold: f64,
) -> Result<AnomalyReport, DetectError> {
    let snapshot = snapshot.ok_or(DetectError::NotTrained)?;
    Ok(detect_with(&snapshot.scaler, &snapshot.model, logs, threshold)?)
}

/// Score `logs` with any scaler/model pair
pub fn detect_with(
    scaler: &dyn FeatureScaler,
    model: &dyn OutlierModel,
    logs: &[LogRecord],
    threshold: f64,
) -> Result<AnomalyReport, ModelError> {
    let total_logs = logs.len();
    if total_logs == 0 {
        return Ok(AnomalyReport {
            anomalies: Vec::new(),
            total_logs: 0,
            anomaly_count: 0,
            anomaly_rate: 0.0,
            model_confidence: 0.0,
        });
    }

    let rows = extract_features(logs);
    let scaled = scaler.transform(&to_matrix(&rows))?;
    let verdicts = model.predict(&scaled)?;
    let scores = model.decision_function(&scaled)?;

    for len in [verdicts.len(), scores.len()] {
        if len != total_logs {
            return Err(ModelError::LengthMismatch {
                expected: total_logs,
                actual: len,
            });
        }
    }

    let anomalies: Vec<AnomalyRecord> = logs
        .iter()
        .zip(verdicts.iter().zip(scores.iter()))
        .enumerate()
        .filter(|(_, (_, (verdict, score)))| verdict.is_anomalous() && **score < threshold)
        .map(|(i, (log, (_, score)))| {
            tracing::debug!(
                log_index = i,
                score = *score,
                features = %rows[i].to_log_entry(),
                "anomaly flagged"
            );
            AnomalyRecord::new(i, log, *score)
        })
        .collect();

    let anomaly_count = anomalies.len();
    let model_confidence = scores.iter().sum::<f64>() / total_logs as f64;

    metrics::record_anomalies(anomaly_count);
    tracing::info!(
        total_logs,
        anomaly_count,
        threshold,
        "detection complete"
    );

    Ok(AnomalyReport {
        anomalies,
        total_logs,
        anomaly_count,
        anomaly_rate: anomaly_count as f64 / total_logs as f64,
        model_confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::Verdict;
    use chrono::{Duration, TimeZone, Utc};
    use ndarray::Array2;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Passes features through unchanged and counts calls
    #[derive(Default)]
    struct IdentityScaler {
        calls: AtomicUsize,
    }

    impl FeatureScaler for IdentityScaler {
        fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(data.clone())
        }
    }

    /// Returns fixed verdicts and scores regardless of input
    struct FixedModel {
        verdicts: Vec<Verdict>,
        scores: Vec<f64>,
    }

    impl FixedModel {
        /// Anomalous iff the score is negative
        fn from_scores(scores: &[f64]) -> Self {
            Self {
                verdicts: scores.iter().map(|s| Verdict::from_decision(*s)).collect(),
                scores: scores.to_vec(),
            }
        }
    }

    impl OutlierModel for FixedModel {
        fn predict(&self, _data: &Array2<f64>) -> Result<Vec<Verdict>, ModelError> {
            Ok(self.verdicts.clone())
        }

        fn decision_function(&self, _data: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
            Ok(self.scores.clone())
        }
    }

    fn logs(n: usize) -> Vec<LogRecord> {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        (0..n)
            .map(|i| LogRecord {
                timestamp: (base + Duration::seconds(i as i64)).fixed_offset(),
                user_id: format!("user_{}", i),
                endpoint: "/api/v1/users".to_string(),
                method: "GET".to_string(),
                status_code: 200,
                response_time: 0.1,
                ip_address: "10.0.0.1".to_string(),
                user_agent: "test-agent".to_string(),
                request_size: None,
                response_size: None,
            })
            .collect()
    }

    #[test]
    fn test_severity_bands() {
        assert_eq!(Severity::from_score(-0.9), Severity::High);
        assert_eq!(Severity::from_score(-0.8), Severity::Medium);
        assert_eq!(Severity::from_score(-0.6), Severity::Medium);
        assert_eq!(Severity::from_score(-0.5), Severity::Low);
        assert_eq!(Severity::from_score(0.3), Severity::Low);
    }

    #[test]
    fn test_flags_anomalous_rows_below_threshold() {
        let scores = [-0.9, -0.6, -0.2, 0.1, -0.55];
        let model = FixedModel::from_scores(&scores);
        let batch = logs(5);

        let report = detect_with(&IdentityScaler::default(), &model, &batch, DEFAULT_THRESHOLD)
            .unwrap();

        assert_eq!(report.total_logs, 5);
        assert_eq!(report.anomaly_count, 3);
        assert_eq!(report.anomaly_rate, 0.6);
        let expected_mean = scores.iter().sum::<f64>() / 5.0;
        assert!((report.model_confidence - expected_mean).abs() < 1e-12);

        let indices: Vec<usize> = report.anomalies.iter().map(|a| a.log_index).collect();
        assert_eq!(indices, vec![0, 1, 4]);
        assert_eq!(report.anomalies[0].severity, Severity::High);
        assert_eq!(report.anomalies[1].severity, Severity::Medium);
        assert_eq!(report.anomalies[0].user_id, "user_0");
        assert_eq!(report.anomalies[2].anomaly_score, -0.55);
    }

    #[test]
    fn test_both_conditions_required() {
        // Low score but classified normal, and anomalous but above threshold
        let model = FixedModel {
            verdicts: vec![Verdict::Normal, Verdict::Anomalous],
            scores: vec![-0.95, -0.1],
        };
        let report = detect_with(&IdentityScaler::default(), &model, &logs(2), -0.5).unwrap();
        assert_eq!(report.anomaly_count, 0);
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn test_threshold_monotonicity() {
        let scores = [-0.95, -0.7, -0.45, -0.2, -0.05, 0.2];
        let model = FixedModel::from_scores(&scores);
        let batch = logs(scores.len());

        let mut previous = 0;
        for threshold in [-1.0, -0.8, -0.5, -0.3, 0.0, 0.5] {
            let report =
                detect_with(&IdentityScaler::default(), &model, &batch, threshold).unwrap();
            assert!(report.anomaly_count >= previous);
            assert!(report.anomalies.iter().all(|a| a.anomaly_score < threshold));
            previous = report.anomaly_count;
        }
        assert_eq!(previous, 5);
    }

    #[test]
    fn test_empty_batch() {
        let scaler = IdentityScaler::default();
        let model = FixedModel::from_scores(&[]);
        let report = detect_with(&scaler, &model, &[], DEFAULT_THRESHOLD).unwrap();

        assert_eq!(report.total_logs, 0);
        assert_eq!(report.anomaly_count, 0);
        assert_eq!(report.anomaly_rate, 0.0);
        assert_eq!(report.model_confidence, 0.0);
    }

    #[test]
    fn test_length_mismatch_aborts_batch() {
        let model = FixedModel::from_scores(&[-0.9]);
        let result = detect_with(&IdentityScaler::default(), &model, &logs(3), 0.0);
        assert!(matches!(
            result,
            Err(ModelError::LengthMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_untrained_does_no_work() {
        assert!(matches!(
            detect(None, &logs(3), DEFAULT_THRESHOLD),
            Err(DetectError::NotTrained)
        ));
    }

    #[test]
    fn test_scaler_applied_once_per_batch() {
        let scaler = IdentityScaler::default();
        let model = FixedModel::from_scores(&[0.1, 0.2]);
        detect_with(&scaler, &model, &logs(2), DEFAULT_THRESHOLD).unwrap();
        assert_eq!(scaler.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_report_serializes_lowercase_severity() {
        let model = FixedModel::from_scores(&[-0.9]);
        let report = detect_with(&IdentityScaler::default(), &model, &logs(1), 0.0).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["anomalies"][0]["severity"], "high");
        assert_eq!(json["anomalies"][0]["log_index"], 0);
    }
}
