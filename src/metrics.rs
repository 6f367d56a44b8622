//! Prometheus metrics
//!
//! One private registry for the whole process, exposed on `/metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Service-wide collectors
pub struct ServiceMetrics {
    pub registry: Registry,
    /// HTTP requests by method and matched route
    pub requests_total: IntCounterVec,
    /// HTTP request latency by method and matched route
    pub request_duration: HistogramVec,
    /// Rows flagged by detection
    pub anomalies_detected: IntCounter,
    /// Training runs by result
    pub trainings_total: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("api_requests_total", "Total API requests"),
            &["method", "endpoint"],
        )
        .expect("valid api_requests_total definition");

        let request_duration = HistogramVec::new(
            HistogramOpts::new("api_request_duration_seconds", "API request duration in seconds")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["method", "endpoint"],
        )
        .expect("valid api_request_duration_seconds definition");

        let anomalies_detected = IntCounter::new(
            "anomalies_detected_total",
            "Total anomalies detected",
        )
        .expect("valid anomalies_detected_total definition");

        let trainings_total = IntCounterVec::new(
            Opts::new("model_trainings_total", "Model training runs"),
            &["result"],
        )
        .expect("valid model_trainings_total definition");

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(requests_total.clone()),
            Box::new(request_duration.clone()),
            Box::new(anomalies_detected.clone()),
            Box::new(trainings_total.clone()),
        ];
        for collector in collectors {
            if let Err(e) = registry.register(collector) {
                tracing::error!("Failed to register metric: {}", e);
            }
        }

        Self {
            registry,
            requests_total,
            request_duration,
            anomalies_detected,
            trainings_total,
        }
    }

    /// Prometheus text exposition of every collector
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub static METRICS: Lazy<ServiceMetrics> = Lazy::new(ServiceMetrics::new);

pub fn record_anomalies(count: usize) {
    METRICS.anomalies_detected.inc_by(count as u64);
}

pub fn record_training(success: bool) {
    let result = if success { "success" } else { "failure" };
    METRICS.trainings_total.with_label_values(&[result]).inc();
}
