//! Batch Feature Extraction
//!
//! Turns a batch of log records into one feature row per record. Aggregate
//! columns describe the record's user, endpoint and time window within the
//! *same* batch, so the same record yields different rows in different
//! batches.
//!
//! The recency window counts every record `l` with
//! `r.timestamp - l.timestamp < 1h`. The difference is signed: all records
//! later than `r` fall inside the window no matter how far ahead they are.
//! Grouping and the sorted-timestamp index give the same values as the
//! direct per-record rescans in O(n log n).

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use super::layout::FEATURE_COUNT;
use super::vector::{to_matrix, FeatureMatrix, FeatureVector};
use crate::logic::record::LogRecord;

/// Width of the recency window in seconds
pub const RECENT_WINDOW_SECS: i64 = 3600;

/// Running totals for one user or endpoint
#[derive(Debug, Default, Clone, Copy)]
struct GroupStats {
    count: usize,
    response_time_sum: f64,
    errors: usize,
}

impl GroupStats {
    fn add(&mut self, log: &LogRecord) {
        self.count += 1;
        self.response_time_sum += log.response_time;
        if log.is_error() {
            self.errors += 1;
        }
    }

    fn mean_response_time(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.response_time_sum / self.count as f64
        }
    }

    fn error_rate(&self) -> f64 {
        ratio(self.errors, self.count)
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn group_by<'a, F>(logs: &'a [LogRecord], key: F) -> HashMap<&'a str, GroupStats>
where
    F: Fn(&'a LogRecord) -> &'a str,
{
    let mut groups: HashMap<&str, GroupStats> = HashMap::new();
    for log in logs {
        groups.entry(key(log)).or_default().add(log);
    }
    groups
}

/// Timestamps sorted by instant with prefix error counts
struct RecencyIndex {
    sorted: Vec<DateTime<Utc>>,
    /// `errors_before[k]` = errors among the first `k` sorted records
    errors_before: Vec<usize>,
}

impl RecencyIndex {
    fn build(logs: &[LogRecord]) -> Self {
        let mut entries: Vec<(DateTime<Utc>, bool)> = logs
            .iter()
            .map(|log| (log.timestamp.with_timezone(&Utc), log.is_error()))
            .collect();
        entries.sort_by_key(|(ts, _)| *ts);

        let mut errors_before = Vec::with_capacity(entries.len() + 1);
        errors_before.push(0);
        for (_, is_error) in &entries {
            let last = errors_before.last().copied().unwrap_or(0);
            errors_before.push(last + usize::from(*is_error));
        }

        Self {
            sorted: entries.into_iter().map(|(ts, _)| ts).collect(),
            errors_before,
        }
    }

    /// (count, errors) of records strictly later than `at - window`
    fn window(&self, at: DateTime<Utc>) -> (usize, usize) {
        let first = match at.checked_sub_signed(Duration::seconds(RECENT_WINDOW_SECS)) {
            Some(cutoff) => self.sorted.partition_point(|ts| *ts <= cutoff),
            None => 0,
        };
        let count = self.sorted.len() - first;
        let total_errors = self.errors_before[self.sorted.len()];
        (count, total_errors - self.errors_before[first])
    }
}

/// Extract one feature row per record, preserving input order
pub fn extract_features(logs: &[LogRecord]) -> Vec<FeatureVector> {
    if logs.is_empty() {
        return Vec::new();
    }

    let users = group_by(logs, |log| log.user_id.as_str());
    let endpoints = group_by(logs, |log| log.endpoint.as_str());
    let recency = RecencyIndex::build(logs);

    logs.iter()
        .map(|log| {
            let user = users.get(log.user_id.as_str()).copied().unwrap_or_default();
            let endpoint = endpoints.get(log.endpoint.as_str()).copied().unwrap_or_default();
            let (recent, recent_errors) = recency.window(log.timestamp.with_timezone(&Utc));

            let values: [f64; FEATURE_COUNT] = [
                log.timestamp.hour() as f64,
                log.timestamp.weekday().num_days_from_monday() as f64,
                log.status_code as f64,
                log.response_time,
                log.request_size.unwrap_or(0) as f64,
                log.response_size.unwrap_or(0) as f64,
                user.count as f64,
                user.mean_response_time(),
                user.error_rate(),
                endpoint.count as f64,
                endpoint.mean_response_time(),
                endpoint.error_rate(),
                recent as f64,
                ratio(recent_errors, recent),
            ];

            FeatureVector::from_values(values)
        })
        .collect()
}

/// Extract features straight into a matrix
pub fn extract_matrix(logs: &[LogRecord]) -> FeatureMatrix {
    let rows = extract_features(logs);
    tracing::trace!(rows = rows.len(), "extracted feature matrix");
    to_matrix(&rows)
}
