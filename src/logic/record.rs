//! Log Record - one observed API call
//!
//! Wire schema for the records submitted to `/train` and `/detect`.
//! Deserialization rejects wrong types and missing fields; `validator`
//! checks the numeric ranges afterwards.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Status codes at or above this value count as errors
pub const ERROR_STATUS_MIN: u16 = 400;

/// API access log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LogRecord {
    /// Time of the request, keeps the offset it was submitted with
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<FixedOffset>,
    pub user_id: String,
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    /// Response time in seconds
    #[validate(range(min = 0.0))]
    pub response_time: f64,
    pub ip_address: String,
    pub user_agent: String,
    #[serde(default)]
    pub request_size: Option<u64>,
    #[serde(default)]
    pub response_size: Option<u64>,
}

impl LogRecord {
    /// Whether this call ended in a client or server error
    pub fn is_error(&self) -> bool {
        self.status_code >= ERROR_STATUS_MIN
    }
}

/// Accept RFC 3339 instants and naive ISO-8601 datetimes (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid ISO-8601 timestamp: {}", raw))
    })
}

/// Parse an ISO-8601 timestamp, with or without offset
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}
