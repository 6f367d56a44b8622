//! Detection request

use serde::Deserialize;
use validator::Validate;

use crate::logic::{LogRecord, DEFAULT_THRESHOLD};

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

#[derive(Debug, Deserialize, Validate)]
pub struct DetectRequest {
    #[validate(nested)]
    pub logs: Vec<LogRecord>,

    /// Rows must score strictly below this to be reported
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}
