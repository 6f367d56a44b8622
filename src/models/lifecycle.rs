//! Model lifecycle responses

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadResponse {
    pub status: String,
    pub message: String,
}

impl LoadResponse {
    pub fn loaded() -> Self {
        Self {
            status: "success".to_string(),
            message: "Model loaded successfully".to_string(),
        }
    }
}
