//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::logic::model::ForestConfig;

/// Token used when `API_TOKEN` is not set
pub const DEFAULT_API_TOKEN: &str = "your-secret-token";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Bearer token required on protected routes
    pub api_token: String,

    /// Directory holding the persisted scaler and model
    pub model_dir: PathBuf,

    /// Load persisted artifacts at startup
    pub autoload_model: bool,

    /// Isolation forest parameters
    pub forest: ForestConfig,

    /// Request body limit in bytes
    pub max_body_bytes: usize,

    /// Environment (development, production)
    pub environment: String,

    /// Log output format (text, json)
    pub log_format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = ForestConfig::default();

        Self {
            port: parse_var("PORT").unwrap_or(8000),

            api_token: env::var("API_TOKEN")
                .unwrap_or_else(|_| DEFAULT_API_TOKEN.to_string()),

            model_dir: env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models")),

            autoload_model: env::var("AUTOLOAD_MODEL")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(true),

            forest: ForestConfig {
                n_estimators: parse_var("N_ESTIMATORS")
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.n_estimators),
                max_samples: parse_var("MAX_SAMPLES")
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.max_samples),
                contamination: parse_var("CONTAMINATION")
                    .filter(|c: &f64| *c > 0.0)
                    .map(|c: f64| c.min(0.5))
                    .unwrap_or(defaults.contamination),
                seed: parse_var("RANDOM_SEED").unwrap_or(defaults.seed),
            },

            max_body_bytes: parse_var("MAX_BODY_BYTES").unwrap_or(32 * 1024 * 1024),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "text".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Whether the built-in token is still in use
    pub fn uses_default_token(&self) -> bool {
        self.api_token == DEFAULT_API_TOKEN
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            api_token: DEFAULT_API_TOKEN.to_string(),
            model_dir: PathBuf::from("models"),
            autoload_model: true,
            forest: ForestConfig::default(),
            max_body_bytes: 32 * 1024 * 1024,
            environment: "development".to_string(),
            log_format: "text".to_string(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
