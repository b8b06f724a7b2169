//! Configuration module

use std::env;

use crate::monitor::DEFAULT_WINDOW;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Path to the serialized model artifact
    pub model_path: String,

    /// Path to the append-only prediction log
    pub log_path: String,

    /// Rolling window size for monitoring stats
    pub monitoring_window: usize,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            model_path: env::var("MODEL_PATH")
                .unwrap_or_else(|_| "models/bod_predictor.json".to_string()),

            log_path: env::var("MONITORING_LOG")
                .unwrap_or_else(|_| "monitoring_logs.csv".to_string()),

            monitoring_window: env::var("MONITORING_WINDOW")
                .ok()
                .and_then(|w| w.parse().ok())
                .unwrap_or(DEFAULT_WINDOW),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
