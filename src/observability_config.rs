//! # Observability Configuration
//!
//! Environment-specific configuration for logging output.

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line human readable output
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(AppError::Config(format!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            ))),
        }
    }
}

/// Observability configuration for different environments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level applied to this crate's targets
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl ObservabilityConfig {
    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Invalid log level '{}', expected one of {}",
                self.log_level,
                LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}
