//! # Unified Application Configuration
//!
//! This module provides a centralized configuration system that consolidates
//! all application settings into a single, structured configuration object.
//! It supports loading from environment variables, validation, and provides
//! a clean interface for accessing configuration throughout the application.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::ocr_config::OcrConfig;
use crate::pipeline_config::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Unified application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Image conditioning parameters
    pub pipeline: PipelineConfig,
    /// Recognition engine settings
    pub ocr: OcrConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; set but unparsable ones are errors.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut config = Self::default();

        // Load pipeline configuration
        if let Some(value) = parse_var(&lookup, "OCR_MAX_SIDE")? {
            config.pipeline.scaling.max_side = value;
        }
        if let Some(value) = parse_var(&lookup, "OCR_MAX_INPUT_BYTES")? {
            config.pipeline.scaling.max_input_bytes = value;
        }
        if let Some(value) = parse_var(&lookup, "OCR_BACKGROUND_KERNEL")? {
            config.pipeline.illumination.background_kernel = value;
        }
        if let Some(value) = lookup("OCR_ILLUMINATION_METHOD") {
            config.pipeline.illumination.method = value.parse()?;
        }
        if let Some(value) = parse_var(&lookup, "OCR_SHARPNESS_THRESHOLD")? {
            config.pipeline.noise.sharpness_threshold = value;
        }
        if let Some(value) = parse_var(&lookup, "OCR_DISPERSION_THRESHOLD")? {
            config.pipeline.binarization.dispersion_threshold = value;
        }
        if let Some(value) = parse_var(&lookup, "OCR_CROP_PADDING")? {
            config.pipeline.crop.padding = value;
        }
        if let Some(value) = parse_var(&lookup, "OCR_BORDER")? {
            config.pipeline.crop.border = value;
        }

        // Load OCR configuration
        if let Some(secs) = parse_var::<u64>(&lookup, "OCR_TIMEOUT_SECS")? {
            config.ocr.timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(path) = lookup("TESSERACT_PATH") {
            config.ocr.tesseract_path = path;
        }
        if let Some(languages) = lookup("OCR_LANGUAGES") {
            config.ocr.languages = languages;
        }
        if let Some(dir) = lookup("OCR_TEMP_DIR") {
            config.ocr.temp_dir = Some(PathBuf::from(dir));
        }

        // Load observability configuration
        if let Some(environment) = lookup("ENVIRONMENT") {
            config.observability.environment = environment;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.observability.log_level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.observability.log_format = format.parse()?;
        }

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.pipeline.validate()?;
        self.ocr.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: max_side={}, illumination={:?}, dispersion_threshold={}, sharpness_threshold={}, tesseract_path={}, ocr_languages={}, timeout_ms={}, log_level={}",
            self.pipeline.scaling.max_side,
            self.pipeline.illumination.method,
            self.pipeline.binarization.dispersion_threshold,
            self.pipeline.noise.sharpness_threshold,
            self.ocr.tesseract_path,
            self.ocr.languages,
            self.ocr.timeout_ms,
            self.observability.log_level
        )
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> AppResult<Option<T>> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{key} must be a valid number, got '{raw}'"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_config::IlluminationMethod;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_lookup_gives_defaults() {
        let config = AppConfig::from_lookup(|_| None).expect("defaults should load");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OCR_MAX_SIDE", "1200"),
            ("OCR_ILLUMINATION_METHOD", "divide"),
            ("OCR_DISPERSION_THRESHOLD", "48"),
            ("OCR_TIMEOUT_SECS", "30"),
            ("OCR_LANGUAGES", "eng+fra"),
            ("LOG_FORMAT", "pretty"),
        ]))
        .expect("overrides should load");

        assert_eq!(config.pipeline.scaling.max_side, 1200);
        assert_eq!(config.pipeline.illumination.method, IlluminationMethod::Divide);
        assert_eq!(config.pipeline.binarization.dispersion_threshold, 48.0);
        assert_eq!(config.ocr.timeout_ms, 30_000);
        assert_eq!(config.ocr.languages, "eng+fra");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparsable_number_is_config_error() {
        let result = AppConfig::from_lookup(lookup_from(&[("OCR_MAX_SIDE", "big")]));
        match result {
            Err(AppError::Config(msg)) => assert!(msg.contains("OCR_MAX_SIDE")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_summary_mentions_key_settings() {
        let summary = AppConfig::default().summary();
        assert!(summary.contains("max_side=1100"));
        assert!(summary.contains("tesseract_path=tesseract"));
    }
}
