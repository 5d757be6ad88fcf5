//! Observability module for centralized metrics and logging setup.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Span helpers for OCR operations
//! - Metric recording through the `metrics` facade

mod metrics;
mod tracing_mod;

pub use self::metrics::{record_extraction_metrics, record_recognition_outcome};
pub use self::tracing_mod::{build_filter, init_tracing_with_config, ocr_span};

use anyhow::Result;

use crate::observability_config::ObservabilityConfig;

/// Initialize logging from configuration.
///
/// The configuration is validated first. Fails if a global subscriber is
/// already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    config.validate()?;
    init_tracing_with_config(config)
}
