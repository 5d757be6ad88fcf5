//! Tracing and logging setup module.
//!
//! This module provides:
//! - Structured logging configuration
//! - Tracing span creation utilities

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::observability_config::{LogFormat, ObservabilityConfig};

/// Builds the event filter: `RUST_LOG` directives plus this crate's level.
pub fn build_filter(config: &ObservabilityConfig) -> Result<tracing_subscriber::EnvFilter> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("img2text={}", config.log_level.to_ascii_lowercase()).parse()?);
    Ok(filter)
}

/// Initialize structured logging with tracing and configuration
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let filter = build_filter(config)?;

    // Pretty formatting when asked for, JSON otherwise
    match config.log_format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_thread_names(true)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        log_format = ?config.log_format,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Create a span for OCR operations
pub fn ocr_span(operation: &str) -> tracing::Span {
    tracing::info_span!("ocr_operation", operation = operation, component = "ocr")
}
