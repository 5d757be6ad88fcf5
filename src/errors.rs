//! # Application Error Types
//!
//! This module defines the application-level error type used for configuration,
//! file handling and the command line front end. Recognition failures keep their
//! own richer type in [`crate::ocr_errors`] and convert into [`AppError::Ocr`].

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// OCR processing errors
    Ocr(String),
    /// File system errors
    FileSystem(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Ocr(msg) => write!(f, "[OCR] {}", msg),
            AppError::FileSystem(msg) => write!(f, "[FILESYSTEM] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileSystem(err.to_string())
    }
}

impl From<crate::ocr_errors::OcrError> for AppError {
    fn from(err: crate::ocr_errors::OcrError) -> Self {
        AppError::Ocr(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Structured `error!` events for failures surfaced to the caller.
pub mod error_logging {
    use std::path::Path;
    use std::time::Duration;
    use tracing::error;

    use super::AppError;
    use crate::ocr_errors::OcrError;

    /// Extraction failure with the input size and time spent before failing
    pub fn log_ocr_error(
        error: &OcrError,
        operation: &str,
        input_bytes: Option<u64>,
        elapsed: Option<Duration>,
    ) {
        error!(
            error = %error,
            error_kind = error.kind(),
            operation = %operation,
            input_bytes = ?input_bytes,
            elapsed_ms = ?elapsed.map(|d| d.as_millis() as u64),
            "Text extraction failed"
        );
    }

    /// Image or model file that could not be read or written
    pub fn log_filesystem_error(error: &std::io::Error, operation: &str, path: &Path) {
        error!(
            error = %error,
            io_kind = ?error.kind(),
            operation = %operation,
            path = %path.display(),
            "File system operation failed"
        );
    }

    /// Rejected configuration at startup
    pub fn log_config_error(error: &AppError, source: &str) {
        error!(error = %error, source = %source, "Configuration rejected");
    }
}
