//! # OCR Error Types Module
//!
//! This module defines the error types surfaced by image conditioning and text
//! recognition. Every preprocessing stage after decoding is total, so the only
//! failures are a bad input image, a recognizer that runs past its deadline,
//! and a recognizer that fails on its own terms.

/// Custom error types for OCR operations
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// Input bytes could not be decoded, or decoded to an empty image
    InvalidImage(String),
    /// Recognizer or classifier model could not be set up
    Initialization(String),
    /// Recognizer exceeded its configured time bound
    RecognitionTimeout(String),
    /// Recognizer failed with engine-provided detail
    RecognitionError(String),
}

impl OcrError {
    /// Message suitable for showing to the person who uploaded the image.
    pub fn user_message(&self) -> String {
        match self {
            OcrError::InvalidImage(_) => {
                "The image could not be read. Please upload a PNG, JPEG, BMP or TIFF file.".to_string()
            }
            OcrError::RecognitionTimeout(_) => {
                "Processing timeout. Try a smaller or clearer image.".to_string()
            }
            OcrError::Initialization(msg) | OcrError::RecognitionError(msg) => {
                format!("Error: {msg}")
            }
        }
    }

    /// Short stable label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OcrError::InvalidImage(_) => "invalid_image",
            OcrError::Initialization(_) => "initialization",
            OcrError::RecognitionTimeout(_) => "timeout",
            OcrError::RecognitionError(_) => "recognition_error",
        }
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::InvalidImage(msg) => write!(f, "[IMAGE_LOAD] Invalid image: {}", msg),
            OcrError::Initialization(msg) => write!(f, "[OCR_INIT] Recognizer initialization failed: {}", msg),
            OcrError::RecognitionTimeout(msg) => write!(f, "[OCR_TIMEOUT] Recognition timed out: {}", msg),
            OcrError::RecognitionError(msg) => write!(f, "[OCR_EXTRACT] Recognition failed: {}", msg),
        }
    }
}

impl std::error::Error for OcrError {}

impl From<anyhow::Error> for OcrError {
    fn from(err: anyhow::Error) -> Self {
        OcrError::RecognitionError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_tags() {
        let err = OcrError::InvalidImage("empty buffer".to_string());
        assert_eq!(err.to_string(), "[IMAGE_LOAD] Invalid image: empty buffer");

        let err = OcrError::RecognitionTimeout("after 15 seconds".to_string());
        assert!(err.to_string().starts_with("[OCR_TIMEOUT]"));
    }

    #[test]
    fn test_user_message_for_timeout() {
        let err = OcrError::RecognitionTimeout("after 1ms".to_string());
        assert_eq!(
            err.user_message(),
            "Processing timeout. Try a smaller or clearer image."
        );
    }

    #[test]
    fn test_user_message_keeps_engine_detail() {
        let err = OcrError::RecognitionError("tesseract exited with status 1".to_string());
        assert_eq!(err.user_message(), "Error: tesseract exited with status 1");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(OcrError::InvalidImage(String::new()).kind(), "invalid_image");
        assert_eq!(OcrError::Initialization(String::new()).kind(), "initialization");
        assert_eq!(OcrError::RecognitionTimeout(String::new()).kind(), "timeout");
        assert_eq!(OcrError::RecognitionError(String::new()).kind(), "recognition_error");
    }

    #[test]
    fn test_from_anyhow() {
        let err: OcrError = anyhow::anyhow!("engine crashed").into();
        assert_eq!(err, OcrError::RecognitionError("engine crashed".to_string()));
    }
}
