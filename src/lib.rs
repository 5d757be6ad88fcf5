//! # img2text
//!
//! Adaptive image conditioning and text recognition. Photographs and scans are
//! normalized, flattened, denoised, classified as handwritten or printed,
//! binarized and cropped before being handed to a recognition engine configured
//! for the detected mode.

pub mod classifier;
pub mod config;
pub mod errors;
pub mod observability;
pub mod observability_config;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod pipeline_config;
pub mod preprocessing;

// Re-export types for easier access
pub use classifier::LetterClassifier;
pub use ocr::{extract_text, recognize_with_timeout, Extraction, Recognizer, TesseractRecognizer};
pub use ocr_config::{configure_recognizer, OcrConfig, RecognizerConfig};
pub use ocr_errors::OcrError;
pub use preprocessing::{Pipeline, ProcessingMode};
