//! # OCR Configuration Module
//!
//! This module defines the recognizer-facing configuration: the engine
//! settings supplied at startup ([`OcrConfig`]) and the per-image options
//! derived from the detected [`ProcessingMode`] ([`RecognizerConfig`]).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};
use crate::preprocessing::ProcessingMode;

// Constants for OCR configuration
pub const DEFAULT_LANGUAGES: &str = "eng";
pub const DEFAULT_TESSERACT_PATH: &str = "tesseract";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Page Segmentation Mode for Tesseract OCR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSegMode {
    /// Orientation and script detection (OSD) only
    OsdOnly = 0,
    /// Automatic page segmentation with OSD
    AutoOsd = 1,
    /// Automatic page segmentation, no OSD
    AutoNoOsd = 2,
    /// Fully automatic page segmentation
    #[default]
    Auto = 3,
    /// Assume a single column of text of variable sizes
    SingleColumn = 4,
    /// Assume a single uniform block of vertically aligned text
    SingleBlockVert = 5,
    /// Assume a single uniform block of text
    SingleBlock = 6,
    /// Treat the image as a single text line
    SingleLine = 7,
    /// Treat the image as a single word
    SingleWord = 8,
    /// Treat the image as a single word in a circle
    WordInCircle = 9,
    /// Treat the image as a single character
    SingleChar = 10,
    /// Find as much text as possible in no particular order
    SparseText = 11,
    /// Sparse text with OSD
    SparseTextOsd = 12,
    /// Treat the image as a single text line, bypassing hacks that are Tesseract-specific
    RawLine = 13,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::OsdOnly => "0",
            PageSegMode::AutoOsd => "1",
            PageSegMode::AutoNoOsd => "2",
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlockVert => "5",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::SingleWord => "8",
            PageSegMode::WordInCircle => "9",
            PageSegMode::SingleChar => "10",
            PageSegMode::SparseText => "11",
            PageSegMode::SparseTextOsd => "12",
            PageSegMode::RawLine => "13",
        }
    }
}

/// Tesseract engine mode (`--oem`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngineMode {
    /// Legacy engine only
    Legacy = 0,
    /// Neural nets LSTM engine only
    #[default]
    Lstm = 1,
    /// Legacy + LSTM engines
    Combined = 2,
    /// Whatever the installed build defaults to
    Default = 3,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::Legacy => "0",
            EngineMode::Lstm => "1",
            EngineMode::Combined => "2",
            EngineMode::Default => "3",
        }
    }
}

/// Per-image recognizer options derived from the processing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Assumed text layout
    pub psm: PageSegMode,
    /// Engine selection
    pub oem: EngineMode,
    /// Whether the system and frequent-word dictionaries are loaded
    pub dictionary_enabled: bool,
    /// Whether runs of spaces between words are kept in the output
    pub preserve_interword_spaces: bool,
}

impl RecognizerConfig {
    /// Render the options as Tesseract command line arguments.
    pub fn tesseract_args(&self) -> Vec<String> {
        let mut args = vec![
            "--oem".to_string(),
            self.oem.as_str().to_string(),
            "--psm".to_string(),
            self.psm.as_str().to_string(),
        ];

        if !self.dictionary_enabled {
            args.extend([
                "-c".to_string(),
                "load_system_dawg=0".to_string(),
                "-c".to_string(),
                "load_freq_dawg=0".to_string(),
            ]);
        }

        if self.preserve_interword_spaces {
            args.extend(["-c".to_string(), "preserve_interword_spaces=1".to_string()]);
        }

        args
    }
}

/// Map a processing mode to the recognizer options used for it.
///
/// Handwriting rarely matches dictionary words, so dictionaries are switched
/// off and the page is read as a column of irregular lines. Printed text is
/// read as one uniform block with dictionaries left on.
pub fn configure_recognizer(mode: ProcessingMode) -> RecognizerConfig {
    match mode {
        ProcessingMode::Handwritten => RecognizerConfig {
            psm: PageSegMode::SingleColumn,
            oem: EngineMode::Lstm,
            dictionary_enabled: false,
            preserve_interword_spaces: true,
        },
        ProcessingMode::Printed => RecognizerConfig {
            psm: PageSegMode::SingleBlock,
            oem: EngineMode::Lstm,
            dictionary_enabled: true,
            preserve_interword_spaces: true,
        },
    }
}

/// Configuration structure for OCR processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Path or name of the Tesseract executable
    pub tesseract_path: String,
    /// OCR language codes (e.g., "eng", "eng+fra")
    pub languages: String,
    /// Timeout for a single recognition call in milliseconds
    pub timeout_ms: u64,
    /// Directory for scratch images handed to the engine (system temp dir if unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: DEFAULT_TESSERACT_PATH.to_string(),
            languages: DEFAULT_LANGUAGES.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_SECS * 1000,
            temp_dir: None,
        }
    }
}

impl OcrConfig {
    /// Recognition timeout as a `Duration`
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    /// Validate OCR configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.tesseract_path.trim().is_empty() {
            return Err(AppError::Config(
                "tesseract_path cannot be empty".to_string(),
            ));
        }

        if self.languages.trim().is_empty() {
            return Err(AppError::Config("languages cannot be empty".to_string()));
        }

        if self
            .languages
            .split('+')
            .any(|lang| lang.is_empty() || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        {
            return Err(AppError::Config(format!(
                "languages '{}' must be '+'-separated Tesseract language codes",
                self.languages
            )));
        }

        if self.timeout_ms == 0 {
            return Err(AppError::Config(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }

        if let Some(dir) = &self.temp_dir {
            if !dir.is_dir() {
                return Err(AppError::Config(format!(
                    "temp_dir '{}' is not a directory",
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}
