//! # Shared Types for Image Preprocessing
//!
//! This module contains the shared types used across the preprocessing
//! sub-modules: the processing mode, the binary image wrapper handed to
//! recognizers, and the result of a full pipeline run.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::ocr_errors::OcrError;

/// How the source image was judged to have been produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Low intensity dispersion: pen strokes on paper, uneven lighting
    Handwritten,
    /// High intensity dispersion: crisp printed glyphs
    Printed,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Handwritten => "handwritten",
            ProcessingMode::Printed => "printed",
        }
    }
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a mode policy: the label and the statistic it was based on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeDecision {
    pub mode: ProcessingMode,
    pub statistic: f64,
}

/// Types of morphological operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphologicalOperation {
    /// Erosion operation (shrinks bright regions)
    Erosion,
    /// Dilation operation (expands bright regions)
    Dilation,
    /// Opening operation (erosion followed by dilation - removes bright specks)
    Opening,
    /// Closing operation (dilation followed by erosion - fills dark gaps)
    Closing,
}

/// Single-channel image whose pixels are either ink (0) or background (255).
///
/// Ink is black on a white background. The wrapper is the only way preprocessing
/// hands pixels to a recognizer, so every consumer can rely on the two-level
/// invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryImage(GrayImage);

impl BinaryImage {
    /// Ink pixel value
    pub const FOREGROUND: u8 = 0;
    /// Paper pixel value
    pub const BACKGROUND: u8 = 255;

    /// Binarize with a global threshold: values above `threshold` become background.
    pub fn from_threshold(gray: &GrayImage, threshold: u8) -> Self {
        Self::from_fn(gray.width(), gray.height(), |x, y| {
            gray.get_pixel(x, y)[0] > threshold
        })
    }

    /// Build an image from a predicate telling whether a pixel is background.
    pub fn from_fn(width: u32, height: u32, mut is_background: impl FnMut(u32, u32) -> bool) -> Self {
        Self(GrayImage::from_fn(width, height, |x, y| {
            if is_background(x, y) {
                Luma([Self::BACKGROUND])
            } else {
                Luma([Self::FOREGROUND])
            }
        }))
    }

    /// An all-background image.
    pub fn blank(width: u32, height: u32) -> Self {
        Self(GrayImage::from_pixel(width, height, Luma([Self::BACKGROUND])))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] == Self::FOREGROUND
    }

    /// Number of ink pixels.
    pub fn foreground_count(&self) -> usize {
        self.0
            .pixels()
            .filter(|p| p[0] == Self::FOREGROUND)
            .count()
    }

    /// Swap ink and background.
    pub fn inverted(&self) -> Self {
        Self::from_fn(self.width(), self.height(), |x, y| self.is_foreground(x, y))
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    pub fn into_gray(self) -> GrayImage {
        self.0
    }
}

impl TryFrom<GrayImage> for BinaryImage {
    type Error = OcrError;

    fn try_from(gray: GrayImage) -> Result<Self, Self::Error> {
        if let Some(pixel) = gray
            .pixels()
            .find(|p| p[0] != Self::FOREGROUND && p[0] != Self::BACKGROUND)
        {
            return Err(OcrError::InvalidImage(format!(
                "binary image contains intermediate value {}",
                pixel[0]
            )));
        }
        Ok(Self(gray))
    }
}

/// Result of a full preprocessing run.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    /// Cropped, bordered binary image ready for recognition
    pub image: BinaryImage,
    /// Mode chosen by the policy
    pub mode: ProcessingMode,
    /// Statistic the mode decision was based on
    pub dispersion: f64,
    /// Laplacian variance that selected the denoising strategy
    pub sharpness: f64,
    /// Decoded dimensions (width, height)
    pub original_dimensions: (u32, u32),
    /// Dimensions after the longest-side bound was applied
    pub normalized_dimensions: (u32, u32),
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}
