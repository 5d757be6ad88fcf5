//! # Image Preprocessing Module
//!
//! This module conditions photographs and scans of text into clean binary
//! images for recognition.
//!
//! The module is organized into focused sub-modules:
//! - `scaling`: Decoding and longest-side bounding with area averaging
//! - `illumination`: Background flattening and CLAHE contrast enhancement
//! - `filtering`: Sharpness measurement, denoising and morphology
//! - `thresholding`: Otsu and Gaussian adaptive binarization
//! - `mode`: Handwritten/printed decision and mode-specific binarization
//! - `cropping`: Text region cropping and border padding
//! - `pipeline`: The stages chained in order
//! - `types`: Shared types

pub mod cropping;
pub mod filtering;
pub mod illumination;
pub mod mode;
pub mod pipeline;
pub mod scaling;
pub mod thresholding;
pub mod types;

// Re-export commonly used types and functions for convenience
pub use types::{BinaryImage, ModeDecision, MorphologicalOperation, PreprocessedImage, ProcessingMode};

// Re-export main functions from sub-modules
pub use cropping::{crop_to_text, foreground_bounds, BBox};
pub use filtering::{apply_morphological_operation, condition_noise, laplacian_variance, non_local_means};
pub use illumination::{apply_clahe, correct_illumination};
pub use mode::{classify_and_binarize, dispersion, DispersionThreshold, ModePolicy};
pub use pipeline::Pipeline;
pub use scaling::{normalize, ImageScaler};
pub use thresholding::{adaptive_gaussian_threshold, apply_otsu_threshold};
