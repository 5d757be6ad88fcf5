//! # Pipeline Configuration Module
//!
//! This module defines the tunable parameters of the image conditioning
//! pipeline. Deployments have historically disagreed on several of these
//! (dispersion cutoff 45 vs 48, longest side 700 vs 1200), so all of them are
//! plain configuration with the defaults below.

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

pub const DEFAULT_MAX_SIDE: u32 = 1100;
pub const DEFAULT_MAX_INPUT_BYTES: usize = 5 * 1024 * 1024; // 5MB upload cap
pub const DEFAULT_BACKGROUND_KERNEL: u32 = 21;
pub const DEFAULT_DISPERSION_THRESHOLD: f64 = 45.0;
pub const DEFAULT_SHARPNESS_THRESHOLD: f64 = 100.0;
/// Largest accepted crop padding or border, in pixels
pub const MAX_CROP_MARGIN: u32 = 1024;

/// Loader and rescaling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Upper bound for the longest image side after normalization
    pub max_side: u32,
    /// Largest encoded input accepted by the loader
    pub max_input_bytes: usize,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            max_side: DEFAULT_MAX_SIDE,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl ScalingConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.max_side == 0 {
            return Err(AppError::Config(
                "max_side must be greater than 0".to_string(),
            ));
        }
        if self.max_input_bytes == 0 {
            return Err(AppError::Config(
                "max_input_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the estimated background is removed from the grayscale image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IlluminationMethod {
    /// `1.5 * gray - 0.5 * background`
    #[default]
    Subtract,
    /// `gray / background * 255`
    Divide,
}

impl std::str::FromStr for IlluminationMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subtract" => Ok(IlluminationMethod::Subtract),
            "divide" => Ok(IlluminationMethod::Divide),
            other => Err(AppError::Config(format!(
                "unknown illumination method '{}', expected 'subtract' or 'divide'",
                other
            ))),
        }
    }
}

/// Illumination correction and local contrast parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IlluminationConfig {
    /// Odd Gaussian kernel size used to estimate the background
    pub background_kernel: u32,
    /// Background removal strategy
    pub method: IlluminationMethod,
    /// CLAHE clip limit, relative to a uniform histogram
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid (columns, rows)
    pub clahe_grid: (u32, u32),
}

impl Default for IlluminationConfig {
    fn default() -> Self {
        Self {
            background_kernel: DEFAULT_BACKGROUND_KERNEL,
            method: IlluminationMethod::default(),
            clahe_clip_limit: 2.0,
            clahe_grid: (8, 8),
        }
    }
}

impl IlluminationConfig {
    pub fn validate(&self) -> AppResult<()> {
        validate_odd_kernel("background_kernel", self.background_kernel)?;
        if self.clahe_clip_limit <= 0.0 {
            return Err(AppError::Config(format!(
                "clahe_clip_limit must be > 0.0, got {}",
                self.clahe_clip_limit
            )));
        }
        if self.clahe_grid.0 == 0 || self.clahe_grid.1 == 0 {
            return Err(AppError::Config(
                "clahe_grid dimensions must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Noise conditioning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Laplacian variance below which the image is denoised instead of smoothed
    pub sharpness_threshold: f64,
    /// Non-local means filter strength
    pub denoise_strength: f32,
    /// Odd patch size compared by the non-local means filter
    pub template_window: u32,
    /// Odd neighbourhood searched by the non-local means filter
    pub search_window: u32,
    /// Odd Gaussian kernel size for the light smoothing path
    pub smoothing_kernel: u32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            sharpness_threshold: DEFAULT_SHARPNESS_THRESHOLD,
            denoise_strength: 10.0,
            template_window: 7,
            search_window: 21,
            smoothing_kernel: 3,
        }
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> AppResult<()> {
        if !self.sharpness_threshold.is_finite() || self.sharpness_threshold < 0.0 {
            return Err(AppError::Config(format!(
                "sharpness_threshold must be a non-negative number, got {}",
                self.sharpness_threshold
            )));
        }
        if self.denoise_strength <= 0.0 {
            return Err(AppError::Config(format!(
                "denoise_strength must be > 0.0, got {}",
                self.denoise_strength
            )));
        }
        validate_odd_kernel("template_window", self.template_window)?;
        validate_odd_kernel("search_window", self.search_window)?;
        validate_odd_kernel("smoothing_kernel", self.smoothing_kernel)?;
        if self.template_window > self.search_window {
            return Err(AppError::Config(format!(
                "template_window ({}) cannot exceed search_window ({})",
                self.template_window, self.search_window
            )));
        }
        Ok(())
    }
}

/// Mode decision and binarization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarizationConfig {
    /// Intensity standard deviation separating handwritten from printed input
    pub dispersion_threshold: f64,
    /// Odd window of the Gaussian-weighted adaptive threshold
    pub adaptive_block_size: u32,
    /// Constant subtracted from the local weighted mean
    pub adaptive_offset: i32,
    /// Close small gaps in handwritten strokes before recognition
    pub close_stroke_gaps: bool,
    /// Square structuring element size for the morphological cleanup
    pub morph_kernel: u32,
}

impl Default for BinarizationConfig {
    fn default() -> Self {
        Self {
            dispersion_threshold: DEFAULT_DISPERSION_THRESHOLD,
            adaptive_block_size: 25,
            adaptive_offset: 8,
            close_stroke_gaps: true,
            morph_kernel: 2,
        }
    }
}

impl BinarizationConfig {
    pub fn validate(&self) -> AppResult<()> {
        if !self.dispersion_threshold.is_finite() || self.dispersion_threshold < 0.0 {
            return Err(AppError::Config(format!(
                "dispersion_threshold must be a non-negative number, got {}",
                self.dispersion_threshold
            )));
        }
        validate_odd_kernel("adaptive_block_size", self.adaptive_block_size)?;
        if self.adaptive_block_size < 3 {
            return Err(AppError::Config(
                "adaptive_block_size must be at least 3".to_string(),
            ));
        }
        if self.morph_kernel == 0 {
            return Err(AppError::Config(
                "morph_kernel must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Text region cropping parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropConfig {
    /// Margin kept around the ink bounding box before cropping
    pub padding: u32,
    /// Background border added around the cropped region
    pub border: u32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            padding: 10,
            border: 10,
        }
    }
}

impl CropConfig {
    pub fn validate(&self) -> AppResult<()> {
        for (name, value) in [("padding", self.padding), ("border", self.border)] {
            if value > MAX_CROP_MARGIN {
                return Err(AppError::Config(format!(
                    "crop {} must be at most {}, got {}",
                    name, MAX_CROP_MARGIN, value
                )));
            }
        }
        Ok(())
    }
}

/// Full parameter set of the conditioning pipeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub scaling: ScalingConfig,
    pub illumination: IlluminationConfig,
    pub noise: NoiseConfig,
    pub binarization: BinarizationConfig,
    pub crop: CropConfig,
}

impl PipelineConfig {
    /// Validate all stage configurations
    pub fn validate(&self) -> AppResult<()> {
        self.scaling.validate()?;
        self.illumination.validate()?;
        self.noise.validate()?;
        self.binarization.validate()?;
        self.crop.validate()?;
        Ok(())
    }
}

fn validate_odd_kernel(name: &str, size: u32) -> AppResult<()> {
    if size == 0 || size % 2 == 0 {
        return Err(AppError::Config(format!(
            "{} must be a positive odd number, got {}",
            name, size
        )));
    }
    Ok(())
}
