//! # Image Loading and Scaling Module
//!
//! This module decodes uploaded bytes into a grayscale pixel grid and bounds
//! its longest side, so the cost of every later stage is bounded as well.
//! Shrinking uses area averaging; images are never enlarged.

use image::{GrayImage, Luma};
use tracing;

use crate::ocr_errors::OcrError;
use crate::pipeline_config::ScalingConfig;

/// Decodes raw image bytes and bounds the result to `config.max_side`.
///
/// # Arguments
///
/// * `bytes` - Encoded image (PNG, JPEG, BMP, TIFF, ...)
/// * `config` - Size limits for the encoded input and the decoded image
///
/// # Returns
///
/// Returns the normalized grayscale image, or `OcrError::InvalidImage` when
/// the bytes are empty, too large, undecodable, or decode to a zero-sized image.
///
/// # Examples
///
/// ```no_run
/// use img2text::pipeline_config::ScalingConfig;
/// use img2text::preprocessing::normalize;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("note.jpg")?;
/// let gray = normalize(&bytes, &ScalingConfig::default())?;
/// assert!(gray.width().max(gray.height()) <= 1100);
/// # Ok(())
/// # }
/// ```
pub fn normalize(bytes: &[u8], config: &ScalingConfig) -> Result<GrayImage, OcrError> {
    let gray = decode_grayscale(bytes, config)?;
    Ok(ImageScaler::new(config.max_side).scale(&gray))
}

/// Decodes raw bytes into an 8-bit grayscale image without resizing.
pub fn decode_grayscale(bytes: &[u8], config: &ScalingConfig) -> Result<GrayImage, OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::InvalidImage("image buffer is empty".to_string()));
    }

    if bytes.len() > config.max_input_bytes {
        return Err(OcrError::InvalidImage(format!(
            "image too large: {} bytes (maximum allowed: {} bytes)",
            bytes.len(),
            config.max_input_bytes
        )));
    }

    match image::guess_format(bytes) {
        Ok(format) => tracing::debug!(target: "ocr_preprocessing", "Detected input format {format:?}"),
        Err(_) => tracing::debug!(target: "ocr_preprocessing", "Could not guess input format from magic bytes"),
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| OcrError::InvalidImage(format!("image could not be decoded: {e}")))?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(OcrError::InvalidImage(format!(
            "decoded image is empty ({}x{})",
            decoded.width(),
            decoded.height()
        )));
    }

    Ok(decoded.to_luma8())
}

/// Bounds the longest side of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageScaler {
    max_side: u32,
}

impl ImageScaler {
    pub fn new(max_side: u32) -> Self {
        Self {
            max_side: max_side.max(1),
        }
    }

    pub fn max_side(&self) -> u32 {
        self.max_side
    }

    /// Target dimensions for an image of the given size.
    ///
    /// The longest side becomes exactly `max_side`; the other side is scaled by
    /// the same factor and rounded, never below one pixel.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let longest = width.max(height);
        if longest <= self.max_side {
            return (width, height);
        }

        let scale = |side: u32| -> u32 {
            if side == longest {
                self.max_side
            } else {
                ((side as f64 * self.max_side as f64 / longest as f64).round() as u32).max(1)
            }
        };

        (scale(width), scale(height))
    }

    /// Shrinks `image` so that its longest side fits, returning a copy when no
    /// shrinking is needed.
    pub fn scale(&self, image: &GrayImage) -> GrayImage {
        let start_time = std::time::Instant::now();
        let (width, height) = image.dimensions();
        let (new_width, new_height) = self.target_dimensions(width, height);

        if (new_width, new_height) == (width, height) {
            return image.clone();
        }

        let scaled = area_resize(image, new_width, new_height);

        tracing::debug!(
            target: "ocr_preprocessing",
            "Area downscale completed in {}ms: {}x{} -> {}x{}",
            start_time.elapsed().as_millis(),
            width,
            height,
            new_width,
            new_height
        );

        scaled
    }
}

/// Resamples by averaging every source pixel by its overlap with the target pixel.
fn area_resize(image: &GrayImage, new_width: u32, new_height: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    let horizontal = area_taps(width, new_width);
    let vertical = area_taps(height, new_height);
    let src = image.as_raw();
    let src_stride = width as usize;
    let tmp_stride = new_width as usize;

    // Horizontal pass into a float buffer of new_width x height
    let mut tmp = vec![0f32; tmp_stride * height as usize];
    for y in 0..height as usize {
        let row = &src[y * src_stride..(y + 1) * src_stride];
        for (x, taps) in horizontal.iter().enumerate() {
            tmp[y * tmp_stride + x] = taps
                .iter()
                .map(|&(sx, weight)| row[sx] as f32 * weight)
                .sum();
        }
    }

    GrayImage::from_fn(new_width, new_height, |x, y| {
        let value: f32 = vertical[y as usize]
            .iter()
            .map(|&(sy, weight)| tmp[sy * tmp_stride + x as usize] * weight)
            .sum();
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Source indices and normalized weights contributing to each destination index.
fn area_taps(src_len: u32, dst_len: u32) -> Vec<Vec<(usize, f32)>> {
    let scale = src_len as f64 / dst_len as f64;

    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = (start + scale).min(src_len as f64);
            let mut taps = Vec::with_capacity(scale.ceil() as usize + 1);
            let mut s = start.floor() as u32;
            while (s as f64) < end && s < src_len {
                let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                if overlap > 1e-9 {
                    taps.push((s as usize, (overlap / scale) as f32));
                }
                s += 1;
            }
            taps
        })
        .collect()
}
