//! # Image Thresholding Module
//!
//! This module turns conditioned grayscale images into ink-on-paper binary
//! images. Printed pages use Otsu's global threshold; handwriting under uneven
//! light uses a Gaussian-weighted local threshold.

use image::GrayImage;
use tracing;

use super::filtering::gaussian_blur_kernel;
use super::types::BinaryImage;

/// Applies Otsu's thresholding method to convert an image to binary.
///
/// Otsu's method automatically determines the optimal threshold value by
/// maximizing the between-class variance of the histogram. Pixels above the
/// threshold become background (255), the rest ink (0).
///
/// # Examples
///
/// ```
/// use image::{GrayImage, Luma};
/// use img2text::preprocessing::apply_otsu_threshold;
///
/// let gray = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 3 { 20 } else { 230 }]));
/// let (binary, threshold) = apply_otsu_threshold(&gray);
/// assert!(threshold >= 20 && threshold < 230);
/// assert_eq!(binary.foreground_count(), 30);
/// ```
pub fn apply_otsu_threshold(gray: &GrayImage) -> (BinaryImage, u8) {
    let start_time = std::time::Instant::now();

    // Calculate histogram
    let mut histogram = [0u32; 256];
    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total_pixels = (gray.width() as u64 * gray.height() as u64) as f64;
    let optimal_threshold = find_otsu_threshold(&histogram, total_pixels);

    let binary = BinaryImage::from_threshold(gray, optimal_threshold);

    tracing::debug!(
        target: "ocr_preprocessing",
        "Otsu thresholding completed in {}ms: threshold={}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        optimal_threshold,
        gray.width(),
        gray.height()
    );

    (binary, optimal_threshold)
}

/// Finds the optimal threshold using Otsu's method by maximizing between-class variance.
///
/// Candidate thresholds `t` split the histogram into `<= t` and `> t`. When
/// every candidate leaves one class empty (a single populated bin), the
/// threshold falls just below that bin so the uniform image maps to background
/// (an all-black image stays ink).
pub fn find_otsu_threshold(histogram: &[u32; 256], total_pixels: f64) -> u8 {
    if total_pixels <= 0.0 {
        return 0;
    }

    // Pre-calculate cumulative statistics
    let mut cumulative_sums = [0f64; 256];
    let mut cumulative_weighted_sums = [0f64; 256];
    let mut cumulative_sum = 0f64;
    let mut cumulative_weighted_sum = 0f64;

    for (i, &count) in histogram.iter().enumerate() {
        let pixel_count = count as f64;
        cumulative_sum += pixel_count;
        cumulative_weighted_sum += (i as f64) * pixel_count;

        cumulative_sums[i] = cumulative_sum;
        cumulative_weighted_sums[i] = cumulative_weighted_sum;
    }

    let total_weighted_sum = cumulative_weighted_sums[255];
    let mut max_variance = 0f64;
    let mut optimal_threshold: Option<u8> = None;

    for threshold in 0..255usize {
        // Weight of the dark class (pixels <= threshold)
        let w0 = cumulative_sums[threshold] / total_pixels;
        // Weight of the bright class (pixels > threshold)
        let w1 = 1.0 - w0;

        if cumulative_sums[threshold] == 0.0 || cumulative_sums[threshold] >= total_pixels {
            continue;
        }

        let mu0 = cumulative_weighted_sums[threshold] / cumulative_sums[threshold];
        let mu1 = (total_weighted_sum - cumulative_weighted_sums[threshold])
            / (total_pixels - cumulative_sums[threshold]);

        // Between-class variance
        let variance = w0 * w1 * (mu0 - mu1).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = Some(threshold as u8);
        }
    }

    optimal_threshold.unwrap_or_else(|| {
        // Single populated bin: every pixel is above the threshold
        let level = histogram.iter().position(|&c| c > 0).unwrap_or(0);
        level.saturating_sub(1) as u8
    })
}

/// Binarizes against a Gaussian-weighted local mean.
///
/// A pixel becomes background when `value > weighted_mean - offset`, where the
/// mean is taken over a `block_size` Gaussian window. Flat regions therefore
/// stay white and only pixels noticeably darker than their surroundings are
/// kept as ink, independently of the global lighting level.
pub fn adaptive_gaussian_threshold(gray: &GrayImage, block_size: u32, offset: i32) -> BinaryImage {
    let start_time = std::time::Instant::now();

    let local_mean = gaussian_blur_kernel(gray, block_size);
    let binary = BinaryImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y)[0] as i32;
        let mean = local_mean.get_pixel(x, y)[0] as i32;
        value > mean - offset
    });

    tracing::debug!(
        target: "ocr_preprocessing",
        "Adaptive thresholding completed in {}ms: block_size={}, offset={}, ink_pixels={}",
        start_time.elapsed().as_millis(),
        block_size,
        offset,
        binary.foreground_count()
    );

    binary
}
