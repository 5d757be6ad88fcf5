//! # Image Filtering Module
//!
//! This module provides the smoothing, denoising and morphological operations
//! used by the preprocessing pipeline. Noise conditioning picks between a
//! strong non-local means denoiser and a light Gaussian blur depending on how
//! much edge energy the image carries.

use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use tracing;

use super::types::{BinaryImage, MorphologicalOperation};
use crate::pipeline_config::NoiseConfig;

/// Gaussian sigma matching an odd kernel size.
///
/// Uses the usual derivation `0.3 * ((k - 1) / 2 - 1) + 0.8`, so a 3x3 kernel
/// maps to sigma 0.8 and a 21x21 kernel to 3.5.
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    let k = kernel_size.max(1) as f32;
    (0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8).max(0.1)
}

/// Gaussian blur parameterized by kernel size instead of sigma.
pub fn gaussian_blur_kernel(image: &GrayImage, kernel_size: u32) -> GrayImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    gaussian_blur_f32(image, sigma_for_kernel(kernel_size))
}

/// Variance of the 4-neighbour Laplacian response.
///
/// Higher values mean more edge energy. Crisp scans typically land in the
/// hundreds or thousands, blurry or heavily compressed photos well below 100.
/// Images smaller than 3x3 have no interior and report 0.0.
pub fn laplacian_variance(image: &GrayImage) -> f64 {
    let (width, height) = image.dimensions();

    if width < 3 || height < 3 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut pixel_count = 0u64;

    // Laplacian kernel: [[0, 1, 0], [1, -4, 1], [0, 1, 0]]
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = image.get_pixel(x, y)[0] as f64;
            let top = image.get_pixel(x, y - 1)[0] as f64;
            let bottom = image.get_pixel(x, y + 1)[0] as f64;
            let left = image.get_pixel(x - 1, y)[0] as f64;
            let right = image.get_pixel(x + 1, y)[0] as f64;

            let laplacian = top + bottom + left + right - 4.0 * center;
            sum += laplacian;
            sum_sq += laplacian * laplacian;
            pixel_count += 1;
        }
    }

    let n = pixel_count as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Reduces noise with a strategy chosen from the image's sharpness.
///
/// Blurry images (Laplacian variance below `config.sharpness_threshold`) get
/// non-local means denoising; sharp images only get a light Gaussian blur so
/// thin strokes are not washed out.
///
/// # Examples
///
/// ```
/// use image::{GrayImage, Luma};
/// use img2text::pipeline_config::NoiseConfig;
/// use img2text::preprocessing::condition_noise;
///
/// let gray = GrayImage::from_fn(24, 24, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]));
/// let conditioned = condition_noise(&gray, &NoiseConfig::default());
/// assert_eq!(conditioned.dimensions(), (24, 24));
/// ```
pub fn condition_noise(image: &GrayImage, config: &NoiseConfig) -> GrayImage {
    let sharpness = laplacian_variance(image);
    condition_noise_with_sharpness(image, sharpness, config)
}

/// Same as [`condition_noise`] with a precomputed Laplacian variance.
pub fn condition_noise_with_sharpness(
    image: &GrayImage,
    sharpness: f64,
    config: &NoiseConfig,
) -> GrayImage {
    let start_time = std::time::Instant::now();

    let (conditioned, strategy) = if sharpness < config.sharpness_threshold {
        (
            non_local_means(
                image,
                config.denoise_strength,
                config.template_window,
                config.search_window,
            ),
            "non_local_means",
        )
    } else {
        (
            gaussian_blur_kernel(image, config.smoothing_kernel),
            "gaussian",
        )
    };

    tracing::debug!(
        target: "ocr_preprocessing",
        "Noise conditioning completed in {}ms: sharpness={:.2}, threshold={:.2}, strategy={}",
        start_time.elapsed().as_millis(),
        sharpness,
        config.sharpness_threshold,
        strategy
    );

    conditioned
}

/// Non-local means denoising.
///
/// Every pixel becomes a weighted average of the pixels in its
/// `search_window` neighbourhood, weighted by how similar the
/// `template_window` patches around them are:
/// `w = exp(-(mean squared patch difference) / h^2)`.
///
/// Patch distances are computed per displacement with an integral image, so
/// the cost is `search_window^2` passes over the image regardless of the
/// template size. Borders are replicated.
pub fn non_local_means(
    image: &GrayImage,
    h: f32,
    template_window: u32,
    search_window: u32,
) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let width = width as usize;
    let height = height as usize;
    let template_radius = (template_window / 2) as usize;
    let search_radius = (search_window / 2) as i64;
    let template_size = 2 * template_radius + 1;
    let pad = template_radius + search_radius as usize;

    // Replicated-border copy large enough for every patch at every displacement
    let padded_width = width + 2 * pad;
    let padded_height = height + 2 * pad;
    let src = image.as_raw();
    let mut padded = vec![0f32; padded_width * padded_height];
    for py in 0..padded_height {
        let sy = py.saturating_sub(pad).min(height - 1);
        for px in 0..padded_width {
            let sx = px.saturating_sub(pad).min(width - 1);
            padded[py * padded_width + px] = src[sy * width + sx] as f32;
        }
    }

    // Region whose patches are compared: the image grown by the template radius
    let region_width = width + 2 * template_radius;
    let region_height = height + 2 * template_radius;
    let region_origin = pad - template_radius;
    let integral_stride = region_width + 1;
    let mut integral = vec![0f64; integral_stride * (region_height + 1)];

    let inv_h2 = 1.0 / (h * h).max(f32::EPSILON);
    let inv_area = 1.0 / (template_size * template_size) as f32;

    let mut weight_sum = vec![0f32; width * height];
    let mut value_sum = vec![0f32; width * height];

    for dy in -search_radius..=search_radius {
        for dx in -search_radius..=search_radius {
            // Integral image of squared differences for this displacement
            for ry in 0..region_height {
                let py = region_origin + ry;
                let qy = (py as i64 + dy) as usize;
                let mut row_sum = 0f64;
                for rx in 0..region_width {
                    let px = region_origin + rx;
                    let qx = (px as i64 + dx) as usize;
                    let diff = padded[py * padded_width + px] - padded[qy * padded_width + qx];
                    row_sum += (diff * diff) as f64;
                    integral[(ry + 1) * integral_stride + rx + 1] =
                        integral[ry * integral_stride + rx + 1] + row_sum;
                }
            }

            for y in 0..height {
                let top = y * integral_stride;
                let bottom = (y + template_size) * integral_stride;
                let qy = (y + pad) as i64 + dy;
                let row_base = qy as usize * padded_width;
                for x in 0..width {
                    let ssd = integral[bottom + x + template_size] - integral[top + x + template_size]
                        - integral[bottom + x]
                        + integral[top + x];
                    let distance = ssd as f32 * inv_area;
                    let weight = (-distance * inv_h2).exp();

                    let qx = ((x + pad) as i64 + dx) as usize;
                    weight_sum[y * width + x] += weight;
                    value_sum[y * width + x] += weight * padded[row_base + qx];
                }
            }
        }
    }

    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let i = y as usize * width + x as usize;
        // The zero displacement always contributes weight 1.0
        let value = value_sum[i] / weight_sum[i];
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Applies a morphological operation to a binary image.
///
/// The square structuring element has side `kernel_size` and is anchored at
/// its centre (`kernel_size / 2`). Dilation uses the reflected element so that
/// opening and closing do not shift the image for even kernel sizes. Pixels
/// outside the image never contribute.
///
/// Operations act on pixel values: erosion takes the neighbourhood minimum,
/// so ink (0) grows; dilation takes the maximum, so background (255) grows.
pub fn apply_morphological_operation(
    image: &BinaryImage,
    operation: MorphologicalOperation,
    kernel_size: u32,
) -> BinaryImage {
    let start_time = std::time::Instant::now();
    let kernel_size = kernel_size.max(1);

    let processed = match operation {
        MorphologicalOperation::Erosion => apply_erosion(image, kernel_size),
        MorphologicalOperation::Dilation => apply_dilation(image, kernel_size),
        MorphologicalOperation::Opening => {
            let eroded = apply_erosion(image, kernel_size);
            apply_dilation(&eroded, kernel_size)
        }
        MorphologicalOperation::Closing => {
            let dilated = apply_dilation(image, kernel_size);
            apply_erosion(&dilated, kernel_size)
        }
    };

    tracing::debug!(
        target: "ocr_preprocessing",
        "Morphological operation completed in {}ms: operation={:?}, kernel={}x{}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        operation,
        kernel_size,
        kernel_size,
        processed.width(),
        processed.height()
    );

    processed
}

/// Neighbourhood minimum: a pixel becomes ink if any pixel under the element is ink.
fn apply_erosion(image: &BinaryImage, kernel_size: u32) -> BinaryImage {
    let anchor = (kernel_size / 2) as i64;
    let (lo, hi) = (-anchor, kernel_size as i64 - 1 - anchor);
    BinaryImage::from_fn(image.width(), image.height(), |x, y| {
        !any_in_window(image, x, y, lo, hi, true)
    })
}

/// Neighbourhood maximum over the reflected element: a pixel becomes
/// background if any pixel under it is background.
fn apply_dilation(image: &BinaryImage, kernel_size: u32) -> BinaryImage {
    let anchor = (kernel_size / 2) as i64;
    let (lo, hi) = (-(kernel_size as i64 - 1 - anchor), anchor);
    BinaryImage::from_fn(image.width(), image.height(), |x, y| {
        any_in_window(image, x, y, lo, hi, false)
    })
}

fn any_in_window(image: &BinaryImage, x: u32, y: u32, lo: i64, hi: i64, foreground: bool) -> bool {
    let (width, height) = (image.width() as i64, image.height() as i64);
    for ky in lo..=hi {
        let ny = y as i64 + ky;
        if ny < 0 || ny >= height {
            continue;
        }
        for kx in lo..=hi {
            let nx = x as i64 + kx;
            if nx < 0 || nx >= width {
                continue;
            }
            if image.is_foreground(nx as u32, ny as u32) == foreground {
                return true;
            }
        }
    }
    false
}
