//! # Illumination and Contrast Module
//!
//! Photographs of paper rarely have even lighting. This module estimates the
//! background illumination with a wide Gaussian blur, removes it, and then
//! boosts local contrast with CLAHE so faint strokes survive binarization.

use image::{GrayImage, Luma};
use tracing;

use super::filtering::gaussian_blur_kernel;
use crate::pipeline_config::{IlluminationConfig, IlluminationMethod};

/// Flattens uneven lighting and enhances local contrast.
///
/// # Arguments
///
/// * `image` - Normalized grayscale image
/// * `config` - Background kernel, removal method and CLAHE parameters
///
/// # Returns
///
/// A new image with the same dimensions as the input.
///
/// # Examples
///
/// ```
/// use image::{GrayImage, Luma};
/// use img2text::pipeline_config::IlluminationConfig;
/// use img2text::preprocessing::correct_illumination;
///
/// let gray = GrayImage::from_fn(64, 48, |x, _| Luma([(x * 3) as u8]));
/// let corrected = correct_illumination(&gray, &IlluminationConfig::default());
/// assert_eq!(corrected.dimensions(), gray.dimensions());
/// ```
pub fn correct_illumination(image: &GrayImage, config: &IlluminationConfig) -> GrayImage {
    let start_time = std::time::Instant::now();

    let background = gaussian_blur_kernel(image, config.background_kernel);
    let flattened = remove_background(image, &background, config.method);
    let enhanced = apply_clahe(&flattened, config.clahe_clip_limit, config.clahe_grid);

    tracing::debug!(
        target: "ocr_preprocessing",
        "Illumination correction completed in {}ms: kernel={}, method={:?}, clip_limit={}, grid={:?}",
        start_time.elapsed().as_millis(),
        config.background_kernel,
        config.method,
        config.clahe_clip_limit,
        config.clahe_grid
    );

    enhanced
}

/// Combines an image with its estimated background.
pub fn remove_background(
    image: &GrayImage,
    background: &GrayImage,
    method: IlluminationMethod,
) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let gray = image.get_pixel(x, y)[0] as f32;
        let bg = background.get_pixel(x, y)[0] as f32;
        let value = match method {
            IlluminationMethod::Subtract => 1.5 * gray - 0.5 * bg,
            IlluminationMethod::Divide => gray / bg.max(1.0) * 255.0,
        };
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Applies Contrast Limited Adaptive Histogram Equalization (CLAHE).
///
/// The image is split into a `grid` of tiles. Each tile gets its own clipped
/// histogram equalization mapping, and every pixel is mapped by bilinear
/// interpolation between the four nearest tile mappings, which avoids visible
/// seams at tile borders.
///
/// # Arguments
///
/// * `image` - The input image to enhance
/// * `clip_limit` - Histogram clip limit relative to a uniform distribution (recommended: 2.0-4.0)
/// * `grid` - Number of tiles along (x, y) (recommended: (8, 8))
pub fn apply_clahe(image: &GrayImage, clip_limit: f32, grid: (u32, u32)) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    // Never more tiles than pixels along an axis
    let tiles_x = grid.0.clamp(1, width);
    let tiles_y = grid.1.clamp(1, height);

    let columns = tile_bounds(width, tiles_x);
    let rows = tile_bounds(height, tiles_y);

    let mut luts = Vec::with_capacity(columns.len() * rows.len());
    for &(y0, y1) in &rows {
        for &(x0, x1) in &columns {
            luts.push(tile_lut(image, x0, y0, x1, y1, clip_limit));
        }
    }

    let x_taps = interpolation_taps(width, &columns);
    let y_taps = interpolation_taps(height, &rows);
    let stride = columns.len();

    GrayImage::from_fn(width, height, |x, y| {
        let value = image.get_pixel(x, y)[0] as usize;
        let (tx1, tx2, xa) = x_taps[x as usize];
        let (ty1, ty2, ya) = y_taps[y as usize];

        let top = luts[ty1 * stride + tx1][value] * (1.0 - xa) + luts[ty1 * stride + tx2][value] * xa;
        let bottom =
            luts[ty2 * stride + tx1][value] * (1.0 - xa) + luts[ty2 * stride + tx2][value] * xa;
        let mapped = top * (1.0 - ya) + bottom * ya;

        Luma([mapped.round().clamp(0.0, 255.0) as u8])
    })
}

/// Splits `len` pixels into `tiles` contiguous, non-empty ranges.
fn tile_bounds(len: u32, tiles: u32) -> Vec<(u32, u32)> {
    (0..tiles as u64)
        .map(|i| {
            let start = (i * len as u64 / tiles as u64) as u32;
            let end = ((i + 1) * len as u64 / tiles as u64) as u32;
            (start, end)
        })
        .collect()
}

/// For each pixel position, the two neighbouring tiles and the weight of the second.
fn interpolation_taps(len: u32, bounds: &[(u32, u32)]) -> Vec<(usize, usize, f32)> {
    let centers: Vec<f32> = bounds
        .iter()
        .map(|&(start, end)| (start + end) as f32 / 2.0 - 0.5)
        .collect();
    let last = centers.len() - 1;

    (0..len)
        .map(|p| {
            let p = p as f32;
            if p <= centers[0] {
                (0, 0, 0.0)
            } else if p >= centers[last] {
                (last, last, 0.0)
            } else {
                let i = centers.partition_point(|&c| c <= p) - 1;
                let weight = (p - centers[i]) / (centers[i + 1] - centers[i]);
                (i, i + 1, weight)
            }
        })
        .collect()
}

/// Builds the clipped equalization mapping of one tile.
fn tile_lut(image: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [f32; 256] {
    let total_pixels = ((x1 - x0) * (y1 - y0)) as f32;

    // Calculate histogram
    let mut histogram = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            histogram[image.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    // Apply clip limit
    let clip_limit_pixels = ((clip_limit * total_pixels / 256.0) as u32).max(1);
    let mut excess_pixels = 0u32;

    for count in &mut histogram {
        if *count > clip_limit_pixels {
            excess_pixels += *count - clip_limit_pixels;
            *count = clip_limit_pixels;
        }
    }

    // Redistribute excess pixels uniformly
    let uniform_increment = excess_pixels / 256;
    let mut remainder = excess_pixels % 256;

    for count in &mut histogram {
        *count += uniform_increment;
        if remainder > 0 {
            *count += 1;
            remainder -= 1;
        }
    }

    // Cumulative distribution scaled to the output range
    let mut lut = [0.0f32; 256];
    let mut cumulative = 0u32;
    let scale = 255.0 / total_pixels;

    for (i, count) in histogram.iter().enumerate() {
        cumulative += count;
        lut[i] = (cumulative as f32 * scale).min(255.0);
    }

    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_uniform_image(width: u32, height: u32, intensity: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([intensity]))
    }

    #[test]
    fn test_remove_background_subtract() {
        let image = create_uniform_image(2, 2, 100);
        let background = create_uniform_image(2, 2, 40);
        let corrected = remove_background(&image, &background, IlluminationMethod::Subtract);
        // 1.5 * 100 - 0.5 * 40 = 130
        assert!(corrected.pixels().all(|p| p[0] == 130));
    }

    #[test]
    fn test_remove_background_subtract_saturates() {
        let image = create_uniform_image(2, 2, 250);
        let background = create_uniform_image(2, 2, 10);
        let corrected = remove_background(&image, &background, IlluminationMethod::Subtract);
        assert!(corrected.pixels().all(|p| p[0] == 255));

        let image = create_uniform_image(2, 2, 10);
        let background = create_uniform_image(2, 2, 250);
        let corrected = remove_background(&image, &background, IlluminationMethod::Subtract);
        assert!(corrected.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_remove_background_divide() {
        let image = create_uniform_image(2, 2, 100);
        let background = create_uniform_image(2, 2, 200);
        let corrected = remove_background(&image, &background, IlluminationMethod::Divide);
        // 100 / 200 * 255 = 127.5 -> 128
        assert!(corrected.pixels().all(|p| p[0] == 128));
    }

    #[test]
    fn test_remove_background_divide_by_black() {
        let image = create_uniform_image(2, 2, 0);
        let background = create_uniform_image(2, 2, 0);
        let corrected = remove_background(&image, &background, IlluminationMethod::Divide);
        assert!(corrected.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_divide_flattens_lighting_gradient() {
        // Paper lit from the left: background falls off, ink sits at half the local level
        let background = GrayImage::from_fn(64, 8, |x, _| Luma([(250 - x * 2) as u8]));
        let image = GrayImage::from_fn(64, 8, |x, y| {
            let bg = background.get_pixel(x, y)[0];
            Luma([if x % 16 == 8 { bg / 2 } else { bg }])
        });
        let corrected = remove_background(&image, &background, IlluminationMethod::Divide);
        assert_eq!(corrected.get_pixel(0, 0)[0], 255);
        assert_eq!(corrected.get_pixel(63, 0)[0], 255);
        assert!(corrected.get_pixel(8, 0)[0] < 130);
        assert!(corrected.get_pixel(56, 0)[0] < 130);
    }

    #[test]
    fn test_clahe_preserves_dimensions() {
        let image = GrayImage::from_fn(37, 23, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        let enhanced = apply_clahe(&image, 2.0, (8, 8));
        assert_eq!(enhanced.dimensions(), (37, 23));
    }

    #[test]
    fn test_clahe_uniform_image_stays_uniform() {
        let image = create_uniform_image(64, 64, 128);
        let enhanced = apply_clahe(&image, 2.0, (8, 8));
        let first = enhanced.get_pixel(0, 0)[0];
        assert!(enhanced.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn test_clahe_is_monotonic_within_tile_mapping() {
        // A horizontal ramp must not invert its ordering anywhere along a row
        let image = GrayImage::from_fn(128, 16, |x, _| Luma([(x * 2) as u8]));
        let enhanced = apply_clahe(&image, 2.0, (1, 1));
        for x in 1..128 {
            assert!(enhanced.get_pixel(x, 0)[0] >= enhanced.get_pixel(x - 1, 0)[0]);
        }
    }

    #[test]
    fn test_clahe_boosts_low_contrast() {
        // Values squeezed into 100..=115 spread over a wider range
        let image = GrayImage::from_fn(64, 64, |x, y| Luma([100 + ((x + y) % 16) as u8]));
        let enhanced = apply_clahe(&image, 4.0, (4, 4));

        let range = |img: &GrayImage| {
            let min = img.pixels().map(|p| p[0]).min().unwrap_or(0);
            let max = img.pixels().map(|p| p[0]).max().unwrap_or(0);
            max - min
        };
        assert!(range(&enhanced) > range(&image));
    }

    #[test]
    fn test_clahe_tiny_image() {
        let image = GrayImage::from_fn(3, 2, |x, _| Luma([x as u8 * 100]));
        let enhanced = apply_clahe(&image, 2.0, (8, 8));
        assert_eq!(enhanced.dimensions(), (3, 2));
    }

    #[test]
    fn test_tile_bounds_cover_range() {
        let bounds = tile_bounds(37, 8);
        assert_eq!(bounds.len(), 8);
        assert_eq!(bounds[0].0, 0);
        assert_eq!(bounds[7].1, 37);
        for pair in bounds.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
            assert!(pair[0].1 > pair[0].0);
        }
    }

    #[test]
    fn test_interpolation_taps_edges() {
        let bounds = tile_bounds(16, 2); // centers at 3.5 and 11.5
        let taps = interpolation_taps(16, &bounds);
        assert_eq!(taps[0], (0, 0, 0.0));
        assert_eq!(taps[15], (1, 1, 0.0));
        let (a, b, w) = taps[7];
        assert_eq!((a, b), (0, 1));
        assert!((w - 0.4375).abs() < 1e-6);
    }

    #[test]
    fn test_correct_illumination_dimensions() {
        let image = GrayImage::from_fn(50, 30, |x, y| Luma([((x * y) % 256) as u8]));
        let corrected = correct_illumination(&image, &IlluminationConfig::default());
        assert_eq!(corrected.dimensions(), (50, 30));
    }
}
