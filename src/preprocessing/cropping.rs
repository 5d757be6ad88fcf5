//! # Image Cropping Module
//!
//! This module trims a binary page down to the region that actually contains
//! ink and surrounds it with a clean background border, so the recognizer
//! spends no effort on empty margins.

use std::time::Instant;
use tracing;

use super::types::BinaryImage;
use crate::pipeline_config::{CropConfig, MAX_CROP_MARGIN};

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Tight bounding box of all ink pixels, or `None` for a blank image.
pub fn foreground_bounds(image: &BinaryImage) -> Option<BBox> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (x, y, pixel) in image.as_gray().enumerate_pixels() {
        if pixel[0] != BinaryImage::BACKGROUND {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    found.then(|| BBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Region kept around `bbox`, padded and clamped to the image.
///
/// The far edges sit `extent + padding` past the padded origin. Away from the
/// image edges this keeps `padding` before the ink and none after it; where the
/// low-side padding is clamped at zero, the difference shows up on the high side.
pub fn calculate_crop_region(bbox: &BBox, padding: u32, width: u32, height: u32) -> BBox {
    let x0 = bbox.x.saturating_sub(padding);
    let y0 = bbox.y.saturating_sub(padding);
    let x1 = x0.saturating_add(bbox.width).saturating_add(padding).min(width);
    let y1 = y0.saturating_add(bbox.height).saturating_add(padding).min(height);
    BBox::new(x0, y0, x1 - x0, y1 - y0)
}

/// Crops a binary image to its ink and adds a background border.
///
/// A blank image is returned unchanged. Padding and border are capped at
/// [`MAX_CROP_MARGIN`]. When the ink sits at least `padding`
/// away from the low edges (or touches them), cropping the output again
/// returns the same image.
///
/// # Examples
///
/// ```
/// use img2text::pipeline_config::CropConfig;
/// use img2text::preprocessing::{crop_to_text, BinaryImage};
///
/// let page = BinaryImage::from_fn(200, 100, |x, y| !(x >= 50 && x < 60 && y >= 40 && y < 50));
/// let cropped = crop_to_text(&page, &CropConfig::default());
/// // 10 padding before the ink, 10 ink pixels, 10 border on each side
/// assert_eq!(cropped.dimensions(), (40, 40));
/// assert_eq!(cropped.foreground_count(), 100);
/// ```
pub fn crop_to_text(image: &BinaryImage, config: &CropConfig) -> BinaryImage {
    let start_time = Instant::now();

    let Some(bbox) = foreground_bounds(image) else {
        tracing::debug!(
            target: "ocr_preprocessing",
            "No ink found, skipping crop: dimensions={}x{}",
            image.width(),
            image.height()
        );
        return image.clone();
    };

    let padding = config.padding.min(MAX_CROP_MARGIN);
    let border = config.border.min(MAX_CROP_MARGIN);
    let region = calculate_crop_region(&bbox, padding, image.width(), image.height());
    let margin = border.saturating_mul(2);

    let cropped = BinaryImage::from_fn(
        region.width.saturating_add(margin),
        region.height.saturating_add(margin),
        |x, y| {
            if x < border
                || y < border
                || x - border >= region.width
                || y - border >= region.height
            {
                return true;
            }
            !image.is_foreground(region.x + x - border, region.y + y - border)
        },
    );

    tracing::debug!(
        target: "ocr_preprocessing",
        "Text crop completed in {}ms: ink={:?}, region={:?}, border={}, output={}x{}",
        start_time.elapsed().as_millis(),
        bbox,
        region,
        border,
        cropped.width(),
        cropped.height()
    );

    cropped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_block(width: u32, height: u32, block: BBox) -> BinaryImage {
        BinaryImage::from_fn(width, height, |x, y| {
            !(x >= block.x && x < block.x + block.width && y >= block.y && y < block.y + block.height)
        })
    }

    #[test]
    fn test_foreground_bounds() {
        let page = page_with_block(50, 40, BBox::new(5, 7, 10, 3));
        assert_eq!(foreground_bounds(&page), Some(BBox::new(5, 7, 10, 3)));
        assert_eq!(foreground_bounds(&BinaryImage::blank(5, 5)), None);
    }

    #[test]
    fn test_crop_region_clamped_at_origin() {
        // Ink at the top-left corner: left padding is clamped away
        let region = calculate_crop_region(&BBox::new(3, 0, 10, 10), 10, 100, 100);
        assert_eq!(region, BBox::new(0, 0, 20, 20));
    }

    #[test]
    fn test_crop_region_clamped_at_far_edge() {
        let region = calculate_crop_region(&BBox::new(90, 90, 10, 10), 10, 100, 100);
        assert_eq!(region, BBox::new(80, 80, 20, 20));
    }

    #[test]
    fn test_blank_image_unchanged() {
        let page = BinaryImage::blank(30, 20);
        assert_eq!(crop_to_text(&page, &CropConfig::default()), page);
    }

    #[test]
    fn test_crop_keeps_all_ink() {
        let page = page_with_block(300, 200, BBox::new(120, 60, 40, 15));
        let cropped = crop_to_text(&page, &CropConfig::default());
        assert_eq!(cropped.foreground_count(), page.foreground_count());
        // 10 padding before the ink, 10 border on every side
        assert_eq!(cropped.dimensions(), (40 + 10 + 20, 15 + 10 + 20));
        assert!(cropped.is_foreground(20, 20));
        assert!(!cropped.is_foreground(19, 20));
    }

    #[test]
    fn test_crop_is_idempotent() {
        let config = CropConfig::default();
        for block in [
            BBox::new(120, 60, 40, 15),
            BBox::new(0, 0, 10, 10),
            BBox::new(40, 50, 200, 100),
        ] {
            let page = page_with_block(300, 200, block);
            let once = crop_to_text(&page, &config);
            let twice = crop_to_text(&once, &config);
            assert_eq!(once, twice, "block {block:?}");
        }
    }

    #[test]
    fn test_recrop_after_clamped_padding_shifts_ink() {
        // Ink 3px from the left edge only gets 3px of padding on the first pass
        let config = CropConfig::default();
        let page = page_with_block(300, 200, BBox::new(3, 50, 100, 20));
        let once = crop_to_text(&page, &config);
        let twice = crop_to_text(&once, &config);
        assert_eq!(twice.foreground_count(), once.foreground_count());
        assert!(once.is_foreground(13, 20));
        assert!(twice.is_foreground(20, 20));
        assert!(!twice.is_foreground(13, 20));
    }

    #[test]
    fn test_oversized_border_is_capped() {
        let page = page_with_block(4, 4, BBox::new(1, 1, 2, 2));
        let config = CropConfig {
            padding: 10,
            border: 3_000_000_000,
        };

        let cropped = crop_to_text(&page, &config);

        // The 10px padding clamps to the 4x4 page; the border is capped
        let side = 4 + 2 * MAX_CROP_MARGIN;
        assert_eq!(cropped.dimensions(), (side, side));
        assert_eq!(cropped.foreground_count(), 4);
    }

    #[test]
    fn test_crop_single_pixel_page() {
        let page = BinaryImage::from_fn(1, 1, |_, _| false);
        let cropped = crop_to_text(&page, &CropConfig { padding: 10, border: 2 });
        assert_eq!(cropped.dimensions(), (5, 5));
        assert!(cropped.is_foreground(2, 2));
        assert_eq!(cropped.foreground_count(), 1);
    }
}
