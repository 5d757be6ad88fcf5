//! # Mode Classification Module
//!
//! Decides whether a page looks handwritten or printed and binarizes it with
//! the strategy suited to that mode. The decision is made by a [`ModePolicy`],
//! so callers can swap the heuristic without touching the binarizers.

use image::GrayImage;
use tracing;

use super::filtering::apply_morphological_operation;
use super::thresholding::{adaptive_gaussian_threshold, apply_otsu_threshold};
use super::types::{BinaryImage, ModeDecision, MorphologicalOperation, ProcessingMode};
use crate::pipeline_config::BinarizationConfig;

/// Population standard deviation of pixel intensities.
///
/// Returns 0.0 for an empty image.
pub fn dispersion(image: &GrayImage) -> f64 {
    let n = image.width() as u64 * image.height() as u64;
    if n == 0 {
        return 0.0;
    }

    let (sum, sum_sq) = image.pixels().fold((0u64, 0u64), |(s, sq), p| {
        let v = p[0] as u64;
        (s + v, sq + v * v)
    });

    let n = n as f64;
    let mean = sum as f64 / n;
    (sum_sq as f64 / n - mean * mean).max(0.0).sqrt()
}

/// Chooses the processing mode for a conditioned grayscale image.
///
/// Implementations must be pure: the same image always yields the same decision.
pub trait ModePolicy: Send + Sync {
    fn decide(&self, image: &GrayImage) -> ModeDecision;
}

/// Default policy: low intensity dispersion means handwriting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispersionThreshold {
    pub threshold: f64,
}

impl DispersionThreshold {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Mode for a given dispersion value: below the threshold is handwritten.
    pub fn mode_for(&self, dispersion: f64) -> ProcessingMode {
        if dispersion < self.threshold {
            ProcessingMode::Handwritten
        } else {
            ProcessingMode::Printed
        }
    }
}

impl Default for DispersionThreshold {
    fn default() -> Self {
        Self::new(crate::pipeline_config::DEFAULT_DISPERSION_THRESHOLD)
    }
}

impl ModePolicy for DispersionThreshold {
    fn decide(&self, image: &GrayImage) -> ModeDecision {
        let statistic = dispersion(image);
        ModeDecision {
            mode: self.mode_for(statistic),
            statistic,
        }
    }
}

/// Picks the mode with `policy` and binarizes accordingly.
///
/// * Handwritten: Gaussian adaptive threshold, then (if enabled) a closing on
///   the inverted image to bridge small gaps in pen strokes.
/// * Printed: Otsu global threshold followed by an opening.
///
/// Never fails for a non-empty image.
///
/// # Examples
///
/// ```
/// use image::{GrayImage, Luma};
/// use img2text::pipeline_config::BinarizationConfig;
/// use img2text::preprocessing::{classify_and_binarize, DispersionThreshold, ProcessingMode};
///
/// // Half black, half white: dispersion 127.5
/// let gray = GrayImage::from_fn(40, 40, |x, _| Luma([if x < 20 { 0 } else { 255 }]));
/// let (binary, mode) = classify_and_binarize(&gray, &BinarizationConfig::default(), &DispersionThreshold::default());
/// assert_eq!(mode, ProcessingMode::Printed);
/// assert_eq!(binary.dimensions(), (40, 40));
/// ```
pub fn classify_and_binarize(
    image: &GrayImage,
    config: &BinarizationConfig,
    policy: &dyn ModePolicy,
) -> (BinaryImage, ProcessingMode) {
    let (binary, decision) = classify_and_binarize_with_decision(image, config, policy);
    (binary, decision.mode)
}

/// Same as [`classify_and_binarize`], also returning the statistic behind the decision.
pub fn classify_and_binarize_with_decision(
    image: &GrayImage,
    config: &BinarizationConfig,
    policy: &dyn ModePolicy,
) -> (BinaryImage, ModeDecision) {
    let decision = policy.decide(image);
    let binary = binarize_for_mode(image, decision.mode, config);

    tracing::debug!(
        target: "ocr_preprocessing",
        "Mode decision: mode={}, statistic={:.2}, ink_pixels={}",
        decision.mode,
        decision.statistic,
        binary.foreground_count()
    );

    (binary, decision)
}

/// Binarizes with the strategy of a known mode.
pub fn binarize_for_mode(
    image: &GrayImage,
    mode: ProcessingMode,
    config: &BinarizationConfig,
) -> BinaryImage {
    match mode {
        ProcessingMode::Handwritten => {
            let binary =
                adaptive_gaussian_threshold(image, config.adaptive_block_size, config.adaptive_offset);
            if config.close_stroke_gaps {
                // Strokes are the bright class after inversion
                apply_morphological_operation(
                    &binary.inverted(),
                    MorphologicalOperation::Closing,
                    config.morph_kernel,
                )
                .inverted()
            } else {
                binary
            }
        }
        ProcessingMode::Printed => {
            let (binary, _threshold) = apply_otsu_threshold(image);
            apply_morphological_operation(&binary, MorphologicalOperation::Opening, config.morph_kernel)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    struct FixedMode(ProcessingMode);

    impl ModePolicy for FixedMode {
        fn decide(&self, _image: &GrayImage) -> ModeDecision {
            ModeDecision {
                mode: self.0,
                statistic: 0.0,
            }
        }
    }

    fn create_text_like_image() -> GrayImage {
        // Light paper with a few dark horizontal bars
        GrayImage::from_fn(80, 60, |x, y| {
            if (10..70).contains(&x) && y % 12 < 3 {
                Luma([40])
            } else {
                Luma([200])
            }
        })
    }

    #[test]
    fn test_dispersion_uniform_is_zero() {
        let image = GrayImage::from_pixel(10, 10, Luma([77]));
        assert_eq!(dispersion(&image), 0.0);
    }

    #[test]
    fn test_dispersion_two_levels() {
        let image = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 5 { 0 } else { 100 }]));
        assert!((dispersion(&image) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_dispersion_empty_image() {
        assert_eq!(dispersion(&GrayImage::new(0, 0)), 0.0);
    }

    #[test]
    fn test_mode_for_threshold_boundary() {
        let policy = DispersionThreshold::new(45.0);
        assert_eq!(policy.mode_for(44.999), ProcessingMode::Handwritten);
        assert_eq!(policy.mode_for(45.0), ProcessingMode::Printed);
        assert_eq!(policy.mode_for(0.0), ProcessingMode::Handwritten);
    }

    #[test]
    fn test_mode_sweep_single_crossing() {
        let policy = DispersionThreshold::default();
        let modes: Vec<ProcessingMode> = (0..=200).map(|d| policy.mode_for(d as f64 * 0.5)).collect();
        let crossings = modes.windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(crossings, 1);
        assert_eq!(modes[0], ProcessingMode::Handwritten);
        assert_eq!(modes[200], ProcessingMode::Printed);
    }

    #[test]
    fn test_policy_decision_is_deterministic() {
        let image = create_text_like_image();
        let policy = DispersionThreshold::default();
        assert_eq!(policy.decide(&image), policy.decide(&image));
    }

    #[test]
    fn test_forced_modes_produce_different_binarizations() {
        let image = GrayImage::from_fn(80, 60, |x, y| {
            // Text bars on a lighting ramp
            let base = 120 + x as i32;
            let ink = (10..70).contains(&x) && y % 12 < 3;
            Luma([if ink { base - 60 } else { base }.clamp(0, 255) as u8])
        });
        let config = BinarizationConfig::default();

        let (handwritten, mode_h) =
            classify_and_binarize(&image, &config, &FixedMode(ProcessingMode::Handwritten));
        let (printed, mode_p) =
            classify_and_binarize(&image, &config, &FixedMode(ProcessingMode::Printed));

        assert_eq!(mode_h, ProcessingMode::Handwritten);
        assert_eq!(mode_p, ProcessingMode::Printed);
        assert_ne!(handwritten, printed);
    }

    #[test]
    fn test_printed_path_keeps_bars() {
        let image = create_text_like_image();
        let binary = binarize_for_mode(&image, ProcessingMode::Printed, &BinarizationConfig::default());
        assert!(binary.is_foreground(40, 1));
        assert!(!binary.is_foreground(40, 6));
        assert!(!binary.is_foreground(2, 1));
    }

    #[test]
    fn test_handwritten_path_with_and_without_gap_closing() {
        let image = create_text_like_image();
        let mut config = BinarizationConfig::default();

        let closed = binarize_for_mode(&image, ProcessingMode::Handwritten, &config);
        config.close_stroke_gaps = false;
        let raw = binarize_for_mode(&image, ProcessingMode::Handwritten, &config);

        assert_eq!(closed.dimensions(), raw.dimensions());
        assert!(raw.is_foreground(40, 1));
        assert!(closed.is_foreground(40, 1));
    }

    #[test]
    fn test_classify_tiny_image() {
        let image = GrayImage::from_pixel(1, 1, Luma([10]));
        let (binary, mode) =
            classify_and_binarize(&image, &BinarizationConfig::default(), &DispersionThreshold::default());
        assert_eq!(binary.dimensions(), (1, 1));
        assert_eq!(mode, ProcessingMode::Handwritten);
    }
}
