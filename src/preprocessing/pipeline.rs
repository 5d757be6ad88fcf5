//! # Preprocessing Pipeline
//!
//! Chains the conditioning stages in their fixed order:
//! load and bound size, flatten illumination, condition noise, pick a mode and
//! binarize, crop to the text region.

use image::GrayImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::cropping::crop_to_text;
use super::filtering::{condition_noise_with_sharpness, laplacian_variance};
use super::illumination::correct_illumination;
use super::mode::{classify_and_binarize_with_decision, DispersionThreshold, ModePolicy};
use super::scaling::{decode_grayscale, ImageScaler};
use super::types::PreprocessedImage;
use crate::ocr_errors::OcrError;
use crate::pipeline_config::PipelineConfig;

/// Stateless image conditioning pipeline.
///
/// A `Pipeline` holds only its configuration and mode policy, so one instance
/// can be shared by any number of worker threads. Clones share the policy.
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    policy: Arc<dyn ModePolicy>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    /// Pipeline using the dispersion threshold from `config`.
    pub fn new(config: PipelineConfig) -> Self {
        let policy = DispersionThreshold::new(config.binarization.dispersion_threshold);
        Self::with_policy(config, policy)
    }

    /// Pipeline with a custom mode policy.
    pub fn with_policy(config: PipelineConfig, policy: impl ModePolicy + 'static) -> Self {
        Self {
            config,
            policy: Arc::new(policy),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decodes `bytes` and runs every stage.
    ///
    /// Only decoding can fail; all later stages are total.
    pub fn process(&self, bytes: &[u8]) -> Result<PreprocessedImage, OcrError> {
        let gray = decode_grayscale(bytes, &self.config.scaling)?;
        Ok(self.process_image(&gray))
    }

    /// Runs every stage on an already decoded grayscale image.
    pub fn process_image(&self, gray: &GrayImage) -> PreprocessedImage {
        let start_time = Instant::now();
        let original_dimensions = gray.dimensions();

        let scaled = ImageScaler::new(self.config.scaling.max_side).scale(gray);
        let normalized_dimensions = scaled.dimensions();

        let corrected = correct_illumination(&scaled, &self.config.illumination);

        let sharpness = laplacian_variance(&corrected);
        let conditioned = condition_noise_with_sharpness(&corrected, sharpness, &self.config.noise);

        let (binary, decision) = classify_and_binarize_with_decision(
            &conditioned,
            &self.config.binarization,
            self.policy.as_ref(),
        );

        let image = crop_to_text(&binary, &self.config.crop);

        let elapsed = start_time.elapsed();
        metrics::histogram!("ocr_pipeline_duration_seconds").record(elapsed.as_secs_f64());
        metrics::counter!("ocr_mode_total", "mode" => decision.mode.as_str()).increment(1);

        debug!(
            target: "ocr_preprocessing",
            "Pipeline stages completed in {}ms: sharpness={:.2}, dispersion={:.2}",
            elapsed.as_millis(),
            sharpness,
            decision.statistic
        );

        info!(
            mode = %decision.mode,
            dispersion = decision.statistic,
            original_width = original_dimensions.0,
            original_height = original_dimensions.1,
            output_width = image.width(),
            output_height = image.height(),
            duration_ms = elapsed.as_millis() as u64,
            "Image preprocessing completed"
        );

        PreprocessedImage {
            image,
            mode: decision.mode,
            dispersion: decision.statistic,
            sharpness,
            original_dimensions,
            normalized_dimensions,
            processing_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
