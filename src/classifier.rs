//! # Letter Classifier Module
//!
//! A single-glyph recognizer based on a linear model over 28x28 pixel
//! features, as produced by a logistic regression trained on inverted
//! (white-on-black) letter images. It is an alternative to the Tesseract
//! engine for images holding exactly one character.
//!
//! The model is stored as JSON:
//!
//! ```json
//! { "labels": ["a", "b"], "weights": [[...784 values...], [...]], "bias": [0.1, -0.2] }
//! ```

use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::ocr::Recognizer;
use crate::ocr_config::RecognizerConfig;
use crate::ocr_errors::OcrError;

/// Side of the square glyph the model was trained on
pub const GLYPH_SIDE: u32 = 28;
/// Number of features per glyph
pub const FEATURE_LEN: usize = (GLYPH_SIDE * GLYPH_SIDE) as usize;

/// Serialized linear model: one weight row and bias per label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub labels: Vec<String>,
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

impl LinearModel {
    fn validate(&self) -> Result<(), OcrError> {
        if self.labels.is_empty() {
            return Err(OcrError::Initialization(
                "classifier model has no labels".to_string(),
            ));
        }
        if self.weights.len() != self.labels.len() || self.bias.len() != self.labels.len() {
            return Err(OcrError::Initialization(format!(
                "classifier model shape mismatch: {} labels, {} weight rows, {} biases",
                self.labels.len(),
                self.weights.len(),
                self.bias.len()
            )));
        }
        if let Some((i, row)) = self
            .weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != FEATURE_LEN)
        {
            return Err(OcrError::Initialization(format!(
                "weight row {} for label '{}' has {} values, expected {}",
                i,
                self.labels[i],
                row.len(),
                FEATURE_LEN
            )));
        }
        Ok(())
    }
}

/// Linear single-character classifier.
#[derive(Debug, Clone)]
pub struct LetterClassifier {
    model: LinearModel,
}

impl LetterClassifier {
    /// Wraps a model after checking its dimensions.
    pub fn new(model: LinearModel) -> Result<Self, OcrError> {
        model.validate()?;
        Ok(Self { model })
    }

    /// Loads a JSON model from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, OcrError> {
        let model: LinearModel = serde_json::from_reader(reader)
            .map_err(|e| OcrError::Initialization(format!("invalid classifier model: {e}")))?;
        Self::new(model)
    }

    /// Loads a JSON model from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, OcrError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            OcrError::Initialization(format!(
                "cannot open classifier model '{}': {e}",
                path.display()
            ))
        })?;
        let classifier = Self::from_reader(std::io::BufReader::new(file))?;

        info!(
            model_path = %path.display(),
            labels = classifier.model.labels.len(),
            "Letter classifier model loaded"
        );

        Ok(classifier)
    }

    pub fn labels(&self) -> &[String] {
        &self.model.labels
    }

    /// Converts a dark-on-light glyph image into model features.
    ///
    /// The image is inverted, resized to 28x28 with bilinear filtering,
    /// scaled to `[0, 1]` and flattened row by row.
    pub fn prepare_glyph(image: &GrayImage) -> Result<Vec<f32>, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::InvalidImage(format!(
                "glyph image is empty ({}x{})",
                image.width(),
                image.height()
            )));
        }

        let mut inverted = image.clone();
        imageops::invert(&mut inverted);
        let resized = imageops::resize(&inverted, GLYPH_SIDE, GLYPH_SIDE, FilterType::Triangle);

        Ok(resized.pixels().map(|p| p[0] as f32 / 255.0).collect())
    }

    /// Raw per-label scores `W x + b`.
    pub fn scores(&self, features: &[f32]) -> Result<Vec<f32>, OcrError> {
        if features.len() != FEATURE_LEN {
            return Err(OcrError::InvalidImage(format!(
                "expected {} features, got {}",
                FEATURE_LEN,
                features.len()
            )));
        }

        Ok(self
            .model
            .weights
            .iter()
            .zip(&self.model.bias)
            .map(|(row, bias)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f32>() + bias)
            .collect())
    }

    /// Label with the highest score; ties go to the earlier label.
    pub fn predict(&self, features: &[f32]) -> Result<&str, OcrError> {
        let scores = self.scores(features)?;

        let mut best = 0usize;
        for (i, score) in scores.iter().enumerate().skip(1) {
            if *score > scores[best] {
                best = i;
            }
        }

        debug!(label = %self.model.labels[best], score = scores[best], "Glyph classified");
        Ok(&self.model.labels[best])
    }

    /// Prepares `image` and predicts its label.
    pub fn classify(&self, image: &GrayImage) -> Result<&str, OcrError> {
        let features = Self::prepare_glyph(image)?;
        self.predict(&features)
    }
}

impl Recognizer for LetterClassifier {
    /// Page segmentation options do not apply to a single glyph and are ignored.
    async fn recognize(&self, image: GrayImage, _config: &RecognizerConfig) -> Result<String, OcrError> {
        self.classify(&image).map(str::to_string)
    }
}
