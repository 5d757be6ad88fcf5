//! # OCR Processing Module
//!
//! This module turns conditioned binary images into text.
//!
//! ## Features
//!
//! - [`Recognizer`] abstraction over text recognition engines
//! - Tesseract backend driven as a subprocess with per-mode options
//! - Deadline enforcement for every recognition call
//! - End-to-end extraction: preprocessing, recognizer configuration, recognition
//!
//! ## Dependencies
//!
//! - `tokio`: Subprocess management, blocking-task offload and timeouts
//! - `tempfile`: Scratch PNG files removed on every exit path
//! - `image`: PNG encoding of the binary image
//! - `tracing` / `metrics`: Logging and counters

use image::{GrayImage, ImageFormat};
use serde::Serialize;
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{info, warn, Instrument};

use crate::errors::error_logging;
use crate::observability;
use crate::ocr_config::{configure_recognizer, OcrConfig, RecognizerConfig};
use crate::ocr_errors::OcrError;
use crate::preprocessing::{BinaryImage, Pipeline, PreprocessedImage, ProcessingMode};

/// A text recognition engine.
///
/// Implementations receive the final binary image (ink 0 on background 255)
/// and the options chosen for its processing mode.
pub trait Recognizer: Send + Sync {
    fn recognize(
        &self,
        image: GrayImage,
        config: &RecognizerConfig,
    ) -> impl Future<Output = Result<String, OcrError>> + Send;
}

/// Tesseract engine invoked as an external process.
///
/// Each call writes the image to a scoped temporary PNG, runs
/// `tesseract <image> stdout -l <languages> <options>` and returns the cleaned
/// standard output. The child process is killed if the call is abandoned.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    config: OcrConfig,
}

impl TesseractRecognizer {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Builds the engine invocation for one image.
    pub fn build_command(
        &self,
        image_path: &Path,
        recognizer_config: &RecognizerConfig,
    ) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.config.tesseract_path);
        command
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.languages)
            .args(recognizer_config.tesseract_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl Recognizer for TesseractRecognizer {
    async fn recognize(&self, image: GrayImage, config: &RecognizerConfig) -> Result<String, OcrError> {
        let temp_dir = self.config.temp_dir.clone();
        let scratch = tokio::task::spawn_blocking(move || write_temp_png(&image, temp_dir.as_deref()))
            .await
            .map_err(|e| OcrError::RecognitionError(format!("image encoding task failed: {e}")))??;

        let output = self
            .build_command(scratch.path(), config)
            .output()
            .await
            .map_err(|e| {
                OcrError::RecognitionError(format!(
                    "failed to run '{}': {e}",
                    self.config.tesseract_path
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::RecognitionError(format!(
                "'{}' exited with {}: {}",
                self.config.tesseract_path,
                output.status,
                stderr.trim()
            )));
        }

        Ok(clean_text(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Encodes `image` as PNG into a new temporary file.
///
/// The file is deleted when the returned handle is dropped.
pub fn write_temp_png(image: &GrayImage, dir: Option<&Path>) -> Result<NamedTempFile, OcrError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("img2text-").suffix(".png");

    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| OcrError::RecognitionError(format!("failed to create temporary image: {e}")))?;

    {
        let mut writer = std::io::BufWriter::new(file.as_file_mut());
        image
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(|e| OcrError::RecognitionError(format!("failed to encode temporary image: {e}")))?;
        writer
            .flush()
            .map_err(|e| OcrError::RecognitionError(format!("failed to write temporary image: {e}")))?;
    }

    Ok(file)
}

/// Trims every line and drops blank ones.
pub fn clean_text(raw: &str) -> String {
    raw.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Runs `recognizer` with a deadline.
///
/// Exceeding `timeout` yields [`OcrError::RecognitionTimeout`]; the pending
/// recognition future is dropped, which kills any engine subprocess it owns.
pub async fn recognize_with_timeout<R: Recognizer>(
    recognizer: &R,
    image: GrayImage,
    config: &RecognizerConfig,
    timeout: Duration,
) -> Result<String, OcrError> {
    let start_time = Instant::now();
    let result = tokio::time::timeout(timeout, recognizer.recognize(image, config)).await;
    let elapsed_ms = start_time.elapsed().as_millis();

    match result {
        Ok(Ok(text)) => {
            info!(
                "OCR processing completed in {}ms, extracted {} characters",
                elapsed_ms,
                text.len()
            );
            observability::record_recognition_outcome("success");
            Ok(text)
        }
        Ok(Err(e)) => {
            warn!("OCR processing failed after {elapsed_ms}ms: {e}");
            observability::record_recognition_outcome(e.kind());
            Err(e)
        }
        Err(_) => {
            warn!(
                "OCR processing timed out after {}ms (limit: {}ms)",
                elapsed_ms,
                timeout.as_millis()
            );
            observability::record_recognition_outcome("timeout");
            Err(OcrError::RecognitionTimeout(format!(
                "recognition exceeded the {}ms limit",
                timeout.as_millis()
            )))
        }
    }
}

/// Result of a full extraction.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// Recognized text, one line per text line
    pub text: String,
    /// Mode selected for the image
    pub mode: ProcessingMode,
    /// Statistic behind the mode decision
    pub dispersion: f64,
    /// Laplacian variance of the illumination-corrected image
    pub sharpness: f64,
    /// Options the recognizer was run with
    pub recognizer: RecognizerConfig,
    pub original_dimensions: (u32, u32),
    pub normalized_dimensions: (u32, u32),
    pub output_dimensions: (u32, u32),
    pub preprocessing_ms: u64,
    pub recognition_ms: u64,
    /// Binary image handed to the recognizer
    #[serde(skip)]
    pub image: BinaryImage,
}

/// Runs the CPU-bound pipeline on the blocking thread pool.
async fn preprocess_off_runtime(
    pipeline: &Pipeline,
    bytes: &[u8],
) -> Result<PreprocessedImage, OcrError> {
    let pipeline = pipeline.clone();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || pipeline.process(&bytes))
        .await
        .map_err(|e| OcrError::RecognitionError(format!("preprocessing task failed: {e}")))?
}

/// Preprocesses `bytes`, configures the recognizer for the detected mode and
/// recognizes the text under the configured timeout.
///
/// # Examples
///
/// ```no_run
/// use img2text::ocr::{extract_text, TesseractRecognizer};
/// use img2text::ocr_config::OcrConfig;
/// use img2text::preprocessing::Pipeline;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("receipt.jpg")?;
/// let config = OcrConfig::default();
/// let recognizer = TesseractRecognizer::new(config.clone());
/// let extraction = extract_text(&Pipeline::default(), &recognizer, &bytes, &config).await?;
/// println!("{} ({})", extraction.text, extraction.mode);
/// # Ok(())
/// # }
/// ```
pub async fn extract_text<R: Recognizer>(
    pipeline: &Pipeline,
    recognizer: &R,
    bytes: &[u8],
    config: &OcrConfig,
) -> Result<Extraction, OcrError> {
    let span = observability::ocr_span("extract_text");
    let start_time = Instant::now();

    let result = async {
        let preprocessed = preprocess_off_runtime(pipeline, bytes).await?;
        let recognizer_config = configure_recognizer(preprocessed.mode);

        info!(
            mode = %preprocessed.mode,
            psm = recognizer_config.psm.as_str(),
            dictionary_enabled = recognizer_config.dictionary_enabled,
            "Starting text recognition"
        );

        let recognition_start = Instant::now();
        let text = recognize_with_timeout(
            recognizer,
            preprocessed.image.as_gray().clone(),
            &recognizer_config,
            config.timeout(),
        )
        .await?;

        Ok::<_, OcrError>(Extraction {
            text,
            mode: preprocessed.mode,
            dispersion: preprocessed.dispersion,
            sharpness: preprocessed.sharpness,
            recognizer: recognizer_config,
            original_dimensions: preprocessed.original_dimensions,
            normalized_dimensions: preprocessed.normalized_dimensions,
            output_dimensions: preprocessed.image.dimensions(),
            preprocessing_ms: preprocessed.processing_time_ms,
            recognition_ms: u64::try_from(recognition_start.elapsed().as_millis()).unwrap_or(u64::MAX),
            image: preprocessed.image,
        })
    }
    .instrument(span)
    .await;

    let elapsed = start_time.elapsed();
    observability::record_extraction_metrics(result.is_ok(), elapsed, bytes.len() as u64);

    if let Err(err) = &result {
        error_logging::log_ocr_error(err, "extract_text", Some(bytes.len() as u64), Some(elapsed));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_clean_text() {
        let raw = "  \n  First line  \n\n   \n\tSecond line\t\n\n";
        assert_eq!(clean_text(raw), "First line\nSecond line");
        assert_eq!(clean_text("   \n \n"), "");
    }

    #[test]
    fn test_build_command_arguments() {
        let config = OcrConfig {
            tesseract_path: "/opt/tesseract/bin/tesseract".to_string(),
            languages: "eng+fra".to_string(),
            ..Default::default()
        };
        let recognizer = TesseractRecognizer::new(config);
        let command = recognizer.build_command(
            Path::new("/tmp/page.png"),
            &configure_recognizer(ProcessingMode::Printed),
        );

        let std_command = command.as_std();
        assert_eq!(std_command.get_program(), "/opt/tesseract/bin/tesseract");
        let args: Vec<String> = std_command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "/tmp/page.png",
                "stdout",
                "-l",
                "eng+fra",
                "--oem",
                "1",
                "--psm",
                "6",
                "-c",
                "preserve_interword_spaces=1",
            ]
        );
    }

    #[test]
    fn test_write_temp_png_is_removed_on_drop() {
        let image = GrayImage::from_pixel(8, 4, Luma([255]));
        let dir = tempfile::tempdir().expect("temp dir should be created");

        let scratch = write_temp_png(&image, Some(dir.path())).expect("PNG should be written");
        let path = scratch.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));

        let decoded = image::open(&path).expect("scratch file should decode").to_luma8();
        assert_eq!(decoded, image);

        drop(scratch);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_engine_is_recognition_error() {
        let recognizer = TesseractRecognizer::new(OcrConfig {
            tesseract_path: "img2text-no-such-engine".to_string(),
            ..Default::default()
        });
        let result = recognizer
            .recognize(
                GrayImage::from_pixel(4, 4, Luma([255])),
                &configure_recognizer(ProcessingMode::Handwritten),
            )
            .await;
        assert!(matches!(result, Err(OcrError::RecognitionError(msg)) if msg.contains("img2text-no-such-engine")));
    }
}
