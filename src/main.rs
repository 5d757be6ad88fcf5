use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use img2text::config::AppConfig;
use img2text::errors::error_logging;
use img2text::observability;
use img2text::ocr::{extract_text, Extraction, Recognizer, TesseractRecognizer};
use img2text::ocr_config::OcrConfig;
use img2text::preprocessing::Pipeline;
use img2text::LetterClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// Tesseract subprocess
    Tesseract,
    /// Linear single-letter classifier (requires --model)
    Classifier,
}

/// Condition an image and extract its text
#[derive(Parser, Debug)]
#[command(name = "img2text")]
#[command(version, about, long_about = None)]
struct Args {
    /// Image to read (PNG, JPEG, BMP, TIFF, ...)
    image: PathBuf,

    /// Recognition engine
    #[arg(short, long, value_enum, default_value = "tesseract")]
    engine: Engine,

    /// Classifier model (JSON with labels, weights and bias)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Write the binary image handed to the recognizer to this path
    #[arg(long)]
    save_preprocessed: Option<PathBuf>,

    /// Print a JSON report instead of plain text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    config
        .observability
        .validate()
        .context("Invalid logging configuration")?;
    observability::init_tracing(&config.observability)?;

    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "environment");
        return Err(e.into());
    }
    info!("{}", config.summary());

    let bytes = match tokio::fs::read(&args.image).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error_logging::log_filesystem_error(&e, "read_image", &args.image);
            return Err(e).with_context(|| format!("Failed to read {}", args.image.display()));
        }
    };

    let pipeline = Pipeline::new(config.pipeline.clone());

    let extraction = match args.engine {
        Engine::Tesseract => {
            let recognizer = TesseractRecognizer::new(config.ocr.clone());
            run(&pipeline, &recognizer, &bytes, &config.ocr).await?
        }
        Engine::Classifier => {
            let model = args
                .model
                .as_ref()
                .context("--model is required with --engine classifier")?;
            let recognizer = LetterClassifier::from_json_file(model)?;
            run(&pipeline, &recognizer, &bytes, &config.ocr).await?
        }
    };

    if let Some(path) = &args.save_preprocessed {
        extraction
            .image
            .as_gray()
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Saved preprocessed image");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
    } else {
        println!("{}", extraction.text);
    }

    Ok(())
}

async fn run<R: Recognizer>(
    pipeline: &Pipeline,
    recognizer: &R,
    bytes: &[u8],
    config: &OcrConfig,
) -> Result<Extraction> {
    match extract_text(pipeline, recognizer, bytes, config).await {
        Ok(extraction) => Ok(extraction),
        Err(e) => {
            eprintln!("{}", e.user_message());
            Err(e.into())
        }
    }
}
