//! # Configuration Tests Module
//!
//! Tests for loading and validating the application configuration.

#[cfg(test)]
mod tests {
    use img2text::config::AppConfig;
    use img2text::errors::AppError;
    use img2text::observability_config::LogFormat;
    use img2text::ocr_errors::OcrError;
    use img2text::pipeline_config::IlluminationMethod;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    /// Test every supported variable is picked up
    #[test]
    fn test_full_environment() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let dir_path = dir.path().to_string_lossy().into_owned();

        let config = AppConfig::from_lookup(lookup(&[
            ("OCR_MAX_SIDE", "700"),
            ("OCR_MAX_INPUT_BYTES", "1048576"),
            ("OCR_BACKGROUND_KERNEL", "31"),
            ("OCR_ILLUMINATION_METHOD", "Divide"),
            ("OCR_SHARPNESS_THRESHOLD", "80.5"),
            ("OCR_DISPERSION_THRESHOLD", "48"),
            ("OCR_CROP_PADDING", "4"),
            ("OCR_BORDER", "6"),
            ("OCR_TIMEOUT_SECS", "20"),
            ("TESSERACT_PATH", "/usr/local/bin/tesseract"),
            ("OCR_LANGUAGES", "eng+deu"),
            ("OCR_TEMP_DIR", dir_path.as_str()),
            ("ENVIRONMENT", "production"),
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "pretty"),
        ]))
        .expect("configuration should load");

        assert_eq!(config.pipeline.scaling.max_side, 700);
        assert_eq!(config.pipeline.scaling.max_input_bytes, 1_048_576);
        assert_eq!(config.pipeline.illumination.background_kernel, 31);
        assert_eq!(config.pipeline.illumination.method, IlluminationMethod::Divide);
        assert_eq!(config.pipeline.noise.sharpness_threshold, 80.5);
        assert_eq!(config.pipeline.binarization.dispersion_threshold, 48.0);
        assert_eq!(config.pipeline.crop.padding, 4);
        assert_eq!(config.pipeline.crop.border, 6);
        assert_eq!(config.ocr.timeout_ms, 20_000);
        assert_eq!(config.ocr.tesseract_path, "/usr/local/bin/tesseract");
        assert_eq!(config.ocr.languages, "eng+deu");
        assert_eq!(config.ocr.temp_dir.as_deref(), Some(dir.path()));
        assert_eq!(config.observability.environment, "production");
        assert_eq!(config.observability.log_format, LogFormat::Pretty);

        assert!(config.validate().is_ok());
    }

    /// Test values that parse but are out of range fail validation
    #[test]
    fn test_out_of_range_values_fail_validation() {
        for (key, value) in [
            ("OCR_MAX_SIDE", "0"),
            ("OCR_BACKGROUND_KERNEL", "20"),
            ("OCR_TIMEOUT_SECS", "0"),
            ("OCR_LANGUAGES", "eng fra"),
            ("OCR_TEMP_DIR", "/definitely/not/a/directory"),
            ("OCR_BORDER", "4000000000"),
            ("OCR_CROP_PADDING", "5000"),
            ("LOG_LEVEL", "loud"),
        ] {
            let config = AppConfig::from_lookup(lookup(&[(key, value)]))
                .expect("configuration should load");
            assert!(
                matches!(config.validate(), Err(AppError::Config(_))),
                "{key}={value} should be rejected"
            );
        }
    }

    /// Test values that do not parse fail loading
    #[test]
    fn test_unparsable_values_fail_loading() {
        for (key, value) in [
            ("OCR_DISPERSION_THRESHOLD", "high"),
            ("OCR_ILLUMINATION_METHOD", "multiply"),
            ("LOG_FORMAT", "xml"),
            ("OCR_TIMEOUT_SECS", "-1"),
        ] {
            let result = AppConfig::from_lookup(lookup(&[(key, value)]));
            assert!(
                matches!(result, Err(AppError::Config(_))),
                "{key}={value} should not load"
            );
        }
    }

    /// Test configuration serializes and deserializes unchanged
    #[test]
    fn test_config_json_round_trip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).expect("config should serialize");
        let parsed: AppConfig = serde_json::from_str(&json).expect("config should deserialize");
        assert_eq!(parsed, config);
    }

    /// Test OCR errors convert into application errors and keep their tag
    #[test]
    fn test_ocr_error_conversion() {
        let app_error: AppError = OcrError::RecognitionTimeout("15000ms".to_string()).into();
        assert!(matches!(app_error, AppError::Ocr(_)));
        assert!(app_error.to_string().contains("OCR_TIMEOUT"));
    }
}
