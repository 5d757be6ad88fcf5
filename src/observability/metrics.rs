//! Metrics recording helpers.
//!
//! Metrics go through the `metrics` facade. Nothing is exported unless the
//! host process installs a recorder.

use std::time::Duration;

/// Record the outcome of one recognition call (`success`, `timeout`, or an error kind)
pub fn record_recognition_outcome(outcome: &'static str) {
    ::metrics::counter!("ocr_recognition_total", "outcome" => outcome).increment(1);
}

/// Record end-to-end extraction metrics
pub fn record_extraction_metrics(success: bool, duration: Duration, image_size: u64) {
    ::metrics::counter!("ocr_operations_total", "result" => if success { "success" } else { "failure" }).increment(1);
    ::metrics::histogram!("ocr_duration_seconds").record(duration.as_secs_f64());
    ::metrics::histogram!("ocr_image_size_bytes").record(image_size as f64);
}
