//! Pipeline metrics, recorded through the `metrics` facade.
//!
//! Nothing is exported from here; the API server installs the Prometheus
//! recorder and these show up on its `/metrics` endpoint.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const ACQUISITION_ATTEMPTS_TOTAL: &str = "farm_acquisition_attempts_total";
    pub const INFERENCE_DURATION_SECONDS: &str = "farm_inference_duration_seconds";
    pub const INFERENCE_FAILURES_TOTAL: &str = "farm_inference_failures_total";
    pub const ANALYSIS_RUNS_TOTAL: &str = "farm_analysis_runs_total";
    pub const ANALYSIS_DURATION_SECONDS: &str = "farm_analysis_duration_seconds";
    pub const DETECTIONS_TOTAL: &str = "farm_detections_total";
}

/// Record one frame-grab attempt.
pub fn record_acquisition_attempt(source_id: &str) {
    counter!(names::ACQUISITION_ATTEMPTS_TOTAL, "source" => source_id.to_string()).increment(1);
}

/// Record one model invocation.
pub fn record_inference(model_id: &str, duration_secs: f64, success: bool) {
    histogram!(names::INFERENCE_DURATION_SECONDS, "model" => model_id.to_string())
        .record(duration_secs);
    if !success {
        counter!(names::INFERENCE_FAILURES_TOTAL, "model" => model_id.to_string()).increment(1);
    }
}

/// Record a finished analysis run. `outcome` is `"success"` or an error kind.
pub fn record_analysis(outcome: &str, duration_secs: f64, detections: u32) {
    counter!(names::ANALYSIS_RUNS_TOTAL, "outcome" => outcome.to_string()).increment(1);
    histogram!(names::ANALYSIS_DURATION_SECONDS).record(duration_secs);
    if detections > 0 {
        counter!(names::DETECTIONS_TOTAL).increment(detections as u64);
    }
}
