//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "farm_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "farm_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "farm_http_requests_in_flight";

    // Device metrics
    pub const ACTUATOR_REPORTS_TOTAL: &str = "farm_actuator_reports_total";
    pub const SENSOR_READINGS_TOTAL: &str = "farm_sensor_readings_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "farm_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an actuator report. `outcome` is `"accepted"` or `"rejected"`.
pub fn record_actuator_report(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::ACTUATOR_REPORTS_TOTAL, &labels).increment(1);
}

/// Record an ingested sensor reading.
pub fn record_sensor_reading(farm_id: &str) {
    let labels = [("farm", farm_id.to_string())];
    counter!(names::SENSOR_READINGS_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
