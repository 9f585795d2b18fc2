//! Prometheus Metrics Definitions
//!
//! Defines all Notebox metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use notebox_storage::KvClient;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<NoteboxMetrics>> = Lazy::new(NoteboxMetrics::new);

/// Container for all Notebox metrics.
#[derive(Clone)]
pub struct NoteboxMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Record cache lookups - labels: outcome (hit/miss/malformed/unavailable)
    pub cache_lookups_total: CounterVec,

    /// Rate limiter decisions - labels: decision (allowed/limited/bypassed)
    pub rate_limit_decisions_total: CounterVec,

    /// Key-value operations that failed and were degraded since startup
    pub kv_degraded_operations: Gauge,
}

impl NoteboxMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "notebox_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "notebox_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            cache_lookups_total: register_counter_vec!(
                "notebox_cache_lookups_total",
                "Record cache lookups by outcome",
                &["outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_lookups_total: {}", e)))?,

            rate_limit_decisions_total: register_counter_vec!(
                "notebox_rate_limit_decisions_total",
                "Rate limiter decisions by outcome",
                &["decision"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register rate_limit_decisions_total: {}", e)))?,

            kv_degraded_operations: register_gauge!(
                "notebox_kv_degraded_operations",
                "Key-value operations degraded since startup"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register kv_degraded_operations: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a cache lookup outcome.
    pub fn record_cache_lookup(&self, outcome: &str) {
        self.cache_lookups_total.with_label_values(&[outcome]).inc();
    }

    /// Record a rate limiter decision.
    pub fn record_rate_decision(&self, decision: &str) {
        self.rate_limit_decisions_total
            .with_label_values(&[decision])
            .inc();
    }

    pub fn set_kv_degraded_operations(&self, count: u64) {
        self.kv_degraded_operations.set(count as f64);
    }
}

/// Record a cache lookup if metrics are available.
pub fn record_cache_lookup(outcome: &str) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_cache_lookup(outcome);
    }
}

/// Record a rate limiter decision if metrics are available.
pub fn record_rate_decision(decision: &str) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_rate_decision(decision);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics. The degraded-operation gauge is
/// refreshed from the key-value client on every scrape.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler(State(kv): State<KvClient>) -> impl IntoResponse {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.set_kv_degraded_operations(kv.degraded_operations());
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        // Force initialization
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_http_request() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        metrics.record_http_request("GET", "/notes/{id}", 200, 0.015);
        Ok(())
    }

    #[test]
    fn test_cache_and_rate_counters() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        let before = metrics.cache_lookups_total.with_label_values(&["hit"]).get();
        record_cache_lookup("hit");
        let after = metrics.cache_lookups_total.with_label_values(&["hit"]).get();
        assert!(after >= before + 1.0);

        record_rate_decision("limited");
        assert!(
            metrics
                .rate_limit_decisions_total
                .with_label_values(&["limited"])
                .get()
                >= 1.0
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_metrics_handler_reports_degraded_gauge() -> Result<(), String> {
        let response = metrics_handler(State(KvClient::disabled()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        let text = String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())?;
        assert!(text.contains("notebox_kv_degraded_operations"));
        Ok(())
    }
}
