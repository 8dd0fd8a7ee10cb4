//! # Prometheus Metrics
//!
//! HTTP request counters and latency are recorded in middleware through
//! the `metrics` facade; saga outcomes are counted by the route layer.
//! The process-wide recorder is installed once and rendered at `/metrics`.

use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Install the global Prometheus recorder on first call.
///
/// Returns `None` when another recorder was installed first (e.g. by an
/// embedding process); metrics are then dropped silently.
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "prometheus recorder not installed");
                None
            }
        })
        .clone()
}

/// Count one saga invocation by operation and outcome status.
pub fn record_outcome(operation: &'static str, status: &'static str) {
    ::metrics::counter!("dtrust_saga_outcomes_total", "operation" => operation, "status" => status)
        .increment(1);
}

/// Middleware recording request count and latency per route template.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    ::metrics::counter!(
        "dtrust_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    ::metrics::histogram!(
        "dtrust_http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}
