#![deny(missing_docs)]

//! # dtrust-api: HTTP Surface for Developer Onboarding
//!
//! Exposes the onboarding saga over axum. Every handler runs exactly one
//! saga entry point on the blocking pool and maps its outcome to a status.
//!
//! ## API Surface
//!
//! | Prefix              | Module                     | Domain                  |
//! |---------------------|----------------------------|-------------------------|
//! | `/v1/developers/*`  | [`routes::developers`]     | Registration, codes, profiles |
//! | `/v1/payments/*`    | [`routes::payments`]       | Checkout and confirmation |
//! | `/v1/identifiers/*` | [`routes::identifiers`]    | Identifier queries      |
//! | `/v1/credentials/*` | [`routes::credentials`]    | Credential issuance and verification |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! Cors → TraceLayer → MetricsMiddleware → BodyLimit → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated with utoipa, served at `/openapi.json`.

pub mod bootstrap;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Request bodies above this size are rejected before deserialization.
const MAX_BODY_BYTES: usize = 256 * 1024;

/// Assemble the full application router with all routes and middleware.
///
/// Probes and `/metrics` sit outside the metrics middleware so scraping
/// does not count itself.
pub fn app(state: AppState) -> Router {
    // Install the recorder before the first request is measured.
    let _ = middleware::metrics::prometheus_handle();
    let cors = cors_layer(&state.config.allowed_origins);

    let api = Router::new()
        .merge(routes::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state.clone());

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics))
        .with_state(state);

    Router::new().merge(ops).merge(api)
}

/// Any origin when none are configured; unparsable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 503 until the plan catalog has at least one plan,
/// since no checkout can succeed without one.
async fn readiness(State(state): State<AppState>) -> Response {
    if state.saga.config().plans.is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "no plans configured").into_response()
    } else {
        "ready".into_response()
    }
}

/// Prometheus text exposition.
async fn render_metrics() -> Response {
    match middleware::metrics::prometheus_handle() {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder unavailable").into_response(),
    }
}
