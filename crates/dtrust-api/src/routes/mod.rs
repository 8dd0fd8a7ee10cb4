//! # Route Modules
//!
//! Handlers are thin: parse the body, call one saga entry point on the
//! blocking pool, and map the [`Outcome`] to a status code.
//!
//! | Outcome   | Status |
//! |-----------|--------|
//! | `Success` | 200 or 201 |
//! | `Pending` | 202 |
//! | `Partial` | 207 |
//! | `Error`   | by error kind, see [`crate::error`] |

pub mod credentials;
pub mod developers;
pub mod identifiers;
pub mod payments;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use dtrust_onboarding::{OnboardingSaga, Outcome};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::middleware::metrics::record_outcome;
use crate::state::AppState;

/// Body of a 202 response.
#[derive(Debug, Serialize, ToSchema)]
pub struct PendingBody {
    /// Always `pending`.
    pub status: String,
    /// What the operation is waiting for.
    pub reason: String,
}

/// Body of a 207 response: what committed, and what did not.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialBody<T> {
    /// Always `partial`.
    pub status: &'static str,
    /// Step that failed.
    pub failed_step: &'static str,
    /// Failure detail.
    pub message: String,
    /// What was persisted before the failure.
    pub committed: T,
}

/// All onboarding routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(developers::router())
        .merge(payments::router())
        .merge(identifiers::router())
        .merge(credentials::router())
}

/// Run a saga entry point on the blocking pool and count its outcome.
pub(crate) async fn run_saga<T, F>(
    state: &AppState,
    operation: &'static str,
    call: F,
) -> Result<Outcome<T>, AppError>
where
    T: Send + 'static,
    F: FnOnce(&OnboardingSaga) -> Outcome<T> + Send + 'static,
{
    let saga = state.saga.clone();
    let outcome = tokio::task::spawn_blocking(move || call(&saga))
        .await
        .map_err(|e| AppError::Internal(format!("{operation} worker failed: {e}")))?;
    record_outcome(operation, outcome.status());
    Ok(outcome)
}

/// Map an outcome to a response; `success` is the status for `Success`.
pub(crate) fn respond<T: Serialize>(outcome: Outcome<T>, success: StatusCode) -> Response {
    match outcome {
        Outcome::Success(value) => (success, Json(value)).into_response(),
        Outcome::Pending { reason } => (
            StatusCode::ACCEPTED,
            Json(PendingBody {
                status: "pending".to_string(),
                reason,
            }),
        )
            .into_response(),
        Outcome::Partial {
            value,
            failed_step,
            message,
        } => (
            StatusCode::MULTI_STATUS,
            Json(PartialBody {
                status: "partial",
                failed_step: failed_step.as_str(),
                message,
                committed: value,
            }),
        )
            .into_response(),
        Outcome::Error(err) => AppError::from(err).into_response(),
    }
}
