//! # Payment Routes
//!
//! - `POST /v1/payments/checkout` opens a checkout session.
//! - `POST /v1/payments/confirm` reconciles a returning checkout and runs
//!   identifier and credential issuance. `202` while unpaid, `207` when
//!   the subscription committed but a later step failed.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use dtrust_onboarding::saga::{CheckoutCommand, PaymentConfirmation};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{respond, run_saga};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Request body for checkout.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    /// Plan key or provider price id.
    #[serde(alias = "priceId")]
    pub plan: String,
    /// Payment customer from email verification.
    pub customer_id: String,
}

/// Request body for confirmation.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBody {
    /// Checkout session id.
    pub session_id: String,
    /// Customer the session belongs to.
    pub customer_id: String,
}

/// Build the payments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/payments/checkout", post(create_checkout))
        .route("/v1/payments/confirm", post(confirm_payment))
}

/// POST /v1/payments/checkout: Open a checkout session.
#[utoipa::path(
    post,
    path = "/v1/payments/checkout",
    request_body = CheckoutBody,
    responses(
        (status = 200, description = "Session id and redirect URL"),
        (status = 207, description = "Session created but not recorded"),
        (status = 404, description = "Unknown customer", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown plan", body = crate::error::ErrorBody),
        (status = 502, description = "Payment provider unavailable", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    body: Result<Json<CheckoutBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let b = extract_json(body)?;
    let command = CheckoutCommand {
        plan: b.plan,
        customer_id: b.customer_id,
    };
    let outcome = run_saga(&state, "create_checkout_session", move |saga| {
        saga.create_checkout_session(command)
    })
    .await?;
    Ok(respond(outcome, StatusCode::OK))
}

/// POST /v1/payments/confirm: Confirm payment and issue.
#[utoipa::path(
    post,
    path = "/v1/payments/confirm",
    request_body = ConfirmBody,
    responses(
        (status = 200, description = "Subscription, identifier and credential"),
        (status = 202, description = "Payment not yet settled", body = super::PendingBody),
        (status = 207, description = "Subscription committed, a later step failed"),
        (status = 422, description = "Session does not belong to the customer", body = crate::error::ErrorBody),
        (status = 502, description = "Collaborator unavailable", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    body: Result<Json<ConfirmBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let b = extract_json(body)?;
    let confirmation = PaymentConfirmation {
        session_id: b.session_id,
        customer_id: b.customer_id,
    };
    let outcome = run_saga(&state, "confirm_payment", move |saga| {
        saga.confirm_payment(confirmation)
    })
    .await?;
    Ok(respond(outcome, StatusCode::OK))
}
