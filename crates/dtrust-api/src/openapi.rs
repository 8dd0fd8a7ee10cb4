//! # OpenAPI Document Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "DecenTrust Onboarding API",
        version = "0.1.0",
        description = "Developer registration, email verification, subscription checkout, and issuance of decentralized identifiers and verifiable credentials."
    ),
    paths(
        // Developers
        crate::routes::developers::register,
        crate::routes::developers::issue_challenge,
        crate::routes::developers::verify_challenge,
        crate::routes::developers::get_profile,
        crate::routes::developers::direct_issue,
        crate::routes::developers::list_credentials,
        // Payments
        crate::routes::payments::create_checkout,
        crate::routes::payments::confirm_payment,
        // Identifiers
        crate::routes::identifiers::get_identifier,
        crate::routes::identifiers::search_identifiers,
        crate::routes::identifiers::refresh_identifier,
        // Credentials
        crate::routes::credentials::issue_credential,
        crate::routes::credentials::verify_credential,
        crate::routes::credentials::confirm_credential,
        crate::routes::credentials::revoke_credential,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::PendingBody,
        crate::routes::developers::RegisterBody,
        crate::routes::developers::ChallengeBody,
        crate::routes::developers::VerifyBody,
        crate::routes::payments::CheckoutBody,
        crate::routes::payments::ConfirmBody,
        crate::routes::identifiers::SearchBody,
        crate::routes::identifiers::RefreshBody,
        crate::routes::credentials::IssueCredentialBody,
        crate::routes::credentials::VerifyCredentialBody,
        crate::routes::credentials::VerificationVerdict,
        crate::routes::credentials::ConfirmCredentialBody,
    )),
    tags(
        (name = "developers", description = "Registration, email verification and profiles"),
        (name = "payments", description = "Checkout and payment confirmation"),
        (name = "identifiers", description = "Decentralized identifier queries"),
        (name = "credentials", description = "Verifiable credential issuance and verification"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
