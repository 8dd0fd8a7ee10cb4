//! # Credential Routes
//!
//! Ad-hoc issuance, read-only verification, the verification-link
//! confirmation, and operator revocation.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use dtrust_onboarding::saga::{AdHocCredentialRequest, CredentialConfirmation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{respond, run_saga};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Request body for ad-hoc issuance.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueCredentialBody {
    /// Credential type appended to `VerifiableCredential`.
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Must be the service's issuer DID.
    pub issuer: String,
    /// Subject DID.
    pub subject: String,
    /// Arbitrary claims object.
    #[schema(value_type = Object)]
    pub claims: serde_json::Value,
}

/// Request body for verification.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCredentialBody {
    /// Compact JWS form.
    #[serde(alias = "vcJwt")]
    pub credential_jwt: String,
}

/// Verification verdict.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerificationVerdict {
    /// Signature and issuer check out.
    pub verified: bool,
}

/// Request body for link confirmation.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCredentialBody {
    /// Compact credential from the link.
    #[serde(alias = "vcJwt")]
    pub credential_jwt: String,
    /// Unix seconds when the link was generated.
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Credential id from the link.
    #[serde(alias = "uuid")]
    pub credential_id: String,
    /// Email of the owning developer.
    pub email: String,
}

/// Build the credentials router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/credentials", post(issue_credential))
        .route("/v1/credentials/verify", post(verify_credential))
        .route("/v1/credentials/confirm", post(confirm_credential))
        .route("/v1/credentials/{id}/revoke", post(revoke_credential))
}

/// POST /v1/credentials: Issue an ad-hoc credential (one-month validity).
#[utoipa::path(
    post,
    path = "/v1/credentials",
    request_body = IssueCredentialBody,
    responses(
        (status = 201, description = "Credential issued"),
        (status = 422, description = "Invalid request or foreign issuer", body = crate::error::ErrorBody),
        (status = 502, description = "Credential registry unavailable", body = crate::error::ErrorBody),
    ),
    tag = "credentials"
)]
pub async fn issue_credential(
    State(state): State<AppState>,
    body: Result<Json<IssueCredentialBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let b = extract_json(body)?;
    let request = AdHocCredentialRequest {
        credential_type: b.credential_type,
        issuer: b.issuer,
        subject: b.subject,
        claims: b.claims,
    };
    let outcome = run_saga(&state, "issue_ad_hoc_credential", move |saga| {
        saga.issue_ad_hoc_credential(request)
    })
    .await?;
    Ok(respond(outcome, StatusCode::CREATED))
}

/// POST /v1/credentials/verify: Verify a compact credential. Read-only.
#[utoipa::path(
    post,
    path = "/v1/credentials/verify",
    request_body = VerifyCredentialBody,
    responses(
        (status = 200, description = "Verdict", body = VerificationVerdict),
        (status = 422, description = "Empty token", body = crate::error::ErrorBody),
    ),
    tag = "credentials"
)]
pub async fn verify_credential(
    State(state): State<AppState>,
    body: Result<Json<VerifyCredentialBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let VerifyCredentialBody { credential_jwt } = extract_json(body)?;
    let outcome = run_saga(&state, "verify_credential", move |saga| {
        saga.verify_credential(&credential_jwt)
    })
    .await?;
    Ok(respond(
        outcome.map(|verified| VerificationVerdict { verified }),
        StatusCode::OK,
    ))
}

/// POST /v1/credentials/confirm: Confirm a verification link.
#[utoipa::path(
    post,
    path = "/v1/credentials/confirm",
    request_body = ConfirmCredentialBody,
    responses(
        (status = 200, description = "Credential verified"),
        (status = 404, description = "Unknown credential or developer", body = crate::error::ErrorBody),
        (status = 410, description = "Link outside the replay window", body = crate::error::ErrorBody),
        (status = 422, description = "Credential failed verification", body = crate::error::ErrorBody),
    ),
    tag = "credentials"
)]
pub async fn confirm_credential(
    State(state): State<AppState>,
    body: Result<Json<ConfirmCredentialBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let b = extract_json(body)?;
    let confirmation = CredentialConfirmation {
        credential_jwt: b.credential_jwt,
        timestamp: b.timestamp,
        credential_id: b.credential_id,
        email: b.email,
    };
    let outcome = run_saga(&state, "confirm_credential_verification", move |saga| {
        saga.confirm_credential_verification(confirmation)
    })
    .await?;
    Ok(respond(outcome, StatusCode::OK))
}

/// POST /v1/credentials/{id}/revoke: Revoke a credential.
#[utoipa::path(
    post,
    path = "/v1/credentials/{id}/revoke",
    params(("id" = String, Path, description = "Credential id")),
    responses(
        (status = 200, description = "Credential revoked"),
        (status = 404, description = "Unknown credential", body = crate::error::ErrorBody),
        (status = 409, description = "Credential already expired", body = crate::error::ErrorBody),
    ),
    tag = "credentials"
)]
pub async fn revoke_credential(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let outcome = run_saga(&state, "revoke_credential", move |saga| {
        saga.revoke_credential(&id)
    })
    .await?;
    Ok(respond(outcome, StatusCode::OK))
}
