//! # Developer Routes
//!
//! Registration, email verification, direct issuance, profiles and
//! credential listing.
//!
//! - `POST /v1/developers`
//! - `POST /v1/developers/challenge`
//! - `POST /v1/developers/verify`
//! - `GET  /v1/developers/profile?name=`
//! - `POST /v1/developers/{id}/issue`
//! - `GET  /v1/developers/{id}/credentials`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use dtrust_core::DeveloperId;
use dtrust_onboarding::saga::{ChallengeRequest, VerifyRequest};
use dtrust_onboarding::RegistrationRequest;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{respond, run_saga};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::state::AppState;

/// Request body for registration.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Domain label, e.g. `acme`.
    pub domain_name: String,
    /// `ai` or `service`.
    pub extension_type: String,
    /// Identifier suffix; defaults to the extension type.
    #[serde(default)]
    pub extension_name: Option<String>,
    /// Company name.
    #[serde(default)]
    pub company_name: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Homepage URL.
    #[serde(default)]
    pub web_link: Option<String>,
    /// LinkedIn profile URL.
    #[serde(default)]
    pub linked_in: Option<String>,
    /// GitHub profile URL.
    #[serde(default)]
    pub github: Option<String>,
    /// Hugging Face profile URL.
    #[serde(default)]
    pub hugging_face: Option<String>,
}

impl From<RegisterBody> for RegistrationRequest {
    fn from(b: RegisterBody) -> Self {
        Self {
            first_name: b.first_name,
            last_name: b.last_name,
            email: b.email,
            domain_name: b.domain_name,
            extension_type: b.extension_type,
            extension_name: b.extension_name,
            company_name: b.company_name,
            description: b.description,
            web_link: b.web_link,
            linked_in: b.linked_in,
            github: b.github,
            hugging_face: b.hugging_face,
        }
    }
}

/// Request body for code issuance.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeBody {
    /// Registered email.
    pub email: String,
    /// Registered domain label.
    pub domain_name: String,
    /// `ai` or `service`.
    pub extension_type: String,
}

/// Request body for code verification.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyBody {
    /// Registered email.
    pub email: String,
    /// The six-digit code from the mail.
    pub code: String,
}

/// Profile lookup query.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileQuery {
    /// `<domainName>.<m|s>`.
    pub name: String,
}

/// Build the developers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/developers", post(register))
        .route("/v1/developers/challenge", post(issue_challenge))
        .route("/v1/developers/verify", post(verify_challenge))
        .route("/v1/developers/profile", get(get_profile))
        .route("/v1/developers/{id}/issue", post(direct_issue))
        .route("/v1/developers/{id}/credentials", get(list_credentials))
}

fn parse_developer_id(raw: &str) -> Result<DeveloperId, AppError> {
    raw.parse().map_err(AppError::from)
}

/// POST /v1/developers: Register a developer.
#[utoipa::path(
    post,
    path = "/v1/developers",
    request_body = RegisterBody,
    responses(
        (status = 201, description = "Developer registered"),
        (status = 409, description = "Email or identifier name already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid registration", body = crate::error::ErrorBody),
    ),
    tag = "developers"
)]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = RegistrationRequest::from(extract_json(body)?);
    let outcome = run_saga(&state, "register", move |saga| saga.register(request)).await?;
    Ok(respond(outcome, StatusCode::CREATED))
}

/// POST /v1/developers/challenge: Mail a verification code.
#[utoipa::path(
    post,
    path = "/v1/developers/challenge",
    request_body = ChallengeBody,
    responses(
        (status = 200, description = "Code issued, or email already verified"),
        (status = 404, description = "No developer matches", body = crate::error::ErrorBody),
        (status = 502, description = "Code mail not accepted", body = crate::error::ErrorBody),
    ),
    tag = "developers"
)]
pub async fn issue_challenge(
    State(state): State<AppState>,
    body: Result<Json<ChallengeBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let b = extract_json(body)?;
    let request = ChallengeRequest {
        email: b.email,
        domain_name: b.domain_name,
        extension_type: b.extension_type,
    };
    let outcome = run_saga(&state, "issue_challenge", move |saga| {
        saga.issue_challenge(request)
    })
    .await?;
    Ok(respond(outcome, StatusCode::OK))
}

/// POST /v1/developers/verify: Submit a verification code.
#[utoipa::path(
    post,
    path = "/v1/developers/verify",
    request_body = VerifyBody,
    responses(
        (status = 200, description = "Email verified"),
        (status = 422, description = "Invalid or expired code", body = crate::error::ErrorBody),
        (status = 502, description = "Payment provider unavailable", body = crate::error::ErrorBody),
    ),
    tag = "developers"
)]
pub async fn verify_challenge(
    State(state): State<AppState>,
    body: Result<Json<VerifyBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let b = extract_json(body)?;
    let request = VerifyRequest {
        email: b.email,
        code: b.code,
    };
    let outcome = run_saga(&state, "verify_challenge", move |saga| {
        saga.verify_challenge(request)
    })
    .await?;
    Ok(respond(outcome, StatusCode::OK))
}

/// GET /v1/developers/profile?name=: Public profile.
#[utoipa::path(
    get,
    path = "/v1/developers/profile",
    params(("name" = String, Query, description = "`<domainName>.<m|s>`")),
    responses(
        (status = 200, description = "Public profile"),
        (status = 404, description = "No such profile", body = crate::error::ErrorBody),
    ),
    tag = "developers"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    query: Result<Query<ProfileQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let ProfileQuery { name } = extract_query(query)?;
    let outcome = run_saga(&state, "get_profile", move |saga| saga.get_profile(&name)).await?;
    Ok(respond(outcome, StatusCode::OK))
}

/// POST /v1/developers/{id}/issue: Issue without payment, or resume.
#[utoipa::path(
    post,
    path = "/v1/developers/{id}/issue",
    params(("id" = String, Path, description = "Developer id")),
    responses(
        (status = 200, description = "Identifier and credential issued"),
        (status = 207, description = "Identifier committed, a later step failed"),
        (status = 422, description = "Email not verified", body = crate::error::ErrorBody),
    ),
    tag = "developers"
)]
pub async fn direct_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_developer_id(&id)?;
    let outcome = run_saga(&state, "direct_issue", move |saga| saga.direct_issue(&id)).await?;
    Ok(respond(outcome, StatusCode::OK))
}

/// GET /v1/developers/{id}/credentials: Credentials, newest first.
#[utoipa::path(
    get,
    path = "/v1/developers/{id}/credentials",
    params(("id" = String, Path, description = "Developer id")),
    responses(
        (status = 200, description = "Credential projections"),
        (status = 404, description = "Unknown developer", body = crate::error::ErrorBody),
    ),
    tag = "developers"
)]
pub async fn list_credentials(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_developer_id(&id)?;
    let outcome = run_saga(&state, "credentials_for_developer", move |saga| {
        saga.credentials_for_developer(&id)
    })
    .await?;
    Ok(respond(outcome, StatusCode::OK))
}
