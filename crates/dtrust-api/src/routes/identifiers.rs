//! # Identifier Routes
//!
//! Read-side identifier queries plus an explicit registry refresh.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{respond, run_saga};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_query};
use crate::state::AppState;

/// Lookup query.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UriQuery {
    /// Identifier DID.
    pub uri: String,
}

/// Request body for search.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchBody {
    /// Case-insensitive substring of the identifier name; truncated to 100
    /// characters.
    pub query: String,
}

/// Request body for refresh.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshBody {
    /// Identifier DID.
    pub uri: String,
}

/// Build the identifiers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/identifiers", get(get_identifier))
        .route("/v1/identifiers/search", post(search_identifiers))
        .route("/v1/identifiers/refresh", post(refresh_identifier))
}

/// GET /v1/identifiers?uri=: Identifier by URI.
#[utoipa::path(
    get,
    path = "/v1/identifiers",
    params(("uri" = String, Query, description = "Identifier URI")),
    responses(
        (status = 200, description = "Identifier projection"),
        (status = 404, description = "Unknown identifier", body = crate::error::ErrorBody),
    ),
    tag = "identifiers"
)]
pub async fn get_identifier(
    State(state): State<AppState>,
    query: Result<Query<UriQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let UriQuery { uri } = extract_query(query)?;
    let outcome = run_saga(&state, "get_identifier_by_uri", move |saga| {
        saga.get_identifier_by_uri(&uri)
    })
    .await?;
    Ok(respond(outcome, StatusCode::OK))
}

/// POST /v1/identifiers/search: Search by name (at most 50 results).
#[utoipa::path(
    post,
    path = "/v1/identifiers/search",
    request_body = SearchBody,
    responses(
        (status = 200, description = "Matching identifiers"),
        (status = 422, description = "Empty query", body = crate::error::ErrorBody),
    ),
    tag = "identifiers"
)]
pub async fn search_identifiers(
    State(state): State<AppState>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let SearchBody { query } = extract_json(body)?;
    let outcome = run_saga(&state, "search_identifiers", move |saga| {
        saga.search_identifiers(&query)
    })
    .await?;
    Ok(respond(outcome, StatusCode::OK))
}

/// POST /v1/identifiers/refresh: Re-resolve the stored document.
#[utoipa::path(
    post,
    path = "/v1/identifiers/refresh",
    request_body = RefreshBody,
    responses(
        (status = 200, description = "Identifier refreshed"),
        (status = 404, description = "Unknown identifier", body = crate::error::ErrorBody),
        (status = 502, description = "Registry unavailable", body = crate::error::ErrorBody),
    ),
    tag = "identifiers"
)]
pub async fn refresh_identifier(
    State(state): State<AppState>,
    body: Result<Json<RefreshBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let RefreshBody { uri } = extract_json(body)?;
    let outcome = run_saga(&state, "refresh_identifier", move |saga| {
        saga.refresh_identifier(&uri)
    })
    .await?;
    Ok(respond(outcome, StatusCode::OK))
}
