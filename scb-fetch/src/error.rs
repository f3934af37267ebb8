//! Error types for scb-fetch
//!
//! [`FetchError`] is the pipeline boundary; [`ApiError`] maps everything to
//! HTTP responses with a `{ "error": { "code", "message" } }` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scb_common::api::ErrorBody;
use thiserror::Error;

use crate::provider::ProviderFetchError;
use crate::range::batch::BatchBuildError;
use crate::store::StoreError;

/// Message shown to editors when the sheet read fails
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch Google Sheet data";

/// Message shown when a block has never been fetched
pub const NO_CACHE_MESSAGE: &str = "No cached data yet. Please fetch data in the editor.";

/// Fetch pipeline failure
#[derive(Debug, Error)]
pub enum FetchError {
    /// Caller-supplied identifiers are unusable
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Range configuration cannot be turned into a batch request
    #[error("Invalid ranges: {0}")]
    Build(#[from] BatchBuildError),

    /// The batched read failed; nothing was cached
    #[error("Sheet fetch failed: {0}")]
    Provider(#[from] ProviderFetchError),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Block has no cached data (404)
    #[error("No cached data for block {0}")]
    NoCache(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Sheet provider failure (502); details are logged, not returned
    #[error("Sheet fetch failed: {0}")]
    Provider(ProviderFetchError),

    /// Cache storage failure (500)
    #[error("Cache storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            FetchError::Build(e) => ApiError::BadRequest(e.to_string()),
            FetchError::Provider(e) => ApiError::Provider(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NoCache(_) => (StatusCode::NOT_FOUND, "NO_CACHE", NO_CACHE_MESSAGE.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Provider(ref err) => {
                tracing::error!(error = %err, "Sheet provider request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "GOOGLE_FETCH_ERROR",
                    FETCH_FAILED_MESSAGE.to_string(),
                )
            }
            ApiError::Store(ref err) => {
                tracing::error!(error = %err, "Cache storage failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Cache storage error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody::new(error_code, message))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
