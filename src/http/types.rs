//! Error definitions for the HTTP layer.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced to callers of the HTTP layer.
///
/// Terminal outcomes of session recovery hand back the error the request
/// originally produced, so callers see exactly what they would without the
/// recovery layer in between.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response reached the client (connect failure, timeout, broken body).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// A request or response body could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint path could not be resolved against the base URL.
    #[error("invalid request URL '{path}': {source}")]
    InvalidUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl ApiError {
    /// Status code of the server response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 401 Unauthorized and 403 Forbidden responses.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        )
    }

    /// Response body text for status errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Result type for HTTP layer operations.
pub type ApiResult<T> = Result<T, ApiError>;
