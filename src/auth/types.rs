//! Auth request and result types.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::http::ApiError;

/// Errors from the auth facade.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// The server refused the call; `message` is its `error` text when given.
    #[error("{message} (HTTP {status})")]
    Rejected { status: StatusCode, message: String },

    #[error(transparent)]
    Api(ApiError),
}

impl AuthError {
    /// Turn a failed call into an `AuthError`, using `fallback` when the
    /// server did not explain the refusal.
    pub fn from_api(error: ApiError, fallback: &str) -> Self {
        match error {
            ApiError::Status { status, body } => {
                let message = serde_json::from_str::<Value>(&body)
                    .ok()
                    .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_else(|| fallback.to_string());
                AuthError::Rejected { status, message }
            }
            other => AuthError::Api(other),
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(error: ApiError) -> Self {
        AuthError::from_api(error, "Request failed")
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub message: String,
    pub role: Option<String>,
}

/// Patient self-registration payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Any further registration fields, sent as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
