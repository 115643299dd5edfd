//! Response handling and failure classification.
//!
//! # Responsibilities
//! - Buffer a transport response into an `ApiResponse`
//! - Turn non-success statuses into `ApiError::Status`
//! - Classify failures for the retry orchestrator
//!
//! # Failure Classes
//! ```text
//! no response reached        → Network        (propagate, never refresh)
//! 401/403, first occurrence  → AuthExpired    (refresh once, replay once)
//! 401/403 on replay/refresh  → AuthLoopGuard  (propagate, no further action)
//! any other status           → Domain         (propagate, not a session issue)
//! ```

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::http::request::ApiRequest;
use crate::http::types::{ApiError, ApiResult};

/// A fully buffered successful response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Buffer `response`, mapping non-success statuses to `ApiError::Status`.
    pub async fn read(response: reqwest::Response) -> ApiResult<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(ApiError::Network)?.to_vec();

        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(Self::new(status, headers, body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// How the retry orchestrator treats a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Network,
    AuthExpired,
    AuthLoopGuard,
    Domain,
}

impl Failure {
    pub fn as_str(self) -> &'static str {
        match self {
            Failure::Network => "network",
            Failure::AuthExpired => "auth_expired",
            Failure::AuthLoopGuard => "auth_loop_guard",
            Failure::Domain => "domain",
        }
    }
}

/// Classify `error` produced by `request`.
///
/// `refresh_path` is the refresh endpoint; auth failures on it are never
/// recovered, whatever the retry marker says.
pub fn classify(error: &ApiError, request: &ApiRequest, refresh_path: &str) -> Failure {
    match error {
        ApiError::Status { .. } if error.is_auth_failure() => {
            if request.is_retried() || request.targets(refresh_path) {
                Failure::AuthLoopGuard
            } else {
                Failure::AuthExpired
            }
        }
        ApiError::Status { .. } => Failure::Domain,
        _ => Failure::Network,
    }
}
