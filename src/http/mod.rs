//! HTTP client subsystem.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → request.rs (ApiRequest descriptor, CSRF interceptor)
//!     → client.rs (dispatch with request ID, retry orchestration)
//!     → transport.rs (reqwest, cookies, base URL, timeouts)
//!     → response.rs (buffer body, status → ApiError, classify failure)
//!     → Caller receives ApiResponse or the original ApiError
//! ```
//!
//! # Design Decisions
//! - One replay at most per request, enforced by a typed retry marker
//! - Session endpoints (CSRF, refresh, logout) bypass the orchestrator
//! - Terminal failures surface the request's own error unchanged

pub mod client;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;

pub use client::{ApiClient, ApiClientBuilder, BuildError};
pub use request::{is_mutating, ApiRequest, RequestInterceptor, X_CSRF_TOKEN, X_REQUEST_ID};
pub use response::{classify, ApiResponse, Failure};
pub use transport::Transport;
pub use types::{ApiError, ApiResult};
