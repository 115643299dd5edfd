//! Outgoing request descriptor and the request interceptor.
//!
//! # Responsibilities
//! - Describe a request independently of the transport (method, path, body)
//! - Carry the typed retry marker set by the retry orchestrator
//! - Attach the cached CSRF token to mutating requests
//!
//! # Design Decisions
//! - Descriptors are immutable; builder methods consume and return `Self`
//! - The retry marker can only be set from inside the crate
//! - The interceptor reads the cache only and never touches the network

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::http::types::ApiResult;
use crate::session::csrf::CsrfCache;

/// Anti-forgery header expected by the backend on mutating requests.
pub const X_CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrftoken");

/// Correlation header attached to every dispatched request.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Methods that change server state and therefore need a CSRF token.
pub fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// An outgoing API request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    headers: HeaderMap,
    retried: bool,
}

impl ApiRequest {
    /// Create a request for `path`, relative to the client's base URL.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON payload.
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> ApiResult<Self> {
        Ok(self.with_body(serde_json::to_value(body)?))
    }

    /// Add a request-specific header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// True once the request has been replayed after a session refresh.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub fn is_mutating(&self) -> bool {
        is_mutating(&self.method)
    }

    /// True if this request targets `endpoint` (leading slashes and query ignored).
    pub fn targets(&self, endpoint: &str) -> bool {
        let path = self.path.split(['?', '#']).next().unwrap_or_default();
        let endpoint = endpoint.trim_start_matches('/');
        !endpoint.is_empty() && path.trim_start_matches('/').starts_with(endpoint)
    }

    pub(crate) fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }
}

/// Decorates outgoing requests with the cached CSRF token.
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    csrf: Arc<CsrfCache>,
}

impl RequestInterceptor {
    pub fn new(csrf: Arc<CsrfCache>) -> Self {
        Self { csrf }
    }

    /// Headers to send with `request`: its own headers plus `X-CSRFToken`
    /// when the method is mutating and a token is cached.
    pub fn headers_for(&self, request: &ApiRequest) -> HeaderMap {
        let mut headers = request.headers().clone();
        if !request.is_mutating() {
            return headers;
        }

        if let Some(token) = self.csrf.get() {
            match HeaderValue::from_str(&token) {
                Ok(value) => {
                    headers.insert(X_CSRF_TOKEN, value);
                }
                Err(_) => {
                    tracing::warn!(path = %request.path(), "Cached CSRF token is not a valid header value; sending without it");
                }
            }
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::MemoryStore;

    fn interceptor_with(token: Option<&str>) -> RequestInterceptor {
        let cache = Arc::new(CsrfCache::new(Arc::new(MemoryStore::new())));
        if let Some(token) = token {
            cache.set(token);
        }
        RequestInterceptor::new(cache)
    }

    #[test]
    fn test_mutating_methods() {
        assert!(is_mutating(&Method::POST));
        assert!(is_mutating(&Method::PUT));
        assert!(is_mutating(&Method::PATCH));
        assert!(is_mutating(&Method::DELETE));
        assert!(!is_mutating(&Method::GET));
        assert!(!is_mutating(&Method::HEAD));
        assert!(!is_mutating(&Method::OPTIONS));
    }

    #[test]
    fn test_token_attached_to_mutating_requests() {
        let interceptor = interceptor_with(Some("tok-123"));

        for request in [
            ApiRequest::post("appointments/"),
            ApiRequest::put("profile/"),
            ApiRequest::patch("bills/4/"),
            ApiRequest::delete("orders/9/"),
        ] {
            let headers = interceptor.headers_for(&request);
            assert_eq!(headers.get(X_CSRF_TOKEN).unwrap(), "tok-123");
        }
    }

    #[test]
    fn test_reads_pass_through_unchanged() {
        let interceptor = interceptor_with(Some("tok-123"));
        let request = ApiRequest::get("profile/")
            .with_header(HeaderName::from_static("x-trace"), HeaderValue::from_static("1"));

        let headers = interceptor.headers_for(&request);
        assert!(headers.get(X_CSRF_TOKEN).is_none());
        assert_eq!(headers, *request.headers());
    }

    #[test]
    fn test_no_token_cached() {
        let interceptor = interceptor_with(None);
        let headers = interceptor.headers_for(&ApiRequest::post("logout/"));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_targets_ignores_slashes_and_query() {
        assert!(ApiRequest::post("token/refresh/").targets("token/refresh/"));
        assert!(ApiRequest::post("/token/refresh/?x=1").targets("token/refresh/"));
        assert!(!ApiRequest::get("profile/").targets("token/refresh/"));
        assert!(!ApiRequest::get("profile/").targets(""));
    }

    #[test]
    fn test_retry_marker_starts_false() {
        let request = ApiRequest::get("profile/");
        assert!(!request.is_retried());
        assert!(request.mark_retried().is_retried());
    }
}
