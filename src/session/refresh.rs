//! Session renewal endpoint.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::request::X_CSRF_TOKEN;
use crate::http::transport::Transport;
use crate::http::types::ApiResult;
use crate::session::csrf::CsrfCache;

/// Successful renewal payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshGrant {
    /// Updated profile, when the server includes one.
    #[serde(default)]
    pub user: Option<Value>,
}

/// Performs one session renewal network call.
pub trait RefreshEndpoint: Send + Sync {
    fn refresh(&self) -> BoxFuture<'_, ApiResult<RefreshGrant>>;
}

/// Renews the session by POSTing to the refresh endpoint.
///
/// The call goes straight to the transport: it is never intercepted and can
/// never trigger another refresh.
#[derive(Debug, Clone)]
pub struct HttpRefreshEndpoint {
    transport: Transport,
    csrf: Arc<CsrfCache>,
    path: String,
}

impl HttpRefreshEndpoint {
    pub fn new(transport: Transport, csrf: Arc<CsrfCache>, path: impl Into<String>) -> Self {
        Self {
            transport,
            csrf,
            path: path.into(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let token = self.csrf.get().unwrap_or_default();
        headers.insert(
            X_CSRF_TOKEN,
            HeaderValue::from_str(&token).unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(EXPIRES, HeaderValue::from_static("0"));
        headers
    }
}

impl RefreshEndpoint for HttpRefreshEndpoint {
    fn refresh(&self) -> BoxFuture<'_, ApiResult<RefreshGrant>> {
        Box::pin(async move {
            let body = json!({});
            let response = self
                .transport
                .send(Method::POST, &self.path, self.headers(), Some(&body))
                .await?;

            // Renewal succeeded on status alone; a body we cannot read just
            // means there is no profile to cache.
            Ok(response.json::<RefreshGrant>().unwrap_or_default())
        })
    }
}
