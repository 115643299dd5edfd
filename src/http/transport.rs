//! Raw HTTP transport.
//!
//! Sends exactly one request and buffers the reply. No interception, no
//! recovery: the refresh call, the logout call and the CSRF fetch go through
//! here directly so they can never recurse into session recovery.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::config::ApiConfig;
use crate::http::response::ApiResponse;
use crate::http::types::{ApiError, ApiResult};

/// Credentialed HTTP transport bound to a base URL.
///
/// Session cookies set by the backend are kept in the client's cookie store
/// and sent back automatically; this layer never reads them.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: Url,
}

impl Transport {
    /// Build a transport from configuration.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|source| ApiError::InvalidUrl {
            path: config.base_url.clone(),
            source,
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(ApiError::Build)?;

        Ok(Self { client, base_url })
    }

    /// Resolve `path` against the base URL. Leading slashes are ignored so
    /// `"/profile/"` and `"profile/"` address the same endpoint.
    pub fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| ApiError::InvalidUrl {
                path: path.to_string(),
                source,
            })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send a single request.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> ApiResult<ApiResponse> {
        let url = self.url(path)?;
        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ApiError::Network)?;
        ApiResponse::read(response).await
    }
}
