//! CSRF token cache.
//!
//! # Lifecycle
//! ```text
//! absent at startup (unless persisted)
//!     → fetch_if_absent(): GET csrf/ once
//!     → cached indefinitely, attached to every mutating request
//!     → cleared only by session teardown or logout
//! ```
//!
//! Having a token is treated as sufficient; a token the server later rejects
//! is dealt with by the ordinary 401/403 recovery path, not here.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::Deserialize;

use crate::http::transport::Transport;
use crate::observability::metrics;
use crate::session::store::SessionStore;

/// Store key of the persisted token.
pub const CSRF_STORE_KEY: &str = "csrftoken";

/// Result of [`CsrfCache::fetch_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsrfFetch {
    /// A token was already cached; no network call was made.
    Cached(String),
    /// The token was fetched from the server and cached.
    Fetched(String),
    /// The fetch failed; callers continue without a token.
    Unavailable,
}

impl CsrfFetch {
    pub fn token(&self) -> Option<&str> {
        match self {
            CsrfFetch::Cached(token) | CsrfFetch::Fetched(token) => Some(token),
            CsrfFetch::Unavailable => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsrfPayload {
    csrf: Option<String>,
}

/// Process-wide anti-forgery token slot, backed by the durable store.
#[derive(Debug)]
pub struct CsrfCache {
    slot: ArcSwapOption<String>,
    store: Arc<dyn SessionStore>,
}

impl CsrfCache {
    /// Create the cache, hydrating it from `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let persisted = store.get(CSRF_STORE_KEY).filter(|t| !t.is_empty());
        Self {
            slot: ArcSwapOption::new(persisted.map(Arc::new)),
            store,
        }
    }

    pub fn get(&self) -> Option<String> {
        self.slot.load_full().map(|token| token.as_ref().clone())
    }

    pub fn set(&self, token: &str) {
        self.slot.store(Some(Arc::new(token.to_string())));
        if let Err(e) = self.store.set(CSRF_STORE_KEY, token.to_string()) {
            tracing::warn!(error = %e, "Failed to persist CSRF token");
        }
    }

    pub fn clear(&self) {
        self.slot.store(None);
        if let Err(e) = self.store.remove(CSRF_STORE_KEY) {
            tracing::warn!(error = %e, "Failed to remove persisted CSRF token");
        }
    }

    /// Return the cached token, or fetch it once from `path` if none is cached.
    ///
    /// Failures never propagate: public flows must not be blocked by a
    /// transient token-fetch failure.
    pub async fn fetch_if_absent(&self, transport: &Transport, path: &str) -> CsrfFetch {
        if let Some(token) = self.get() {
            tracing::debug!("Using cached CSRF token");
            metrics::record_csrf_fetch("cached");
            return CsrfFetch::Cached(token);
        }

        let response = match transport
            .send(Method::GET, path, HeaderMap::new(), None)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "CSRF token fetch failed; continuing without token");
                metrics::record_csrf_fetch("failed");
                return CsrfFetch::Unavailable;
            }
        };

        match response.json::<CsrfPayload>() {
            Ok(CsrfPayload { csrf: Some(token) }) if !token.is_empty() => {
                self.set(&token);
                tracing::info!("CSRF token fetched and cached");
                metrics::record_csrf_fetch("fetched");
                CsrfFetch::Fetched(token)
            }
            Ok(_) => {
                tracing::warn!("CSRF endpoint returned no token; continuing without token");
                metrics::record_csrf_fetch("failed");
                CsrfFetch::Unavailable
            }
            Err(e) => {
                tracing::warn!(error = %e, "CSRF response could not be decoded; continuing without token");
                metrics::record_csrf_fetch("failed");
                CsrfFetch::Unavailable
            }
        }
    }
}
