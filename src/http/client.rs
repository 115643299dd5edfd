//! Authenticated API client and retry orchestrator.
//!
//! # Request Lifecycle
//! ```text
//! send(request)
//!     → dispatch (CSRF header on mutating methods, X-Request-ID)
//!     → success                        → response
//!     → Network / Domain / LoopGuard   → original error
//!     → AuthExpired                    → mark retried
//!         → location public?           → original error (no refresh, no redirect)
//!         → coordinator grants?        → replay once, return replay result
//!         → coordinator denies         → teardown, original error
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::HeaderValue;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::validation::{validate_config, ValidationError};
use crate::config::ClientConfig;
use crate::http::request::{ApiRequest, RequestInterceptor, X_REQUEST_ID};
use crate::http::response::{classify, ApiResponse, Failure};
use crate::http::transport::Transport;
use crate::http::types::{ApiError, ApiResult};
use crate::observability::metrics;
use crate::routing::{HeadlessNavigator, Navigator, PublicRoutes};
use crate::session::{
    CsrfCache, CsrfFetch, FileStore, HttpRefreshEndpoint, MemoryStore, ProfileCache,
    RefreshCoordinator, RefreshEndpoint, SessionStore, SessionTeardown, StoreError,
    TeardownOutcome,
};

/// Errors building an [`ApiClient`].
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to open session store: {0}")]
    Store(#[from] StoreError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builder for [`ApiClient`]. Every collaborator has a default derived from
/// the configuration.
pub struct ApiClientBuilder {
    config: ClientConfig,
    store: Option<Arc<dyn SessionStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    refresh_endpoint: Option<Arc<dyn RefreshEndpoint>>,
}

impl ApiClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            store: None,
            navigator: None,
            refresh_endpoint: None,
        }
    }

    /// Durable store for the CSRF token and profile. Defaults to a file store
    /// when `storage.path` is set, in-memory otherwise.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Navigation capability. Defaults to a headless navigator at `/`.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Override the session renewal call.
    pub fn refresh_endpoint(mut self, endpoint: Arc<dyn RefreshEndpoint>) -> Self {
        self.refresh_endpoint = Some(endpoint);
        self
    }

    /// Validate the configuration and assemble the client.
    pub fn build(self) -> Result<ApiClient, BuildError> {
        let config = self.config;
        validate_config(&config).map_err(BuildError::Config)?;
        let transport = Transport::new(&config.api)?;

        let store = match (self.store, &config.storage.path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileStore::open(path)?) as Arc<dyn SessionStore>,
            (None, None) => Arc::new(MemoryStore::new()) as Arc<dyn SessionStore>,
        };
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(HeadlessNavigator::default()));

        let csrf = Arc::new(CsrfCache::new(store.clone()));
        let profile = ProfileCache::new(store);
        let routes = PublicRoutes::from_config(&config.routes);

        let endpoint = self.refresh_endpoint.unwrap_or_else(|| {
            Arc::new(HttpRefreshEndpoint::new(
                transport.clone(),
                csrf.clone(),
                config.endpoints.refresh.clone(),
            ))
        });
        let coordinator = RefreshCoordinator::new(
            endpoint,
            profile.clone(),
            Duration::from_millis(config.session.throttle_window_ms),
        );
        let teardown = SessionTeardown::new(
            transport.clone(),
            csrf.clone(),
            profile.clone(),
            navigator.clone(),
            routes.clone(),
            config.endpoints.logout.clone(),
            Duration::from_millis(config.session.redirect_grace_ms),
        );

        tracing::debug!(base_url = %transport.base_url(), "API client ready");

        Ok(ApiClient {
            interceptor: RequestInterceptor::new(csrf.clone()),
            transport,
            csrf,
            profile,
            coordinator,
            teardown,
            routes,
            navigator,
            config,
        })
    }
}

/// HTTP client that decorates requests with the CSRF token and recovers
/// from an expired session by refreshing it and replaying the request once.
#[derive(Debug)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Transport,
    interceptor: RequestInterceptor,
    csrf: Arc<CsrfCache>,
    profile: ProfileCache,
    coordinator: RefreshCoordinator,
    teardown: SessionTeardown,
    routes: PublicRoutes,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    /// Client with all default collaborators.
    pub fn new(config: ClientConfig) -> Result<Self, BuildError> {
        ApiClientBuilder::new(config).build()
    }

    /// Send `request`, recovering once from an expired session.
    ///
    /// Every terminal failure returns the error the request itself produced,
    /// so callers handle errors as if this layer were not there.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let error = match self.dispatch(&request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        let failure = classify(&error, &request, &self.config.endpoints.refresh);
        if failure != Failure::AuthExpired {
            tracing::debug!(
                method = %request.method(),
                path = %request.path(),
                failure = failure.as_str(),
                "Request failed; propagating"
            );
            return Err(error);
        }

        let request = request.mark_retried();
        let location = self.navigator.current_path();
        if self.routes.is_public(&location) {
            tracing::debug!(
                location = %location,
                path = %request.path(),
                "Auth failure on public location; not refreshing"
            );
            return Err(error);
        }

        if self.coordinator.request_refresh().await {
            tracing::info!(method = %request.method(), path = %request.path(), "Replaying request after session refresh");
            metrics::record_replay();
            self.dispatch(&request).await
        } else {
            if self.teardown.run() == TeardownOutcome::RedirectScheduled {
                tracing::info!(location = %location, "Login redirect scheduled");
            }
            Err(error)
        }
    }

    pub async fn get(&self, path: &str) -> ApiResult<ApiResponse> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ApiResult<ApiResponse> {
        self.send(ApiRequest::post(path).with_json(body)?).await
    }

    pub async fn put<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ApiResult<ApiResponse> {
        self.send(ApiRequest::put(path).with_json(body)?).await
    }

    pub async fn patch<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ApiResult<ApiResponse> {
        self.send(ApiRequest::patch(path).with_json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.send(ApiRequest::delete(path)).await
    }

    /// Return the cached CSRF token, fetching it once if none is cached.
    pub async fn fetch_csrf_token(&self) -> CsrfFetch {
        self.csrf
            .fetch_if_absent(&self.transport, &self.config.endpoints.csrf)
            .await
    }

    /// Renew the session without teardown or redirect on denial.
    ///
    /// Goes through the same coordinator as request recovery, so it is
    /// single-flight and throttled along with every other renewal.
    pub async fn refresh_session(&self) -> bool {
        self.coordinator.request_refresh().await
    }

    /// Log out: best-effort server logout, clear local state and, when
    /// `redirect` is set, go to the login page.
    pub async fn logout(&self, redirect: bool) {
        self.teardown.logout(redirect).await;
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn csrf(&self) -> &CsrfCache {
        &self.csrf
    }

    pub fn profile(&self) -> &ProfileCache {
        &self.profile
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn routes(&self) -> &PublicRoutes {
        &self.routes
    }

    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    async fn dispatch(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let request_id = Uuid::new_v4();
        let mut headers = self.interceptor.headers_for(request);
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            headers.insert(X_REQUEST_ID, value);
        }

        let start = Instant::now();
        let result = self
            .transport
            .send(request.method().clone(), request.path(), headers, request.body())
            .await;

        let status = match &result {
            Ok(response) => response.status().as_str().to_string(),
            Err(e) => e
                .status()
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| "error".to_string()),
        };
        metrics::record_request(request.method(), &status, start);
        tracing::debug!(
            request_id = %request_id,
            method = %request.method(),
            path = %request.path(),
            status = %status,
            retried = request.is_retried(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );

        result
    }
}
