//! Session teardown.
//!
//! # Escalation
//! ```text
//! run():
//!     redirect already pending? → nothing to do
//!     clear CSRF token + cached profile
//!     spawn POST logout/        (result discarded, never awaited)
//!     on login page?            → done, no redirect
//!     otherwise                 → redirect to login after the grace delay
//! ```
//!
//! A failure burst releases many callers at once. Only the first of them
//! tears the session down and schedules the redirect; the rest see the
//! pending redirect and return.
//!
//! `run` never suspends, so a caller that gives up cannot leave the pending
//! flag set with local state still in place.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::http::request::{ApiRequest, RequestInterceptor};
use crate::http::transport::Transport;
use crate::observability::metrics;
use crate::routing::{Navigator, PublicRoutes};
use crate::session::csrf::CsrfCache;
use crate::session::profile::ProfileCache;

/// What a call to [`SessionTeardown::run`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// Local state cleared and a redirect to the login page scheduled.
    RedirectScheduled,
    /// Local state cleared; already on the login page so no redirect.
    AlreadyAtLogin,
    /// Another teardown already scheduled the redirect.
    AlreadyPending,
}

/// Clears session state and sends the user back to the login page.
#[derive(Debug, Clone)]
pub struct SessionTeardown {
    transport: Transport,
    interceptor: RequestInterceptor,
    csrf: Arc<CsrfCache>,
    profile: ProfileCache,
    navigator: Arc<dyn Navigator>,
    routes: PublicRoutes,
    logout_path: String,
    grace: Duration,
    redirect_pending: Arc<AtomicBool>,
}

impl SessionTeardown {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: Transport,
        csrf: Arc<CsrfCache>,
        profile: ProfileCache,
        navigator: Arc<dyn Navigator>,
        routes: PublicRoutes,
        logout_path: impl Into<String>,
        grace: Duration,
    ) -> Self {
        Self {
            transport,
            interceptor: RequestInterceptor::new(csrf.clone()),
            csrf,
            profile,
            navigator,
            routes,
            logout_path: logout_path.into(),
            grace,
            redirect_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Tear the session down after a denied renewal.
    ///
    /// Must be called from within a Tokio runtime: the logout call and the
    /// delayed redirect run as spawned tasks.
    pub fn run(&self) -> TeardownOutcome {
        if self.redirect_pending.swap(true, Ordering::AcqRel) {
            tracing::debug!("Teardown already in progress");
            return TeardownOutcome::AlreadyPending;
        }

        tracing::warn!(path = %self.navigator.current_path(), "Session renewal denied; tearing down session");
        metrics::record_teardown("escalated");

        // Headers are built while the CSRF token is still cached
        let logout = self.server_logout();
        self.clear_local_state();
        tokio::spawn(logout);

        if self.routes.is_login(&self.navigator.current_path()) {
            self.redirect_pending.store(false, Ordering::Release);
            return TeardownOutcome::AlreadyAtLogin;
        }

        let navigator = self.navigator.clone();
        let pending = self.redirect_pending.clone();
        let login = self.routes.login_path().to_string();
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if !navigator.current_path().starts_with(&login) {
                navigator.redirect_to(&login);
            }
            pending.store(false, Ordering::Release);
        });

        TeardownOutcome::RedirectScheduled
    }

    /// User-initiated logout. Local state is cleared before the server call
    /// is awaited; redirects once it settles when `redirect` is set and the
    /// user is not already on the login page.
    pub async fn logout(&self, redirect: bool) {
        metrics::record_teardown("logout");

        let logout = self.server_logout();
        self.clear_local_state();
        logout.await;
        tracing::info!("Logged out");

        let current = self.navigator.current_path();
        if redirect && !self.routes.is_login(&current) {
            self.navigator.redirect_to(self.routes.login_path());
        }
    }

    /// Best-effort server-side logout. The result is discarded: a failed
    /// call must never block clearing local state.
    pub async fn invalidate_server_session(&self) {
        self.server_logout().await;
    }

    fn server_logout(&self) -> impl Future<Output = ()> + Send + 'static {
        let request = ApiRequest::post(self.logout_path.as_str());
        let headers = self.interceptor.headers_for(&request);
        let transport = self.transport.clone();

        async move {
            match transport
                .send(request.method().clone(), request.path(), headers, None)
                .await
            {
                Ok(_) => tracing::debug!("Server session invalidated"),
                Err(e) => tracing::info!(error = %e, "Logout call failed; local state already cleared"),
            }
        }
    }

    /// Drop the CSRF token and the cached profile.
    pub fn clear_local_state(&self) {
        self.csrf.clear();
        self.profile.clear();
    }

    /// True while a post-denial redirect is scheduled but not yet performed.
    pub fn is_redirect_pending(&self) -> bool {
        self.redirect_pending.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::routing::HeadlessNavigator;
    use crate::session::store::{MemoryStore, SessionStore};
    use crate::session::{CSRF_STORE_KEY, PROFILE_STORE_KEY};
    use serde_json::json;
    use tokio::net::TcpListener;

    struct Fixture {
        teardown: SessionTeardown,
        navigator: Arc<HeadlessNavigator>,
        store: Arc<MemoryStore>,
        csrf: Arc<CsrfCache>,
    }

    // Logout calls go to a closed port and fail fast
    fn fixture(path: &str) -> Fixture {
        fixture_at("http://127.0.0.1:1/auth/", path)
    }

    fn fixture_at(base_url: &str, path: &str) -> Fixture {
        let config = ApiConfig {
            base_url: base_url.into(),
            connect_timeout_secs: 1,
            system_proxy: false,
            ..ApiConfig::default()
        };
        let store = Arc::new(MemoryStore::new());
        let csrf = Arc::new(CsrfCache::new(store.clone()));
        let profile = ProfileCache::new(store.clone());
        let navigator = Arc::new(HeadlessNavigator::new(path));

        csrf.set("tok");
        profile.set(&json!({"id": 1})).unwrap();

        let teardown = SessionTeardown::new(
            Transport::new(&config).unwrap(),
            csrf.clone(),
            profile,
            navigator.clone(),
            PublicRoutes::default(),
            "logout/",
            Duration::from_millis(20),
        );

        Fixture {
            teardown,
            navigator,
            store,
            csrf,
        }
    }

    #[tokio::test]
    async fn test_run_clears_state_and_redirects_after_grace() {
        let f = fixture("/dashboard");

        assert_eq!(f.teardown.run(), TeardownOutcome::RedirectScheduled);
        assert!(f.csrf.get().is_none());
        assert!(f.store.get(CSRF_STORE_KEY).is_none());
        assert!(f.store.get(PROFILE_STORE_KEY).is_none());

        // Not yet: redirect waits out the grace delay
        assert!(f.navigator.redirects().is_empty());
        assert!(f.teardown.is_redirect_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(f.navigator.redirects(), vec!["/login".to_string()]);
        assert!(!f.teardown.is_redirect_pending());
    }

    #[tokio::test]
    async fn test_burst_schedules_one_redirect() {
        let f = fixture("/patient/appointments");

        let outcomes: Vec<_> = (0..3).map(|_| f.teardown.run()).collect();
        let scheduled = outcomes
            .iter()
            .filter(|o| **o == TeardownOutcome::RedirectScheduled)
            .count();
        assert_eq!(scheduled, 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == TeardownOutcome::AlreadyPending)
                .count(),
            2
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(f.navigator.redirects().len(), 1);
    }

    #[tokio::test]
    async fn test_on_login_page_clears_without_redirect() {
        let f = fixture("/login");

        assert_eq!(f.teardown.run(), TeardownOutcome::AlreadyAtLogin);
        assert!(f.csrf.get().is_none());
        assert!(!f.teardown.is_redirect_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(f.navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_logout_redirects_immediately() {
        let f = fixture("/doctor/schedule");

        f.teardown.logout(true).await;
        assert!(f.csrf.get().is_none());
        assert_eq!(f.navigator.redirects(), vec!["/login".to_string()]);
    }

    #[tokio::test]
    async fn test_logout_without_redirect() {
        let f = fixture("/doctor/schedule");

        f.teardown.logout(false).await;
        assert!(f.store.get(PROFILE_STORE_KEY).is_none());
        assert!(f.navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_unanswered_logout_does_not_block_teardown() {
        // Accepts connections and never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let f = fixture_at(&format!("http://{addr}/auth/"), "/dashboard");

        let first = tokio::time::timeout(Duration::from_millis(50), async { f.teardown.run() })
            .await
            .unwrap();
        assert_eq!(first, TeardownOutcome::RedirectScheduled);
        assert!(f.csrf.get().is_none());
        assert!(f.store.get(PROFILE_STORE_KEY).is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(f.navigator.redirects(), vec!["/login".to_string()]);
        assert!(!f.teardown.is_redirect_pending());

        // A later expiry tears down again
        f.navigator.set_path("/dashboard");
        f.csrf.set("tok-2");
        assert_eq!(f.teardown.run(), TeardownOutcome::RedirectScheduled);
        assert!(f.csrf.get().is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(f.navigator.redirects().len(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_logout_still_clears_state() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let f = fixture_at(&format!("http://{addr}/auth/"), "/doctor/schedule");

        let result =
            tokio::time::timeout(Duration::from_millis(50), f.teardown.logout(true)).await;
        assert!(result.is_err());
        assert!(f.csrf.get().is_none());
        assert!(f.store.get(PROFILE_STORE_KEY).is_none());
    }
}
