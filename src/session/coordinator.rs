//! Single-flight, throttled session renewal.
//!
//! # Algorithm
//! ```text
//! request_refresh():
//!     in flight?                  → park on a oneshot, return the flight's outcome
//!     last start < window ago?    → deny (throttled), no network call
//!     otherwise                   → mark in flight, record start, call endpoint once
//!                                   settle: clear in flight, fan outcome out to
//!                                   every parked waiter, cache profile if sent
//! ```
//!
//! # Invariants
//! - At most one refresh call is outstanding at any instant
//! - No two refresh calls start less than `throttle_window` apart
//! - Every waiter parked during a flight observes that flight's outcome
//!
//! The state lock is never held across an await point.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::session::profile::ProfileCache;
use crate::session::refresh::{RefreshEndpoint, RefreshGrant};

/// Why a renewal demand was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDenial {
    /// Demanded inside the throttle window; no network call made.
    Throttled,
    /// The renewal call failed or the server rejected it.
    Rejected,
}

#[derive(Debug, Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<bool>>,
    last_attempt_at: Option<Instant>,
}

/// Grants or denies session renewal for every request of one client.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    endpoint: Arc<dyn RefreshEndpoint>,
    profile: ProfileCache,
    throttle_window: Duration,
}

impl RefreshCoordinator {
    pub fn new(
        endpoint: Arc<dyn RefreshEndpoint>,
        profile: ProfileCache,
        throttle_window: Duration,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            endpoint,
            profile,
            throttle_window,
        }
    }

    /// Ask for a renewed session.
    ///
    /// Returns true when the session was renewed and a request may be
    /// retried, false when renewal was denied or throttled.
    pub async fn request_refresh(&self) -> bool {
        self.renew().await.is_ok()
    }

    /// Like [`request_refresh`](Self::request_refresh), but reports why a
    /// renewal was denied.
    pub async fn renew(&self) -> Result<(), RefreshDenial> {
        let waiter = {
            let mut state = self.state.lock().expect("refresh state mutex poisoned");
            let now = Instant::now();

            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                tracing::debug!(waiters = state.waiters.len(), "Refresh in flight; waiting for its outcome");
                metrics::record_refresh("joined");
                Some(rx)
            } else if state
                .last_attempt_at
                .is_some_and(|last| now.duration_since(last) < self.throttle_window)
            {
                tracing::info!(
                    window_ms = self.throttle_window.as_millis() as u64,
                    "Token refresh throttled"
                );
                metrics::record_refresh("throttled");
                return Err(RefreshDenial::Throttled);
            } else {
                state.in_flight = true;
                state.last_attempt_at = Some(now);
                None
            }
        };

        if let Some(rx) = waiter {
            // A dropped sender means the flight was abandoned
            return match rx.await {
                Ok(true) => Ok(()),
                Ok(false) | Err(_) => Err(RefreshDenial::Rejected),
            };
        }

        let flight = Flight {
            coordinator: self,
            settled: false,
        };

        tracing::info!("Attempting token refresh");
        let outcome = match self.endpoint.refresh().await {
            Ok(grant) => {
                tracing::info!("Token refresh successful");
                self.cache_profile(grant);
                metrics::record_refresh("renewed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                metrics::record_refresh("rejected");
                false
            }
        };

        flight.settle(outcome);
        if outcome {
            Ok(())
        } else {
            Err(RefreshDenial::Rejected)
        }
    }

    /// True while a renewal call is outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.state
            .lock()
            .expect("refresh state mutex poisoned")
            .in_flight
    }

    fn cache_profile(&self, grant: RefreshGrant) {
        if let Some(user) = grant.user {
            if let Err(e) = self.profile.set(&user) {
                tracing::warn!(error = %e, "Failed to cache refreshed profile");
            }
        }
    }

    fn settle(&self, outcome: bool) {
        let waiters = {
            let mut state = self.state.lock().expect("refresh state mutex poisoned");
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        if !waiters.is_empty() {
            tracing::debug!(waiters = waiters.len(), outcome, "Releasing refresh waiters");
        }
        for waiter in waiters {
            // Receiver gone means that caller stopped waiting
            let _ = waiter.send(outcome);
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("throttle_window", &self.throttle_window)
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

/// Settles the in-flight refresh exactly once, including when the leading
/// caller's future is dropped before the network call completes.
struct Flight<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl Flight<'_> {
    fn settle(mut self, outcome: bool) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Refresh abandoned before completion; denying waiters");
            self.coordinator.settle(false);
        }
    }
}
