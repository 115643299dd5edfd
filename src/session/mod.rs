//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! store.rs (durable key-value slots: csrftoken, userData)
//!     → csrf.rs (token cache, fetched once)
//!     → profile.rs (cached user profile)
//!
//! Failed request (AuthExpired, protected location)
//!     → coordinator.rs (single-flight, throttled renewal)
//!         → refresh.rs (one POST token/refresh/)
//!     → granted: caller replays its request
//!     → denied: teardown.rs (clear state, spawned logout call, delayed redirect)
//!
//! keepalive.rs (optional periodic silent refresh)
//! ```
//!
//! # Design Decisions
//! - Refresh state lives in one coordinator owned by the client, never in globals
//! - Waiters are one-shot channels drained in a single pass on settlement
//! - Store writes are best-effort: failures are logged, never surfaced to requests

pub mod coordinator;
pub mod csrf;
pub mod keepalive;
pub mod profile;
pub mod refresh;
pub mod store;
pub mod teardown;

pub use coordinator::{RefreshCoordinator, RefreshDenial};
pub use csrf::{CsrfCache, CsrfFetch, CSRF_STORE_KEY};
pub use keepalive::{KeepAlive, KeepAliveHandle};
pub use profile::{ProfileCache, UserProfile, PROFILE_STORE_KEY};
pub use refresh::{HttpRefreshEndpoint, RefreshEndpoint, RefreshGrant};
pub use store::{FileStore, MemoryStore, SessionStore, StoreError};
pub use teardown::{SessionTeardown, TeardownOutcome};
