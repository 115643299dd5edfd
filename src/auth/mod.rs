//! Authentication facade.
//!
//! # Data Flow
//! ```text
//! login / google_login / register
//!     → ensure CSRF token (fetched once, failure tolerated)
//!     → POST credentials through ApiClient
//!     → cache returned profile
//!
//! initialize
//!     → CSRF token → restore cached profile → silent refresh → fetch profile
//! ```

pub mod service;
pub mod types;

pub use service::AuthService;
pub use types::{AuthError, LoginOutcome, RegisterRequest};
