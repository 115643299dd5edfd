//! Navigation routing subsystem.
//!
//! # Data Flow
//! ```text
//! Failed request (401/403)
//!     → navigator.rs (current navigation location)
//!     → public.rs (is the location public?)
//!     → public: propagate error, no refresh, no redirect
//!     → protected: refresh / teardown, redirect through navigator.rs
//! ```
//!
//! # Design Decisions
//! - Public prefixes loaded from config at startup, immutable at runtime
//! - Prefix matching only, no patterns
//! - Navigation is an injected capability so classification and redirects
//!   are deterministic under a simulated location

pub mod navigator;
pub mod public;

pub use navigator::{HeadlessNavigator, Navigator};
pub use public::PublicRoutes;
