//! Authenticated HTTP client for the clinic dashboard backend.
//!
//! Attaches the CSRF token to mutating requests and recovers from an expired
//! session by refreshing it once, however many requests fail together.

pub mod auth;
pub mod config;
pub mod http;
pub mod observability;
pub mod routing;
pub mod session;

pub use auth::AuthService;
pub use config::ClientConfig;
pub use http::{ApiClient, ApiClientBuilder, ApiError, ApiRequest, ApiResponse, ApiResult};
pub use routing::{HeadlessNavigator, Navigator, PublicRoutes};
pub use session::{RefreshCoordinator, SessionStore};
