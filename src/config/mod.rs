//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → consumed once by ApiClientBuilder
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the public route set lives for the process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ApiConfig, ClientConfig, EndpointConfig, ObservabilityConfig, RouteConfig, SessionConfig,
    StorageConfig,
};
pub use validation::ValidationError;
