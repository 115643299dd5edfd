//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the authenticated HTTP client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL and transport timeouts.
    pub api: ApiConfig,

    /// Relative paths of the session and auth endpoints.
    pub endpoints: EndpointConfig,

    /// Refresh throttling, redirect grace and keep-alive.
    pub session: SessionConfig,

    /// Navigation paths that never force a login redirect.
    pub routes: RouteConfig,

    /// Durable session storage.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Backend connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is resolved against. Must end in `/`.
    pub base_url: String,

    /// Total time for a single request/response in seconds.
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/auth/".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
            system_proxy: true,
        }
    }
}

/// Endpoint paths, relative to `api.base_url`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub csrf: String,
    pub refresh: String,
    pub logout: String,
    pub login: String,
    pub google_login: String,
    pub register: String,
    pub profile: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            csrf: "csrf/".to_string(),
            refresh: "token/refresh/".to_string(),
            logout: "logout/".to_string(),
            login: "login/".to_string(),
            google_login: "login/google/".to_string(),
            register: "register/".to_string(),
            profile: "profile/".to_string(),
        }
    }
}

/// Session renewal configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minimum interval between the starts of two refresh calls, in milliseconds.
    pub throttle_window_ms: u64,

    /// Delay before the post-denial redirect to the login page, in milliseconds.
    pub redirect_grace_ms: u64,

    /// Run a periodic silent refresh in the background.
    pub keepalive_enabled: bool,

    /// Keep-alive period in seconds.
    pub keepalive_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            throttle_window_ms: 10_000,
            redirect_grace_ms: 100,
            keepalive_enabled: false,
            keepalive_interval_secs: 50 * 60,
        }
    }
}

/// Navigation route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Login page location; redirect target after an escalated denial.
    pub login_path: String,

    /// Any location under this prefix is public, whatever follows it.
    pub reset_password_prefix: String,

    /// Ordered public path prefixes.
    pub public: Vec<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            reset_password_prefix: "/reset-password".to_string(),
            public: [
                "/login",
                "/register",
                "/forgot-password",
                "/reset-password",
                "/unauthorized",
                "/doctors",
                "/payment-success",
                "/payment-cancel",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
        }
    }
}

/// Durable session storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the CSRF token and cached profile. In-memory when unset.
    pub path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
