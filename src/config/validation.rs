//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, throttle window > 0)
//! - Check that the base URL can anchor relative endpoint paths
//! - Check that route prefixes are absolute navigation paths
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the client

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("api.base_url '{0}' is not an absolute http(s) URL")]
    InvalidBaseUrl(String),

    #[error("api.base_url '{0}' must end with '/'")]
    BaseUrlMissingTrailingSlash(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("endpoints.{0} must not be empty")]
    EmptyEndpoint(&'static str),

    #[error("route '{0}' must start with '/'")]
    RelativeRoute(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.api.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            if !url.path().ends_with('/') {
                errors.push(ValidationError::BaseUrlMissingTrailingSlash(
                    config.api.base_url.clone(),
                ));
            }
        }
        _ => errors.push(ValidationError::InvalidBaseUrl(config.api.base_url.clone())),
    }

    if config.api.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration("api.request_timeout_secs"));
    }
    if config.api.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration("api.connect_timeout_secs"));
    }
    if config.session.throttle_window_ms == 0 {
        errors.push(ValidationError::ZeroDuration("session.throttle_window_ms"));
    }
    if config.session.keepalive_enabled && config.session.keepalive_interval_secs == 0 {
        errors.push(ValidationError::ZeroDuration("session.keepalive_interval_secs"));
    }

    let endpoints = &config.endpoints;
    for (name, path) in [
        ("csrf", &endpoints.csrf),
        ("refresh", &endpoints.refresh),
        ("logout", &endpoints.logout),
        ("login", &endpoints.login),
        ("google_login", &endpoints.google_login),
        ("register", &endpoints.register),
        ("profile", &endpoints.profile),
    ] {
        if path.trim_matches('/').is_empty() {
            errors.push(ValidationError::EmptyEndpoint(name));
        }
    }

    let routes = &config.routes;
    for route in std::iter::once(&routes.login_path)
        .chain(std::iter::once(&routes.reset_password_prefix))
        .chain(routes.public.iter())
    {
        if !route.starts_with('/') {
            errors.push(ValidationError::RelativeRoute(route.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
