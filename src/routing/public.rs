//! Public-route classification.
//!
//! # Responsibilities
//! - Decide whether a navigation location may run without a session
//! - Recognise the login page itself
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A location equal to or starting with any public prefix is public
//! - Reset-password locations are always public: their tokens are consumed
//!   before the user has a session

use crate::config::RouteConfig;

/// Ordered set of navigation prefixes that must never force a login redirect.
#[derive(Debug, Clone)]
pub struct PublicRoutes {
    prefixes: Vec<String>,
    reset_prefix: String,
    login_path: String,
}

impl PublicRoutes {
    pub fn new(
        prefixes: impl IntoIterator<Item = impl Into<String>>,
        reset_prefix: impl Into<String>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            reset_prefix: reset_prefix.into(),
            login_path: login_path.into(),
        }
    }

    pub fn from_config(config: &RouteConfig) -> Self {
        Self::new(
            config.public.iter().cloned(),
            config.reset_password_prefix.clone(),
            config.login_path.clone(),
        )
    }

    /// True if `path` is a public location.
    pub fn is_public(&self, path: &str) -> bool {
        if !self.reset_prefix.is_empty() && path.starts_with(&self.reset_prefix) {
            return true;
        }
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// True if `path` is the login page (or below it).
    pub fn is_login(&self, path: &str) -> bool {
        path.starts_with(&self.login_path)
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }
}

impl Default for PublicRoutes {
    fn default() -> Self {
        Self::from_config(&RouteConfig::default())
    }
}
