//! Navigation capability.
//!
//! The client never assumes a global location: it reads the current path and
//! issues redirects only through a [`Navigator`].

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

/// Access to the application's navigation location.
pub trait Navigator: Send + Sync + std::fmt::Debug {
    /// Current navigation path, e.g. `/dashboard`.
    fn current_path(&self) -> String;

    /// Navigate to `path`.
    fn redirect_to(&self, path: &str);
}

/// Navigator for processes with no real location: a CLI, a daemon, a test.
///
/// Holds a simulated path and records every redirect it is asked to perform.
/// A redirect also moves the simulated location.
#[derive(Debug)]
pub struct HeadlessNavigator {
    path: ArcSwap<String>,
    redirects: Mutex<Vec<String>>,
}

impl HeadlessNavigator {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: ArcSwap::from_pointee(path.into()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    pub fn set_path(&self, path: impl Into<String>) {
        self.path.store(Arc::new(path.into()));
    }

    /// Every redirect performed so far, oldest first.
    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .expect("navigator mutex poisoned")
            .clone()
    }
}

impl Default for HeadlessNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for HeadlessNavigator {
    fn current_path(&self) -> String {
        self.path.load().as_ref().clone()
    }

    fn redirect_to(&self, path: &str) {
        tracing::info!(from = %self.path.load(), to = %path, "Redirecting");
        self.redirects
            .lock()
            .expect("navigator mutex poisoned")
            .push(path.to_string());
        self.set_path(path);
    }
}
