//! Cached user profile.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::store::{SessionStore, StoreError};

/// Store key of the cached profile blob.
pub const PROFILE_STORE_KEY: &str = "userData";

/// Profile of the signed-in user as returned by login, refresh and `profile/`.
///
/// Only the fields this layer reads are typed; everything else the backend
/// sends is kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Durable cache for the user profile blob.
#[derive(Debug, Clone)]
pub struct ProfileCache {
    store: Arc<dyn SessionStore>,
}

impl ProfileCache {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Read the cached profile. An unparsable blob is discarded.
    pub fn get(&self) -> Option<UserProfile> {
        let raw = self.store.get(PROFILE_STORE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unparsable cached profile");
                self.clear();
                None
            }
        }
    }

    /// Cache a profile exactly as the server sent it.
    pub fn set(&self, profile: &Value) -> Result<(), StoreError> {
        self.store
            .set(PROFILE_STORE_KEY, serde_json::to_string(profile)?)
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(PROFILE_STORE_KEY) {
            tracing::warn!(error = %e, "Failed to remove cached profile");
        }
    }
}
