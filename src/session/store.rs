//! Durable key-value storage for session state.
//!
//! Holds the CSRF token and the cached user profile across restarts, the
//! way a browser keeps them in local storage.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

/// Errors from durable store writes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A process-wide key-value slot store.
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store; contents are lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.inner.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key);
        Ok(())
    }
}

/// Store persisted to a JSON object on disk after every write.
#[derive(Debug)]
pub struct FileStore {
    inner: DashMap<String, String>,
    path: PathBuf,
}

impl FileStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let inner = DashMap::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let map: HashMap<String, String> = serde_json::from_reader(reader)?;
            for (k, v) in map {
                inner.insert(k, v);
            }
            tracing::debug!(path = %path.display(), entries = inner.len(), "Loaded session store");
        }

        Ok(Self { inner, path })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let map: HashMap<_, _> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(writer, &map)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.inner.insert(key.to_string(), value);
        self.persist()
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.inner.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}
