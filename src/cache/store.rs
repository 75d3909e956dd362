//! Local blob store seam
//!
//! The backing store is an external collaborator (browser cache API,
//! on-disk directory, embedded KV store). [`MemoryStore`] is the built-in
//! process-lifetime implementation, also used by tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::client::ClientError;

/// Artifact cache failure
#[derive(Debug, Error)]
pub enum CacheError {
    /// The local blob store misbehaved
    #[error("blob store failure: {0}")]
    Store(String),

    /// The remote fetch on a cache miss failed
    ///
    /// Propagated to the `get` caller, who decides whether to retry or
    /// show an error.
    #[error("artifact fetch failed: {0}")]
    Fetch(#[from] ClientError),
}

/// Versioned key/value blob store
///
/// Keys are opaque, externally assigned strings. Entries are immutable:
/// a `put` for an existing key must keep the original value. Writes for
/// different keys never conflict.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Look up a key in a named store
    ///
    /// `Ok(None)` means the entry is absent, which is distinct from an
    /// entry holding an empty value.
    async fn get(&self, store: &str, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Write a value unless the key already holds one
    async fn put(&self, store: &str, key: &str, value: Bytes) -> Result<(), CacheError>;

    /// Names of every store currently present
    async fn store_names(&self) -> Result<Vec<String>, CacheError>;

    /// Delete a whole store and all its entries
    async fn delete_store(&self, store: &str) -> Result<(), CacheError>;
}

/// In-memory blob store
///
/// Lives for the process lifetime; shared across cache instances via
/// `Arc`.
pub struct MemoryStore {
    stores: RwLock<HashMap<String, HashMap<String, Bytes>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, store: &str, key: &str) -> Result<Option<Bytes>, CacheError> {
        let stores = self.stores.read().unwrap();
        Ok(stores.get(store).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, store: &str, key: &str, value: Bytes) -> Result<(), CacheError> {
        let mut stores = self.stores.write().unwrap();
        stores
            .entry(store.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert(value);
        Ok(())
    }

    async fn store_names(&self) -> Result<Vec<String>, CacheError> {
        let stores = self.stores.read().unwrap();
        Ok(stores.keys().cloned().collect())
    }

    async fn delete_store(&self, store: &str) -> Result<(), CacheError> {
        let mut stores = self.stores.write().unwrap();
        stores.remove(store);
        Ok(())
    }
}
