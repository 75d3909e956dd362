//! Read-through cache implementation

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::client::ClientError;

use super::store::{BlobStore, CacheError};

/// Artifact cache options
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Store name prefix
    pub prefix: String,

    /// Schema version embedded in the store name
    ///
    /// Bump this when the artifact format changes incompatibly; `prune`
    /// then removes the stores of every other version.
    pub version: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: "artifacts".to_string(),
            version: 1,
        }
    }
}

impl CacheConfig {
    /// Set the store name prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the schema version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Derived store name carrying the version tag
    pub fn store_name(&self) -> String {
        format!("{}-v{}", self.prefix, self.version)
    }
}

/// Remote source of artifact bodies
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetch the artifact body for a server-issued key
    async fn fetch(&self, key: &str) -> Result<Bytes, ClientError>;
}

/// Read-through artifact cache
///
/// `get` serves from the local store when possible and fetches/stores on a
/// miss. Concurrent first-time `get`s for one key are single-flighted
/// through a per-key lock, so each key is fetched at most once even under
/// races.
pub struct ArtifactCache {
    store: Arc<dyn BlobStore>,
    fetcher: Arc<dyn ArtifactFetcher>,
    config: CacheConfig,

    /// Per-key locks for in-flight first-time fetches
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ArtifactCache {
    /// Create a cache over a blob store and a remote fetcher
    pub fn new(
        store: Arc<dyn BlobStore>,
        fetcher: Arc<dyn ArtifactFetcher>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            config,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Get an artifact, fetching and storing it on first access
    ///
    /// A key already in the store is never re-fetched. Fetch failures
    /// propagate to the caller and leave the store untouched, so the next
    /// `get` retries.
    pub async fn get(&self, key: &str) -> Result<Bytes, CacheError> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        let result = {
            let _guard = lock.lock().await;
            self.get_locked(key).await
        };

        // Drop the per-key lock once no other caller holds it; the map only
        // tracks keys with a fetch actually in flight.
        {
            let mut inflight = self.inflight.lock().await;
            if let Some(entry) = inflight.get(key) {
                if Arc::strong_count(entry) == 2 {
                    inflight.remove(key);
                }
            }
        }

        result
    }

    async fn get_locked(&self, key: &str) -> Result<Bytes, CacheError> {
        let store_name = self.config.store_name();

        if let Some(body) = self.store.get(&store_name, key).await? {
            tracing::debug!(key = %key, "Artifact served from cache");
            return Ok(body);
        }

        tracing::debug!(key = %key, "Artifact not cached - fetching");
        let body = self.fetcher.fetch(key).await?;
        self.store.put(&store_name, key, body.clone()).await?;

        Ok(body)
    }

    /// Delete every store from another schema version
    ///
    /// Called on store-version changes; the current store is kept intact.
    pub async fn prune(&self) -> Result<(), CacheError> {
        let current = self.config.store_name();

        for name in self.store.store_names().await? {
            if name != current {
                tracing::info!(store = %name, "Deleting out of date cache store");
                self.store.delete_store(&name).await?;
            }
        }

        Ok(())
    }
}
