//! Read-through artifact cache
//!
//! Artifacts (photographic evidence attached to accepted reports) are
//! immutable server-side, so they are fetched at most once: a cache miss
//! fetches from the remote source, stores the body verbatim under its
//! server-issued key, and every later access is served locally.
//!
//! The local blob store is namespaced by a versioned store name
//! (`{prefix}-v{N}`); bumping the version on an incompatible schema change
//! strands the old entries, and [`ArtifactCache::prune`] deletes every
//! store that does not carry the current tag.

pub mod artifact;
pub mod store;

pub use artifact::{ArtifactCache, ArtifactFetcher, CacheConfig};
pub use store::{BlobStore, CacheError, MemoryStore};
