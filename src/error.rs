//! Crate-level error types
//!
//! Each subsystem defines its own error enum close to the code that raises
//! it; this module re-exports them and provides a top-level `Error` for
//! callers that drive several subsystems at once.

use thiserror::Error;

pub use crate::cache::CacheError;
pub use crate::client::ClientError;
pub use crate::stream::TransportError;

/// Convenience result type for crate-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error covering every subsystem
#[derive(Debug, Error)]
pub enum Error {
    /// Push-update transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// HTTP API call failure
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Artifact cache failure
    #[error(transparent)]
    Cache(#[from] CacheError),
}
