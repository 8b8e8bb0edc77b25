//! Error types for catalog persistence.

use thiserror::Error;

/// Errors that can occur while writing or reading a catalog.
///
/// A catalog that cannot be *trusted* is not an error: loaders report that as
/// a [`CacheMiss`](crate::CacheMiss).
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Injected write failure (in-memory store only).
    #[error("store is read-only")]
    ReadOnly,
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
