//! Error types for the `shoplens` crate.

use thiserror::Error;

/// Errors that can occur in indexing, retrieval, and caching operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation requiring a fitted vectorizer was attempted before any
    /// successful build. Always recoverable: callers signal "unavailable"
    /// instead of failing the process.
    #[error("vectorizer is not fitted; build an index first")]
    NotFitted,

    /// An id was not present in the index. Query paths translate this into
    /// an empty result rather than surfacing it to the caller.
    #[error("unknown {kind}: {id}")]
    UnknownEntity {
        /// The kind of entity that was looked up (e.g. `item`, `chunk`).
        kind: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// The corpus was empty or entirely unindexable. Surfaced to the build
    /// caller as a hard failure; no manifest is published.
    #[error("index build failed: {0}")]
    Build(String),

    /// An index artifact could not be read or written. The affected query
    /// degrades to "unavailable"; other index kinds remain operable.
    #[error("storage error at '{location}': {message}")]
    Storage {
        /// The artifact location that failed.
        location: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A cache backend failure. Query paths treat this as a cache miss.
    #[error("cache error: {0}")]
    Cache(String),
}

/// A convenience result type for shoplens operations.
pub type Result<T> = std::result::Result<T, Error>;
