//! Cache error types
//!
//! Configuration problems never show up here: an unknown provider tag is
//! absorbed by the registry, which falls back to the in-process backend.

use thiserror::Error;

/// Errors surfaced by cache providers
#[derive(Debug, Error)]
pub enum CacheError {
    /// The distributed backend has no connection target
    #[error("cache backend '{backend}' is not configured (missing connection target)")]
    NotConfigured { backend: &'static str },

    /// The backend was closed and is now inert
    #[error("cache backend '{backend}' has been closed")]
    Closed { backend: &'static str },

    /// Client creation or connection establishment failed
    #[cfg(feature = "redis")]
    #[error("failed to connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: redis::RedisError,
    },

    /// A command sent to the external store failed
    #[cfg(feature = "redis")]
    #[error("redis {command} failed: {source}")]
    Command {
        command: &'static str,
        #[source]
        source: redis::RedisError,
    },

    /// A value could not be encoded for storage
    #[error("failed to serialize value for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// A glob pattern could not be compiled
    #[error("invalid key pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result alias used across the crate
pub type Result<T, E = CacheError> = std::result::Result<T, E>;
