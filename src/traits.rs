//! Cache Provider Traits
//!
//! This module defines the contract every cache backend implements, the
//! optional pattern-deletion capability, and the pluggable value codec used
//! by backends that must serialize across a network boundary.
//!
//! # Architecture
//!
//! - `CacheProvider`: Core contract shared by every backend
//! - `PatternDelete`: Optional bulk invalidation by glob pattern
//! - `CacheProviderExt`: Compute-on-miss helper available on every provider
//! - `CacheCodec`: Value serialization for distributed backends
//!
//! # Example: Custom Backend
//!
//! ```rust,ignore
//! use cache_providers::{CacheProvider, Result, async_trait};
//! use std::time::Duration;
//!
//! struct MyCustomCache {
//!     // Your implementation
//! }
//!
//! #[async_trait]
//! impl CacheProvider for MyCustomCache {
//!     async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
//!         // Your implementation
//!     }
//!
//!     // ... set, delete, exists, clear, ttl, is_configured, close
//! }
//! ```

use crate::error::{CacheError, Result};
use anyhow::Result as CodecResult;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

/// `ttl()` result for a key that exists but never expires
pub const TTL_PERSISTENT: i64 = -1;

/// `ttl()` result for a key that does not exist or has expired
pub const TTL_MISSING: i64 = -2;

/// Whole seconds reported by `ttl()` for a key with `remaining` lifetime left
///
/// Rounds up, so 1.2s reports 2 and anything above zero reports at least 1.
/// No time left reports [`TTL_MISSING`].
pub(crate) fn remaining_ttl_secs(remaining: Duration) -> i64 {
    if remaining.is_zero() {
        return TTL_MISSING;
    }
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Trait for cache value serialization/deserialization
///
/// Only backends that leave the process need a codec. The in-process backend
/// keeps values as they are.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync + Debug` to support concurrent access
/// across async tasks and provide debugging capabilities.
pub trait CacheCodec: Send + Sync + Debug {
    /// Serialize a value to bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented by this codec.
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>>;

    /// Deserialize bytes to a value
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not decode into `T`.
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T>;

    /// Name of the codec, used for logging
    fn name(&self) -> &'static str;
}

/// Contract every cache backend implements
///
/// Call sites hold an `Arc<dyn CacheProvider<V>>` handed out by the
/// [`ProviderRegistry`](crate::ProviderRegistry) and never learn which
/// backend is active.
///
/// # Value Type
///
/// `V` defaults to `serde_json::Value`. The in-process backend stores values
/// directly; the distributed backend serializes them on the way out and
/// decodes them on the way back in.
///
/// # Errors
///
/// The in-process backend never fails. The distributed backend propagates
/// connectivity and command errors unmodified; nothing is retried here.
#[async_trait]
pub trait CacheProvider<V = serde_json::Value>: Send + Sync
where
    V: Send + Sync + 'static,
{
    /// Get a value by key
    ///
    /// Returns `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<V>>;

    /// Store a value, overwriting any existing entry
    ///
    /// `ttl = None` stores the value without expiry. A zero TTL stores a
    /// value that is already expired, so the key reads as absent.
    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()>;

    /// Delete a key. Deleting a missing key is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Whether `get(key)` would return a value, without transferring it
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remove everything reachable by this provider
    ///
    /// Scope differs per backend: the in-process backend drops its own map,
    /// while the distributed backend without a key prefix flushes the whole
    /// store database. See [`RedisCache`](crate::backends::RedisCache).
    async fn clear(&self) -> Result<()>;

    /// Remaining lifetime of a key in whole seconds
    ///
    /// Returns [`TTL_PERSISTENT`] for keys without expiry and
    /// [`TTL_MISSING`] for absent or expired keys.
    async fn ttl(&self, key: &str) -> Result<i64>;

    /// Whether the backend has what it needs to operate
    fn is_configured(&self) -> bool;

    /// Release background tasks and connections. Safe to call repeatedly.
    async fn close(&self);

    /// Pattern deletion capability, if this backend has one
    fn pattern_delete(&self) -> Option<&dyn PatternDelete> {
        None
    }

    /// Check that the backend is operational
    ///
    /// The default probes an unlikely key so that distributed backends
    /// exercise their connection without writing a value of type `V`.
    async fn health_check(&self) -> bool {
        if !self.is_configured() {
            return false;
        }
        let probe = format!("health_check:{}", uuid::Uuid::new_v4());
        self.exists(&probe).await.is_ok()
    }

    /// Name of this backend, used for logging
    fn name(&self) -> &'static str {
        "unknown"
    }
}

/// Bulk deletion of keys matching a glob pattern
///
/// `*` matches any run of characters (including none) and `?` matches
/// exactly one character. Every other character matches itself, and the
/// pattern must match the whole key.
#[async_trait]
pub trait PatternDelete: Send + Sync {
    /// Delete all keys matching `pattern` and return how many were removed
    async fn delete_pattern(&self, pattern: &str) -> Result<u64>;
}

/// Compute-on-miss helper for any provider
#[async_trait]
pub trait CacheProviderExt<V>: CacheProvider<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Return the cached value for `key`, or compute, store and return it
    ///
    /// The computed value is written with `ttl`. Errors from the compute
    /// function are returned untouched and nothing is cached.
    async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = std::result::Result<V, E>> + Send,
        E: From<CacheError> + Send,
    {
        if let Some(cached) = self.get(key).await? {
            return Ok(cached);
        }

        let value = compute().await?;
        self.set(key, value.clone(), ttl).await?;
        Ok(value)
    }
}

impl<V, P> CacheProviderExt<V> for P
where
    P: CacheProvider<V> + ?Sized,
    V: Clone + Send + Sync + 'static,
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_ttl_rounds_up() {
        assert_eq!(remaining_ttl_secs(Duration::ZERO), TTL_MISSING);
        assert_eq!(remaining_ttl_secs(Duration::from_millis(1)), 1);
        assert_eq!(remaining_ttl_secs(Duration::from_millis(499)), 1);
        assert_eq!(remaining_ttl_secs(Duration::from_millis(1000)), 1);
        assert_eq!(remaining_ttl_secs(Duration::from_millis(1200)), 2);
    }
}
