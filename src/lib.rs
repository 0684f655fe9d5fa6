//! Cache Providers
//!
//! Configuration-selected caching behind one stable contract:
//! - **Memory**: In-process cache with per-key TTL, lazy eviction and a scheduled sweep
//! - **Redis**: Distributed cache with key namespacing and cursor-based invalidation
//! - **Provider Registry**: Picks the backend from `CACHE_PROVIDER` and shares one instance
//! - **Pattern Invalidation**: Glob deletion (`user:*`, `item:?`) on both backends
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cache_providers::{CacheStrategy, ProviderRegistry};
//!
//! #[tokio::main]
//! async fn main() -> cache_providers::Result<()> {
//!     // CACHE_PROVIDER=redis REDIS_URL=redis://127.0.0.1:6379 selects Redis,
//!     // anything else runs in-process
//!     let registry: ProviderRegistry = ProviderRegistry::from_env();
//!     let cache = registry.cache().await;
//!
//!     let data = serde_json::json!({"user": "alice", "score": 100});
//!     cache.set("user:1", data, CacheStrategy::ShortTerm.ttl()).await?;
//!
//!     if let Some(cached) = cache.get("user:1").await? {
//!         tracing::info!("Cached data: {}", cached);
//!     }
//!
//!     // Invalidate a whole family of keys
//!     if let Some(patterns) = cache.pattern_delete() {
//!         patterns.delete_pattern("user:*").await?;
//!     }
//!
//!     cache.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Call site → ProviderRegistry::cache() → Arc<dyn CacheProvider>
//!                    ↓ reads CACHE_PROVIDER          ↓
//!             memory │ redis                  MemoryCache │ RedisCache
//! ```
//!
//! After resolution, operations go straight from the caller to the backend.

pub mod backends;
pub mod codecs;
pub mod config;
pub mod error;
pub mod pattern;
pub mod registry;
pub mod strategy;
pub mod traits;

pub use backends::{MemoryCache, MemoryCacheStats};

#[cfg(feature = "redis")]
pub use backends::RedisCache;

pub use codecs::JsonCodec;
pub use config::{CacheBackendKind, CacheSettings, EnvSettings, SettingsSource, StaticSettings};
pub use error::{CacheError, Result};
pub use pattern::KeyPattern;
pub use registry::{ProviderRegistry, ProviderSlot, Resolution, SharedCache};
pub use strategy::CacheStrategy;
pub use traits::{
    CacheCodec, CacheProvider, CacheProviderExt, PatternDelete, TTL_MISSING, TTL_PERSISTENT,
};

// Re-export async_trait for user convenience
pub use async_trait::async_trait;
