//! Cache Backend Implementations
//!
//! # Available Backends
//!
//! ## In-Process
//! - **Memory** - `HashMap` store with per-key TTL, lazy eviction and a scheduled sweep
//!
//! ## Distributed
//! - **Redis** - Namespaced keys, native expiring writes, cursor-based invalidation (feature: `redis`)
//!
//! # Usage
//!
//! ```rust,no_run
//! use cache_providers::backends::{MemoryCache, RedisCache};
//!
//! # async fn example() {
//! // Explicit backend selection, bypassing the registry
//! let memory: MemoryCache = MemoryCache::new();
//! let redis: RedisCache = RedisCache::with_url("redis://localhost:6379").with_prefix("app");
//! # }
//! ```

pub mod memory_cache;

#[cfg(feature = "redis")]
pub mod redis_cache;

pub use memory_cache::{MemoryCache, MemoryCacheStats};

#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;
