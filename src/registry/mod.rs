//! Provider Registry
//!
//! Resolves which cache backend is active from configuration and keeps one
//! shared instance per process (or per registry, for tests). Call sites ask
//! the registry for "the cache" and talk to whatever comes back through the
//! [`CacheProvider`] contract.
//!
//! # Resolution
//!
//! ```text
//! cache() → read settings → same kind as live instance? → return it
//!                                   ↓ no
//!                        build new backend → swap in → close the old one
//! ```
//!
//! Unknown or absent `CACHE_PROVIDER` values select the in-process backend
//! with a warning instead of failing.
//!
//! # Example
//!
//! ```rust,no_run
//! use cache_providers::ProviderRegistry;
//!
//! # async fn example() -> cache_providers::Result<()> {
//! let registry: ProviderRegistry = ProviderRegistry::from_env();
//! let cache = registry.cache().await;
//! cache.set("greeting", serde_json::json!("hello"), None).await?;
//! # Ok(())
//! # }
//! ```

mod slot;

pub use slot::{ProviderSlot, Resolution};

use crate::backends::MemoryCache;
#[cfg(feature = "redis")]
use crate::backends::RedisCache;
use crate::config::{CacheBackendKind, CacheSettings, EnvSettings, SettingsSource};
use crate::traits::CacheProvider;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared handle to the active cache backend
pub type SharedCache<V = serde_json::Value> = Arc<dyn CacheProvider<V>>;

/// Resolves configured providers and keeps one live instance per domain
///
/// Construct one per process and share it (for example behind an `Arc`), or
/// one per test for isolation. Nothing is built until the first call to
/// [`cache`](Self::cache).
pub struct ProviderRegistry<V = serde_json::Value> {
    settings: Arc<dyn SettingsSource>,
    cache: ProviderSlot<CacheBackendKind, dyn CacheProvider<V>>,
}

impl<V> ProviderRegistry<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Registry reading settings from `settings` on every resolution
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsSource>) -> Self {
        Self {
            settings,
            cache: ProviderSlot::new(),
        }
    }

    /// Registry reading settings from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(Arc::new(EnvSettings))
    }

    /// The shared cache for the currently configured backend
    ///
    /// Returns the live instance while the configured backend kind is
    /// unchanged. When the kind changes, a new backend is built and the
    /// previous one is closed, so any references still held to it become
    /// inert.
    pub async fn cache(&self) -> SharedCache<V> {
        let settings = self.settings.cache_settings();
        let kind = settings.backend_kind();

        match self
            .cache
            .resolve(kind, |kind| Self::build_cache(kind, &settings))
        {
            Resolution::Existing(instance) => instance,
            Resolution::Created {
                instance,
                replaced: Some(previous),
            } => {
                info!(
                    from = previous.name(),
                    to = instance.name(),
                    "Cache backend changed, closing previous instance"
                );
                previous.close().await;
                instance
            }
            Resolution::Created {
                instance,
                replaced: None,
            } => instance,
        }
    }

    /// Build a backend of `kind` outside the singleton
    ///
    /// For callers that need more than one backend live at once. The caller
    /// owns the instance and is responsible for closing it.
    #[must_use]
    pub fn create_cache(&self, kind: CacheBackendKind) -> SharedCache<V> {
        Self::build_cache(kind, &self.settings.cache_settings())
    }

    /// Kind of the live cache, `None` before the first resolution
    #[must_use]
    pub fn active_cache_kind(&self) -> Option<CacheBackendKind> {
        self.cache.kind()
    }

    /// Close and forget the live cache; the next `cache()` builds a fresh one
    pub async fn close(&self) {
        if let Some(instance) = self.cache.take() {
            instance.close().await;
        }
    }

    fn build_cache(kind: CacheBackendKind, settings: &CacheSettings) -> SharedCache<V> {
        settings.warn_on_fallback();
        debug!(backend = kind.as_str(), "Building cache backend");

        match kind {
            CacheBackendKind::Memory => {
                Arc::new(MemoryCache::<V>::with_sweep_interval(settings.sweep_interval()))
            }
            #[cfg(feature = "redis")]
            CacheBackendKind::Redis => {
                if settings.redis_url.is_none() {
                    warn!("REDIS_URL not set, distributed cache will report not configured");
                }
                Arc::new(RedisCache::<V>::from_settings(settings))
            }
            #[cfg(not(feature = "redis"))]
            CacheBackendKind::Redis => {
                warn!("Built without the `redis` feature, falling back to in-process cache");
                Arc::new(MemoryCache::<V>::with_sweep_interval(settings.sweep_interval()))
            }
        }
    }
}

impl<V> Default for ProviderRegistry<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::from_env()
    }
}
