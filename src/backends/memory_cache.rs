//! Memory Cache - In-Process TTL Backend
//!
//! Keeps values in a `HashMap` behind a single mutex. Expired entries are
//! removed lazily when read and actively by a scheduled sweep, so memory is
//! reclaimed even for keys nobody reads again.

use crate::error::Result;
use crate::pattern::KeyPattern;
use crate::traits::{
    CacheProvider, PatternDelete, TTL_MISSING, TTL_PERSISTENT, remaining_ttl_secs,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_SWEEP_INTERVAL_SECS;

/// Cache entry with expiration tracking
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    /// A TTL too large to represent as an instant never expires
    fn new(value: V, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Store shared between the cache handle and its sweep task
struct Store<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
}

impl<V> Store<V> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Remove every expired entry in one pass over the map
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.lock().retain(|_, entry| {
            if entry.is_expired_at(now) {
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(count = removed, "[Memory] Swept expired entries");
        }
        removed
    }
}

/// Handle to the scheduled sweep, cancelled on close or drop
struct SweepTask {
    handle: JoinHandle<()>,
}

impl SweepTask {
    fn spawn<V>(store: Weak<Store<V>>, period: Duration) -> Option<Self>
    where
        V: Send + Sync + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime available, expired entries will only be evicted on access");
            return None;
        };

        let Some(first_tick) = Instant::now().checked_add(period) else {
            warn!(
                sweep_interval_secs = period.as_secs(),
                "Sweep interval out of range, expired entries will only be evicted on access"
            );
            return None;
        };

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(live) = store.upgrade() else {
                    break;
                };
                live.sweep();
            }
        });

        Some(Self { handle })
    }

    fn cancel(self) {
        self.handle.abort();
    }
}

/// Snapshot of in-process cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryCacheStats {
    /// `get` calls that returned a value
    pub hits: u64,
    /// `get` calls that found nothing
    pub misses: u64,
    /// `set` calls
    pub sets: u64,
    /// Expired entries removed, lazily or by the sweep
    pub evictions: u64,
    /// Entries physically held, including expired ones not yet swept
    pub entries: usize,
}

/// In-process cache with per-key TTL and active expiry sweeping
///
/// **Features**:
/// - Per-key TTL, or no expiry at all
/// - Lazy eviction on read plus a periodic sweep (default every 60 seconds)
/// - Glob pattern deletion over all stored keys
/// - Values are kept as-is, never serialized
///
/// The sweep runs on the tokio runtime that is current when the cache is
/// created. Without a runtime, only lazy eviction applies.
///
/// **Example**:
/// ```rust
/// use cache_providers::backends::MemoryCache;
/// use cache_providers::CacheProvider;
/// use std::time::Duration;
///
/// # async fn example() -> cache_providers::Result<()> {
/// let cache: MemoryCache = MemoryCache::new();
/// let value = serde_json::json!({"user": "alice"});
///
/// cache.set("user:1", value.clone(), Some(Duration::from_secs(60))).await?;
/// assert_eq!(cache.get("user:1").await?, Some(value));
/// # Ok(())
/// # }
/// ```
pub struct MemoryCache<V = serde_json::Value> {
    store: Arc<Store<V>>,
    sweeper: Mutex<Option<SweepTask>>,
    sweep_interval: Option<Duration>,
    closed: AtomicBool,
}

impl<V> MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache that sweeps every 60 seconds
    #[must_use]
    pub fn new() -> Self {
        Self::with_sweep_interval(Some(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)))
    }

    /// Create a cache with a custom sweep period, or none at all
    ///
    /// A zero period is treated as `None`.
    #[must_use]
    pub fn with_sweep_interval(sweep_interval: Option<Duration>) -> Self {
        let sweep_interval = sweep_interval.filter(|period| !period.is_zero());
        let store = Arc::new(Store::new());
        let sweeper = sweep_interval.and_then(|period| SweepTask::spawn(Arc::downgrade(&store), period));

        info!(
            sweep_interval_secs = sweep_interval.map(|period| period.as_secs()),
            sweeping = sweeper.is_some(),
            "Initializing in-process cache"
        );

        Self {
            store,
            sweeper: Mutex::new(sweeper),
            sweep_interval,
            closed: AtomicBool::new(false),
        }
    }

    /// Run one sweep now and return how many expired entries were removed
    pub fn sweep_expired(&self) -> usize {
        self.store.sweep()
    }

    /// Number of entries physically held, expired or not
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.entries.lock().len()
    }

    /// Whether no entries are held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.entries.lock().is_empty()
    }

    /// Configured sweep period
    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval
    }

    /// Whether the scheduled sweep is running
    #[must_use]
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Counter snapshot
    #[must_use]
    pub fn stats(&self) -> MemoryCacheStats {
        MemoryCacheStats {
            hits: self.store.hits.load(Ordering::Relaxed),
            misses: self.store.misses.load(Ordering::Relaxed),
            sets: self.store.sets.load(Ordering::Relaxed),
            evictions: self.store.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn record_eviction(&self) {
        self.store.evictions.fetch_add(1, Ordering::Relaxed);
    }
}

impl<V> Default for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for MemoryCache<V> {
    fn drop(&mut self) {
        if let Some(task) = self.sweeper.get_mut().take() {
            task.cancel();
        }
    }
}

// ===== Trait Implementations =====

#[async_trait]
impl<V> CacheProvider<V> for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>> {
        let now = Instant::now();
        let mut entries = self.store.entries.lock();

        let lookup = entries
            .get(key)
            .map(|entry| (!entry.is_expired_at(now)).then(|| entry.value.clone()));
        let found = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                entries.remove(key);
                self.record_eviction();
                None
            }
            None => None,
        };
        drop(entries);

        if found.is_some() {
            self.store.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.store.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(found)
    }

    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry::new(value, ttl);
        {
            // Checked under the store lock so nothing lands after close() clears
            let mut entries = self.store.entries.lock();
            if self.closed.load(Ordering::Acquire) {
                debug!(key = %key, "[Memory] Ignoring set on closed cache");
                return Ok(());
            }
            entries.insert(key.to_string(), entry);
        }
        self.store.sets.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, ttl_secs = ttl.map(|ttl| ttl.as_secs_f64()), "[Memory] Cached key");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.entries.lock().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.store.entries.lock();

        match entries.get(key).map(|entry| entry.is_expired_at(now)) {
            Some(true) => {
                entries.remove(key);
                self.record_eviction();
                Ok(false)
            }
            Some(false) => Ok(true),
            None => Ok(false),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.store.entries.lock();
        let count = entries.len();
        entries.clear();
        debug!(count = count, "[Memory] Cleared cache");
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        let now = Instant::now();
        let mut entries = self.store.entries.lock();

        let Some(entry) = entries.get(key) else {
            return Ok(TTL_MISSING);
        };
        let Some(expires_at) = entry.expires_at else {
            return Ok(TTL_PERSISTENT);
        };

        let remaining = remaining_ttl_secs(expires_at.saturating_duration_since(now));
        if remaining == TTL_MISSING {
            entries.remove(key);
            self.record_eviction();
        }
        Ok(remaining)
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn close(&self) {
        let task = self.sweeper.lock().take();
        if let Some(task) = task {
            task.cancel();
        }
        self.closed.store(true, Ordering::Release);
        self.store.entries.lock().clear();
        info!("In-process cache closed");
    }

    fn pattern_delete(&self) -> Option<&dyn PatternDelete> {
        Some(self)
    }

    async fn health_check(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn name(&self) -> &'static str {
        "Memory"
    }
}

#[async_trait]
impl<V> PatternDelete for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let pattern = KeyPattern::new(pattern)?;
        let now = Instant::now();
        let mut removed = 0u64;
        let mut expired = 0u64;

        self.store.entries.lock().retain(|key, entry| {
            if !pattern.matches(key) {
                return true;
            }
            if entry.is_expired_at(now) {
                expired += 1;
            } else {
                removed += 1;
            }
            false
        });

        if expired > 0 {
            self.store.evictions.fetch_add(expired, Ordering::Relaxed);
        }
        debug!(pattern = %pattern.as_str(), count = removed, "[Memory] Deleted keys matching pattern");
        Ok(removed)
    }
}
