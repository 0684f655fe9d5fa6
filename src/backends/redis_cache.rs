//! Redis Cache - Distributed Cache Backend
//!
//! Delegates storage to Redis. The connection is opened on first use, so a
//! process can start while Redis is briefly unavailable; the first operation
//! that needs the connection reports the failure.
//!
//! # `clear()` scope
//!
//! With a key prefix, `clear()` removes only keys under that prefix, batch by
//! batch. **Without a prefix, `clear()` runs `FLUSHDB` and wipes the entire
//! Redis database**, including keys written by other applications. This is
//! categorically more destructive than clearing the in-process backend.
//! Configure `CACHE_KEY_PREFIX` whenever the database is shared.

use crate::codecs::JsonCodec;
use crate::config::CacheSettings;
use crate::error::{CacheError, Result};
use crate::pattern::{escape_glob, to_store_glob};
use crate::traits::{
    CacheCodec, CacheProvider, PatternDelete, TTL_MISSING, TTL_PERSISTENT, remaining_ttl_secs,
};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use serde::Serialize;
use serde::de::value::{Error as ValueError, StringDeserializer};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Keys fetched per `SCAN` round trip
const SCAN_BATCH: usize = 100;

const BACKEND: &str = "Redis";

fn command_error(command: &'static str) -> impl FnOnce(RedisError) -> CacheError {
    move |source| CacheError::Command { command, source }
}

/// Map a `PTTL` reply onto the `ttl()` convention shared with the in-process backend
///
/// `-1` (no expiry) and `-2` (missing) pass through; a live key rounds up to
/// whole seconds.
fn ttl_from_pttl(millis: i64) -> i64 {
    match u64::try_from(millis) {
        Ok(millis) => remaining_ttl_secs(Duration::from_millis(millis)),
        Err(_) if millis == TTL_PERSISTENT => TTL_PERSISTENT,
        Err(_) => TTL_MISSING,
    }
}

/// Redis distributed cache with lazily established `ConnectionManager`
///
/// Provides:
/// - Key namespacing (`prefix:key`) so several logical caches can share one store
/// - Native expiring writes (`PSETEX`), no client-side clock
/// - Cursor-based pattern deletion that never loads the whole keyspace
/// - Automatic reconnection via `ConnectionManager` once connected
///
/// Values are encoded with a [`CacheCodec`] (JSON by default). Stored content
/// that does not decode into `V` is handed to `V` as a raw string instead,
/// which `serde_json::Value` and `String` accept.
pub struct RedisCache<V = serde_json::Value, C = JsonCodec> {
    redis_url: Option<String>,
    prefix: Option<String>,
    codec: C,
    /// Opened on first use, dropped on close
    connection: Mutex<Option<ConnectionManager>>,
    closed: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    _value: PhantomData<fn() -> V>,
}

impl<V> RedisCache<V, JsonCodec> {
    /// Create a cache for `redis_url`, connecting on first use
    pub fn with_url(redis_url: impl Into<String>) -> Self {
        Self::with_codec(Some(redis_url.into()), None, JsonCodec)
    }

    /// Create a cache from settings (`REDIS_URL`, `CACHE_KEY_PREFIX`)
    ///
    /// Without a URL the cache reports `is_configured() == false` and every
    /// operation fails with [`CacheError::NotConfigured`].
    #[must_use]
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::with_codec(
            settings.redis_url.clone(),
            settings.cache_key_prefix.clone(),
            JsonCodec,
        )
    }
}

impl<V, C> RedisCache<V, C>
where
    C: CacheCodec,
{
    /// Create a cache with an explicit codec
    pub fn with_codec(redis_url: Option<String>, prefix: Option<String>, codec: C) -> Self {
        let redis_url = redis_url.filter(|url| !url.trim().is_empty());
        let prefix = prefix.filter(|prefix| !prefix.is_empty());

        info!(
            configured = redis_url.is_some(),
            prefix = prefix.as_deref().unwrap_or(""),
            codec = codec.name(),
            "Initializing Redis Cache (lazy connection)"
        );

        Self {
            redis_url,
            prefix,
            codec,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            _value: PhantomData,
        }
    }

    /// Namespace every key with `prefix`
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Configured key prefix
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Key as stored in Redis
    #[must_use]
    pub fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{key}"),
            None => key.to_string(),
        }
    }

    /// Caller-facing key for a stored key
    fn logical_key<'a>(&self, stored: &'a str) -> &'a str {
        self.prefix
            .as_deref()
            .and_then(|prefix| stored.strip_prefix(prefix))
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(stored)
    }

    /// `MATCH` pattern for a caller pattern, scoped to the prefix
    fn scoped_pattern(&self, pattern: &str) -> String {
        let pattern = to_store_glob(pattern);
        match &self.prefix {
            Some(prefix) => format!("{}:{pattern}", escape_glob(prefix)),
            None => pattern,
        }
    }

    /// Hits, misses and sets recorded so far
    #[must_use]
    pub fn counters(&self) -> (u64, u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.sets.load(Ordering::Relaxed),
        )
    }

    /// Shared connection, established on first call
    async fn connection(&self) -> Result<ConnectionManager> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Closed { backend: BACKEND });
        }
        let Some(redis_url) = self.redis_url.as_deref() else {
            return Err(CacheError::NotConfigured { backend: BACKEND });
        };

        let mut slot = self.connection.lock().await;
        // close() may have run while this call waited for the slot
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Closed { backend: BACKEND });
        }
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        info!(redis_url = %redis_url, "Connecting Redis Cache");
        let connect_error = |source: RedisError| CacheError::Connection {
            target: redis_url.to_string(),
            source,
        };
        let client = Client::open(redis_url).map_err(connect_error)?;
        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(connect_error)?;

        info!(redis_url = %redis_url, "Redis Cache connected (ConnectionManager enabled)");
        *slot = Some(conn_manager.clone());
        Ok(conn_manager)
    }

    /// Scan stored keys matching a glob pattern, returned without the prefix
    ///
    /// Uses `SCAN` (cursor-based, non-blocking) rather than `KEYS`. All
    /// matches are collected, so prefer [`PatternDelete::delete_pattern`]
    /// for invalidating large key sets.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a `SCAN` command fails.
    pub async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let match_pattern = self.scoped_pattern(pattern);
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&match_pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(command_error("SCAN"))?;

            keys.extend(batch.iter().map(|key| self.logical_key(key).to_string()));

            // Cursor 0 means iteration is complete
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, count = keys.len(), "[Redis] Scanned keys matching pattern");
        Ok(keys)
    }

    /// Remove several keys in one `DEL`
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the `DEL` command fails.
    pub async fn remove_bulk(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let full_keys: Vec<String> = keys.iter().map(|key| self.full_key(key)).collect();
        let mut conn = self.connection().await?;
        let count: u64 = conn.del(&full_keys).await.map_err(command_error("DEL"))?;
        debug!(count = count, "[Redis] Removed keys in bulk");
        Ok(count)
    }
}

impl<V, C> RedisCache<V, C>
where
    V: Serialize + DeserializeOwned,
    C: CacheCodec,
{
    fn encode(&self, key: &str, value: &V) -> Result<Vec<u8>> {
        self.codec
            .serialize(value)
            .map_err(|source| CacheError::Serialization {
                key: key.to_string(),
                source,
            })
    }

    /// Decode a `GET` reply and count it; undecodable content counts as a miss
    fn read_stored(&self, key: &str, stored: Option<Vec<u8>>) -> Option<V> {
        let value = stored.and_then(|bytes| self.decode(key, &bytes));
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Decode stored bytes, offering the raw text to `V` when the codec fails
    fn decode(&self, key: &str, bytes: &[u8]) -> Option<V> {
        match self.codec.deserialize::<V>(bytes) {
            Ok(value) => Some(value),
            Err(codec_err) => {
                let raw = String::from_utf8_lossy(bytes).into_owned();
                match V::deserialize(StringDeserializer::<ValueError>::new(raw)) {
                    Ok(value) => {
                        debug!(key = %key, error = %codec_err, "[Redis] Returning undecodable value as raw string");
                        Some(value)
                    }
                    Err(_) => {
                        warn!(key = %key, error = %codec_err, "[Redis] Stored value does not fit the requested type");
                        None
                    }
                }
            }
        }
    }
}

// ===== Trait Implementations =====

#[async_trait]
impl<V, C> CacheProvider<V> for RedisCache<V, C>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    C: CacheCodec + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>> {
        let mut conn = self.connection().await?;
        let stored: Option<Vec<u8>> = conn
            .get(self.full_key(key))
            .await
            .map_err(command_error("GET"))?;

        Ok(self.read_stored(key, stored))
    }

    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<()> {
        let bytes = self.encode(key, &value)?;
        let full_key = self.full_key(key);
        let mut conn = self.connection().await?;

        match ttl {
            None => {
                let _: () = conn
                    .set(&full_key, bytes)
                    .await
                    .map_err(command_error("SET"))?;
            }
            Some(ttl) if ttl.is_zero() => {
                // Already expired: make sure no older value survives
                let _: u64 = conn.del(&full_key).await.map_err(command_error("DEL"))?;
            }
            Some(ttl) => {
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                let _: () = conn
                    .pset_ex(&full_key, bytes, millis)
                    .await
                    .map_err(command_error("PSETEX"))?;
            }
        }

        self.sets.fetch_add(1, Ordering::Relaxed);
        debug!(key = %full_key, ttl_secs = ttl.map(|ttl| ttl.as_secs_f64()), "[Redis] Cached key");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: u64 = conn
            .del(self.full_key(key))
            .await
            .map_err(command_error("DEL"))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        conn.exists(self.full_key(key))
            .await
            .map_err(command_error("EXISTS"))
    }

    async fn clear(&self) -> Result<()> {
        if self.prefix.is_some() {
            let removed = self.delete_pattern("*").await?;
            info!(prefix = self.prefix.as_deref().unwrap_or(""), count = removed, "[Redis] Cleared namespace");
            return Ok(());
        }

        warn!("[Redis] No key prefix configured, clear() flushes the entire database");
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(command_error("FLUSHDB"))?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        let mut conn = self.connection().await?;
        let millis: i64 = redis::cmd("PTTL")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await
            .map_err(command_error("PTTL"))?;
        Ok(ttl_from_pttl(millis))
    }

    fn is_configured(&self) -> bool {
        self.redis_url.is_some() && !self.closed.load(Ordering::Acquire)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if self.connection.lock().await.take().is_some() {
            info!("Redis Cache connection released");
        }
    }

    fn pattern_delete(&self) -> Option<&dyn PatternDelete> {
        Some(self)
    }

    async fn health_check(&self) -> bool {
        let Ok(mut conn) = self.connection().await else {
            return false;
        };
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }

    fn name(&self) -> &'static str {
        BACKEND
    }
}

#[async_trait]
impl<V, C> PatternDelete for RedisCache<V, C>
where
    V: Send + Sync + 'static,
    C: CacheCodec + 'static,
{
    /// Delete matching keys one `SCAN` batch at a time
    ///
    /// Each batch is deleted before the next is fetched, so memory use is
    /// bounded by the batch size and Redis is never blocked by a full scan.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.connection().await?;
        let match_pattern = self.scoped_pattern(pattern);
        let mut removed: u64 = 0;
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&match_pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(command_error("SCAN"))?;

            if !batch.is_empty() {
                let count: u64 = conn.del(&batch).await.map_err(command_error("DEL"))?;
                removed += count;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %match_pattern, count = removed, "[Redis] Deleted keys matching pattern");
        Ok(removed)
    }
}
