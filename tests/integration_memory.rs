//! In-process backend behaviour through the provider contract
//!
//! Time-dependent tests run on a paused clock so expiry and sweeps are
//! deterministic.

mod common;

use cache_providers::{
    CacheError, CacheProvider, CacheProviderExt, CacheStrategy, MemoryCache, TTL_MISSING,
    TTL_PERSISTENT,
};
use common::*;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Test set then get returns the stored value
#[tokio::test]
async fn test_round_trip() {
    let (_, registry) = memory_registry();
    let cache = registry.cache().await;

    for id in 0..20 {
        let key = test_key("round_trip");
        let value = test_data::json_user(id);
        cache.set(&key, value.clone(), None).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(value));
    }
}

/// Test TTL expiry: present immediately, gone after the TTL
#[tokio::test(start_paused = true)]
async fn test_ttl_expiry() {
    let cache: MemoryCache = MemoryCache::with_sweep_interval(None);
    let key = test_key("ttl");

    cache.set(&key, json!("v"), Some(Duration::from_secs(1))).await.unwrap();
    assert!(cache.exists(&key).await.unwrap());
    assert_eq!(cache.ttl(&key).await.unwrap(), 1);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(cache.get(&key).await.unwrap(), None);
    assert_eq!(cache.ttl(&key).await.unwrap(), TTL_MISSING);
}

/// Test entries without TTL never expire
#[tokio::test(start_paused = true)]
async fn test_no_ttl_persists() {
    let cache: MemoryCache = MemoryCache::new();
    cache.set("forever", json!(true), None).await.unwrap();

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(cache.ttl("forever").await.unwrap(), TTL_PERSISTENT);
    }
    assert_eq!(cache.get("forever").await.unwrap(), Some(json!(true)));
}

/// Test pattern deletion removes exactly the matching keys
#[tokio::test]
async fn test_pattern_deletion() {
    let (_, registry) = memory_registry();
    let cache = registry.cache().await;
    for key in ["user:1", "user:2", "order:1"] {
        cache.set(key, json!(key), None).await.unwrap();
    }

    let removed = cache
        .pattern_delete()
        .unwrap()
        .delete_pattern("user:*")
        .await
        .unwrap();

    assert_eq!(removed, 2);
    assert!(!cache.exists("user:1").await.unwrap());
    assert!(!cache.exists("user:2").await.unwrap());
    assert_eq!(cache.get("order:1").await.unwrap(), Some(json!("order:1")));
}

/// Test deleting twice never errors
#[tokio::test]
async fn test_idempotent_delete() {
    let (_, registry) = memory_registry();
    let cache = registry.cache().await;
    let key = test_key("delete");

    cache.set(&key, json!(1), None).await.unwrap();
    cache.delete(&key).await.unwrap();
    cache.delete(&key).await.unwrap();
    cache.delete("never-existed").await.unwrap();
    assert!(!cache.exists(&key).await.unwrap());
}

/// Test the sweep reclaims entries nobody reads
#[tokio::test(start_paused = true)]
async fn test_sweep_reclamation() {
    let cache: MemoryCache = MemoryCache::with_sweep_interval(Some(Duration::from_secs(60)));
    for id in 0..10 {
        cache
            .set(&format!("short:{id}"), json!(id), Some(Duration::from_millis(50)))
            .await
            .unwrap();
    }
    cache.set("kept", json!("kept"), None).await.unwrap();
    assert_eq!(cache.len(), 11);

    // One full sweep interval, no reads
    tokio::time::sleep(Duration::from_secs(61)).await;

    let stats = cache.stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.evictions, 10);
    assert_eq!(stats.hits + stats.misses, 0, "nothing was read");
}

/// Test clear drops everything
#[tokio::test]
async fn test_clear() {
    let cache: MemoryCache = MemoryCache::with_sweep_interval(None);
    cache.set("a", json!(1), None).await.unwrap();
    cache.set("b", json!(2), Some(Duration::from_secs(30))).await.unwrap();

    cache.clear().await.unwrap();

    assert!(cache.is_empty());
    assert_eq!(cache.get("a").await.unwrap(), None);
}

/// Test TTL presets map onto the contract
#[tokio::test(start_paused = true)]
async fn test_strategy_ttls() {
    let cache: MemoryCache = MemoryCache::with_sweep_interval(None);
    cache.set("rt", json!(1), CacheStrategy::RealTime.ttl()).await.unwrap();
    cache.set("lt", json!(2), CacheStrategy::LongTerm.ttl()).await.unwrap();
    cache.set("p", json!(3), CacheStrategy::Persistent.ttl()).await.unwrap();

    assert_eq!(cache.ttl("rt").await.unwrap(), 10);
    assert_eq!(cache.ttl("lt").await.unwrap(), 10800);
    assert_eq!(cache.ttl("p").await.unwrap(), TTL_PERSISTENT);
}

/// Test compute-on-miss only computes once
#[tokio::test]
async fn test_get_or_compute() {
    let (_, registry) = memory_registry();
    let cache = registry.cache().await;
    let key = test_key("compute");
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let value = cache
            .get_or_compute(&key, CacheStrategy::ShortTerm.ttl(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>(test_data::json_user(7))
            })
            .await
            .unwrap();
        assert_eq!(value, test_data::json_user(7));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Test compute errors are returned and nothing is cached
#[tokio::test]
async fn test_get_or_compute_error_not_cached() {
    #[derive(Debug)]
    enum LoadError {
        Cache,
        Database,
    }

    impl From<CacheError> for LoadError {
        fn from(_: CacheError) -> Self {
            Self::Cache
        }
    }

    let cache: MemoryCache = MemoryCache::with_sweep_interval(None);
    let result = cache
        .get_or_compute("k", None, || async { Err::<serde_json::Value, _>(LoadError::Database) })
        .await;

    assert!(matches!(result, Err(LoadError::Database)));
    assert!(!cache.exists("k").await.unwrap());
}

/// Test concurrent writers and readers on one shared instance
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_access() {
    let cache: Arc<MemoryCache> = Arc::new(MemoryCache::new());
    let mut handles = Vec::new();

    for task in 0..8u64 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            for i in 0..200u64 {
                let key = format!("task:{task}:{i}");
                cache.set(&key, json!(i), None).await.unwrap();
                assert_eq!(cache.get(&key).await.unwrap(), Some(json!(i)));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.len(), 1600);
    let removed = cache.pattern_delete().unwrap().delete_pattern("task:3:*").await.unwrap();
    assert_eq!(removed, 200);
    assert_eq!(cache.len(), 1400);
}
