//! Provider Registry Example
//!
//! Demonstrates configuration-selected caching: the same call sites run on
//! the in-process backend or on Redis depending on `CACHE_PROVIDER`.
//!
//! Run with: cargo run --example registry_demo
//! Or against Redis:
//!   CACHE_PROVIDER=redis REDIS_URL=redis://127.0.0.1:6379 CACHE_KEY_PREFIX=demo \
//!     cargo run --example registry_demo

use cache_providers::{CacheError, CacheProviderExt, CacheStrategy, ProviderRegistry};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Cache Providers: Registry Demo ===\n");

    // 1. Resolve the configured backend
    let registry: ProviderRegistry = ProviderRegistry::from_env();
    let cache = registry.cache().await;
    println!(
        "Active backend: {} (configured: {})",
        cache.name(),
        cache.is_configured()
    );

    if !cache.health_check().await {
        println!("❌ Backend is not healthy, check REDIS_URL");
        return Ok(());
    }
    println!("✅ Backend is healthy\n");

    // 2. Store data with different strategies
    let user = serde_json::json!({"id": 1, "name": "Alice", "role": "admin"});
    cache.set("user:1", user, CacheStrategy::ShortTerm.ttl()).await?;
    cache
        .set("user:2", serde_json::json!({"id": 2, "name": "Bob"}), CacheStrategy::ShortTerm.ttl())
        .await?;
    cache
        .set("sensor:temp", serde_json::json!(25.5), Some(Duration::from_secs(2)))
        .await?;

    if let Some(cached) = cache.get("user:1").await? {
        println!("Retrieved user:1 → {cached}");
    }
    println!("TTL of user:1: {}s", cache.ttl("user:1").await?);
    println!("TTL of sensor:temp: {}s\n", cache.ttl("sensor:temp").await?);

    // 3. Compute on miss
    let report = cache
        .get_or_compute("report:daily", CacheStrategy::MediumTerm.ttl(), || async {
            println!("Computing report (cache miss)...");
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, CacheError>(serde_json::json!({"visits": 1234}))
        })
        .await?;
    println!("Report: {report}\n");

    // 4. Expiry
    tokio::time::sleep(Duration::from_millis(2100)).await;
    println!(
        "sensor:temp after expiry: {:?}",
        cache.get("sensor:temp").await?
    );

    // 5. Pattern invalidation
    if let Some(patterns) = cache.pattern_delete() {
        let removed = patterns.delete_pattern("user:*").await?;
        println!("Invalidated {removed} keys matching user:*");
    }

    registry.close().await;
    println!("\n=== Demo Complete ===");
    Ok(())
}
