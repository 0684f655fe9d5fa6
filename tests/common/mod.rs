//! Common utilities for integration tests
//!
//! This module provides shared test infrastructure including:
//! - Registry construction with isolated settings
//! - Redis availability detection
//! - Test data generators

#![allow(dead_code)]

use cache_providers::{CacheBackendKind, CacheSettings, ProviderRegistry, StaticSettings};
use std::sync::Arc;

/// Redis URL from the environment; Redis-backed tests skip when unset
pub fn redis_url() -> Option<String> {
    std::env::var("REDIS_URL").ok().filter(|url| !url.is_empty())
}

/// Skip the current test when no Redis is available
#[macro_export]
macro_rules! require_redis {
    () => {
        match common::redis_url() {
            Some(url) => url,
            None => {
                eprintln!("REDIS_URL not set, skipping");
                return;
            }
        }
    };
}

/// Generate a unique key so concurrent test runs never collide
pub fn test_key(name: &str) -> String {
    format!("test_{}_{}", name, rand::random::<u32>())
}

/// Unique namespace for tests that share a Redis database
pub fn test_prefix() -> String {
    format!("cache_providers_test_{}", rand::random::<u32>())
}

/// Registry over mutable in-memory settings
pub fn registry_with(settings: CacheSettings) -> (Arc<StaticSettings>, ProviderRegistry) {
    let source = Arc::new(StaticSettings::new(settings));
    let registry = ProviderRegistry::new(source.clone());
    (source, registry)
}

/// Registry selecting the in-process backend
pub fn memory_registry() -> (Arc<StaticSettings>, ProviderRegistry) {
    registry_with(CacheSettings::for_backend(CacheBackendKind::Memory))
}

/// Generate test data of various types
pub mod test_data {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct User {
        pub id: u64,
        pub name: String,
        pub email: String,
    }

    impl User {
        pub fn new(id: u64) -> Self {
            Self {
                id,
                name: format!("User {}", id),
                email: format!("user{}@example.com", id),
            }
        }
    }

    /// Generate JSON test data
    pub fn json_user(id: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": format!("User {}", id),
            "email": format!("user{}@example.com", id),
            "created_at": "2025-01-01T00:00:00Z"
        })
    }
}
