//! Cache provider configuration
//!
//! Settings come from the process environment through figment:
//!
//! | Variable | Effect |
//! |---|---|
//! | `CACHE_PROVIDER` | `memory` (in-process) or `redis` (distributed); anything else falls back to `memory` |
//! | `REDIS_URL` | Connection target for the distributed backend |
//! | `CACHE_KEY_PREFIX` | Namespace prepended to every key sent to the distributed backend |
//! | `CACHE_SWEEP_INTERVAL_SECS` | Period of the in-process expiry sweep (default 60, `0` disables it) |
//!
//! The registry re-reads settings through a [`SettingsSource`] on every
//! resolution, so a changed `CACHE_PROVIDER` takes effect on the next call.

use figment::Figment;
use figment::providers::{Env, Serialized};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Default period between two in-process sweeps
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

const ENV_KEYS: [&str; 4] = [
    "CACHE_PROVIDER",
    "REDIS_URL",
    "CACHE_KEY_PREFIX",
    "CACHE_SWEEP_INTERVAL_SECS",
];

/// Cache backends the registry knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheBackendKind {
    /// In-process TTL cache
    Memory,
    /// Distributed cache backed by Redis
    Redis,
}

impl CacheBackendKind {
    /// Parse a configuration tag, case-insensitively
    ///
    /// Returns `None` for tags that name no known backend.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-process" | "in_process" | "in-memory" | "in_memory" | "local" => {
                Some(Self::Memory)
            }
            "redis" | "distributed" => Some(Self::Redis),
            _ => None,
        }
    }

    /// Canonical tag for this backend
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
        }
    }
}

impl fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache settings, read from the environment or supplied directly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Backend tag (`CACHE_PROVIDER`)
    pub cache_provider: Option<String>,
    /// Redis connection URL (`REDIS_URL`)
    pub redis_url: Option<String>,
    /// Key namespace for the distributed backend (`CACHE_KEY_PREFIX`)
    ///
    /// Purely numeric values must be quoted in the environment
    /// (`CACHE_KEY_PREFIX='"42"'`), since figment parses bare numbers.
    pub cache_key_prefix: Option<String>,
    /// Seconds between in-process sweeps (`CACHE_SWEEP_INTERVAL_SECS`)
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_provider: None,
            redis_url: None,
            cache_key_prefix: None,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl CacheSettings {
    /// Settings selecting `kind`, everything else default
    #[must_use]
    pub fn for_backend(kind: CacheBackendKind) -> Self {
        Self {
            cache_provider: Some(kind.as_str().to_string()),
            ..Self::default()
        }
    }

    /// Set the Redis connection URL
    #[must_use]
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Set the key prefix for the distributed backend
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_key_prefix = Some(prefix.into());
        self
    }

    /// Set the in-process sweep period
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_secs = interval.as_secs();
        self
    }

    /// Backend named by `cache_provider`, if the tag is recognised
    #[must_use]
    pub fn requested_backend(&self) -> Option<CacheBackendKind> {
        self.cache_provider.as_deref().and_then(CacheBackendKind::from_tag)
    }

    /// Resolve the configured backend, falling back to [`CacheBackendKind::Memory`]
    ///
    /// Absent or unknown tags are not errors: they select the in-process
    /// backend so the system keeps working. Use [`Self::warn_on_fallback`] to
    /// report the substitution.
    #[must_use]
    pub fn backend_kind(&self) -> CacheBackendKind {
        self.requested_backend().unwrap_or(CacheBackendKind::Memory)
    }

    /// Log a warning if `cache_provider` is absent or unknown
    pub fn warn_on_fallback(&self) {
        if self.requested_backend().is_some() {
            return;
        }
        match self.cache_provider.as_deref() {
            Some(tag) => warn!(tag = %tag, "Unknown CACHE_PROVIDER, falling back to in-process cache"),
            None => warn!("CACHE_PROVIDER not set, falling back to in-process cache"),
        }
    }

    /// Sweep period, `None` when sweeping is disabled
    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

/// Where the registry reads its settings from
///
/// Called on every resolution; implementations should be cheap.
pub trait SettingsSource: Send + Sync {
    /// Current cache settings
    fn cache_settings(&self) -> CacheSettings;
}

/// Settings read from the process environment on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSettings;

impl EnvSettings {
    /// Figment merging defaults with the recognised environment variables
    #[must_use]
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(CacheSettings::default()))
            .merge(Env::raw().only(&ENV_KEYS))
    }

    /// Extract settings, logging and falling back to defaults on error
    #[must_use]
    pub fn load() -> CacheSettings {
        Self::figment().extract().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid cache settings in environment, using defaults");
            CacheSettings::default()
        })
    }
}

impl SettingsSource for EnvSettings {
    fn cache_settings(&self) -> CacheSettings {
        Self::load()
    }
}

/// Settings held in memory and changeable at runtime
///
/// Useful for embedders that manage configuration themselves and for tests
/// that need isolated registries.
#[derive(Debug, Default)]
pub struct StaticSettings {
    settings: RwLock<CacheSettings>,
}

impl StaticSettings {
    /// Wrap fixed settings
    #[must_use]
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Change the backend tag
    pub fn set_provider(&self, tag: impl Into<String>) {
        self.settings.write().cache_provider = Some(tag.into());
    }

    /// Replace all settings
    pub fn replace(&self, settings: CacheSettings) {
        *self.settings.write() = settings;
    }
}

impl SettingsSource for StaticSettings {
    fn cache_settings(&self) -> CacheSettings {
        self.settings.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(CacheBackendKind::from_tag("memory"), Some(CacheBackendKind::Memory));
        assert_eq!(CacheBackendKind::from_tag(" In-Process "), Some(CacheBackendKind::Memory));
        assert_eq!(CacheBackendKind::from_tag("REDIS"), Some(CacheBackendKind::Redis));
        assert_eq!(CacheBackendKind::from_tag("distributed"), Some(CacheBackendKind::Redis));
        assert_eq!(CacheBackendKind::from_tag("memcached"), None);
    }

    #[test]
    fn test_unknown_and_absent_fall_back_to_memory() {
        let mut settings = CacheSettings::default();
        assert_eq!(settings.requested_backend(), None);
        assert_eq!(settings.backend_kind(), CacheBackendKind::Memory);

        settings.cache_provider = Some("carrier-pigeon".to_string());
        assert_eq!(settings.requested_backend(), None);
        assert_eq!(settings.backend_kind(), CacheBackendKind::Memory);

        settings.cache_provider = Some("redis".to_string());
        assert_eq!(settings.backend_kind(), CacheBackendKind::Redis);
    }

    #[test]
    fn test_sweep_interval() {
        let settings = CacheSettings::default();
        assert_eq!(settings.sweep_interval(), Some(Duration::from_secs(60)));

        let disabled = settings.with_sweep_interval(Duration::ZERO);
        assert_eq!(disabled.sweep_interval(), None);
    }

    #[test]
    fn test_env_settings() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CACHE_PROVIDER", "redis");
            jail.set_env("REDIS_URL", "redis://cache.internal:6379");
            jail.set_env("CACHE_KEY_PREFIX", "app");
            jail.set_env("CACHE_SWEEP_INTERVAL_SECS", "15");
            jail.set_env("UNRELATED_SETTING", "ignored");

            let settings = EnvSettings.cache_settings();
            assert_eq!(settings.backend_kind(), CacheBackendKind::Redis);
            assert_eq!(settings.redis_url.as_deref(), Some("redis://cache.internal:6379"));
            assert_eq!(settings.cache_key_prefix.as_deref(), Some("app"));
            assert_eq!(settings.sweep_interval_secs, 15);
            Ok(())
        });
    }

    #[test]
    fn test_env_settings_defaults() {
        figment::Jail::expect_with(|_jail| {
            let settings: CacheSettings = EnvSettings::figment().extract()?;
            assert_eq!(settings.sweep_interval_secs, DEFAULT_SWEEP_INTERVAL_SECS);
            Ok(())
        });
    }

    #[test]
    fn test_static_settings_change() {
        let source = StaticSettings::new(CacheSettings::for_backend(CacheBackendKind::Memory));
        assert_eq!(source.cache_settings().backend_kind(), CacheBackendKind::Memory);

        source.set_provider("redis");
        assert_eq!(source.cache_settings().backend_kind(), CacheBackendKind::Redis);
    }
}
