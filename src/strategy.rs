//! TTL presets for common kinds of cached data

use std::time::Duration;

/// Cache strategies for different data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStrategy {
    /// Real-time data - 10 seconds TTL
    RealTime,
    /// Short-term data - 5 minutes TTL
    #[default]
    ShortTerm,
    /// Medium-term data - 1 hour TTL
    MediumTerm,
    /// Long-term data - 3 hours TTL
    LongTerm,
    /// Custom TTL
    Custom(Duration),
    /// Never expires
    Persistent,
}

impl CacheStrategy {
    /// TTL to pass to [`CacheProvider::set`](crate::CacheProvider::set)
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            Self::RealTime => Some(Duration::from_secs(10)),
            Self::ShortTerm => Some(Duration::from_secs(300)), // 5 minutes
            Self::MediumTerm => Some(Duration::from_secs(3600)), // 1 hour
            Self::LongTerm => Some(Duration::from_secs(10800)), // 3 hours
            Self::Custom(duration) => Some(*duration),
            Self::Persistent => None,
        }
    }
}
