//! Cache configuration.

use std::time::Duration;

/// Configuration for a cache instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,

    /// Time-to-live for cache entries.
    /// After this duration, entries are automatically evicted.
    pub ttl: Option<Duration>,

    /// Time-to-idle for cache entries.
    /// Entries are evicted if not accessed within this duration.
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(Duration::from_secs(300)), // 5 minutes
            tti: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given max capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ..Default::default()
        }
    }

    /// Set max capacity for cache (builder pattern).
    #[must_use]
    pub fn max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Set time-to-live for cache entries.
    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = Some(duration);
        self
    }

    /// Disable TTL (entries never expire based on time).
    #[must_use]
    pub fn no_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Guild configuration mirror.
    /// Entries live until capacity eviction; a miss just re-reads the store.
    pub fn guild_mirror(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ttl: None,
            tti: None,
        }
    }

    /// Per-message hot path lookups (curse words).
    /// Short TTL bounds staleness against writers in other processes.
    pub fn hot_data() -> Self {
        Self {
            max_capacity: 50_000,
            ttl: Some(Duration::from_secs(60)), // 1 minute
            tti: Some(Duration::from_secs(30)), // 30 seconds idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = CacheConfig::with_capacity(10).ttl(Duration::from_secs(5));
        assert_eq!(config.max_capacity, 10);
        assert_eq!(config.ttl, Some(Duration::from_secs(5)));

        let config = config.no_ttl().max_capacity(20);
        assert_eq!(config.ttl, None);
        assert_eq!(config.max_capacity, 20);
    }

    #[test]
    fn test_guild_mirror_never_expires() {
        let config = CacheConfig::guild_mirror(500);
        assert_eq!(config.ttl, None);
        assert_eq!(config.tti, None);
    }
}
