//! Configuration for the TTL map
//!
//! Lock stores use a TTL-only map sized by the lease; local-memory providers
//! may also bound the number of entries and pick an eviction policy.

use std::time::Duration;

/// Eviction policy for cache entries when capacity is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Least Recently Used - evicts the least recently accessed entry
    #[default]
    LRU,
    /// First In First Out - evicts the oldest entry by insertion time
    FIFO,
    /// No automatic eviction; inserts beyond capacity are still accepted
    None,
}

impl_status_conversions!(EvictionPolicy {
    LRU => "lru",
    FIFO => "fifo",
    None => "none",
});

/// Configuration for cache behavior
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Maximum number of entries (None = unlimited)
    pub max_size: Option<usize>,

    /// Time-to-live measured from the last write (None = no expiration)
    pub ttl: Option<Duration>,

    /// Eviction policy when max_size is reached
    pub eviction_policy: EvictionPolicy,

    /// Whether to collect hit/miss metrics
    pub track_metrics: bool,
}

impl CacheConfig {
    /// Create a new configuration builder
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// TTL-only map with no size bound, as used for lock records.
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use cachefront_common::cache::{CacheConfig, EvictionPolicy};
    ///
    /// let config = CacheConfig::ttl(Duration::from_millis(3000));
    /// assert_eq!(config.eviction_policy, EvictionPolicy::None);
    /// ```
    pub fn ttl(duration: Duration) -> Self {
        Self {
            max_size: None,
            ttl: Some(duration),
            eviction_policy: EvictionPolicy::None,
            track_metrics: false,
        }
    }

    /// Size-bounded LRU map without expiry
    pub fn lru(max_size: usize) -> Self {
        Self {
            max_size: Some(max_size),
            ttl: None,
            eviction_policy: EvictionPolicy::LRU,
            track_metrics: false,
        }
    }

    /// Combined TTL + LRU map
    pub fn ttl_lru(ttl: Duration, max_size: usize) -> Self {
        Self {
            max_size: Some(max_size),
            ttl: Some(ttl),
            eviction_policy: EvictionPolicy::LRU,
            track_metrics: false,
        }
    }
}

/// Builder for CacheConfig with fluent API
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Set the maximum number of entries
    pub fn max_size(mut self, size: usize) -> Self {
        self.config.max_size = Some(size);
        self
    }

    /// Set the entry time-to-live
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.config.ttl = Some(duration);
        self
    }

    /// Set the eviction policy
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.config.eviction_policy = policy;
        self
    }

    /// Enable or disable metrics collection
    pub fn track_metrics(mut self, enabled: bool) -> Self {
        self.config.track_metrics = enabled;
        self
    }

    /// Finish building
    pub fn build(self) -> CacheConfig {
        self.config
    }
}
