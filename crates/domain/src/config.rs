//! Configuration structures
//!
//! These are plain serde types; loading them from files and the environment
//! lives in the infra crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_LOCK_ACQUIRE_TIMEOUT_MS, DEFAULT_LOCK_LEASE_MS, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_BACKGROUND_TASKS, DEFAULT_MAX_PROCESSING_RATE, DEFAULT_QUEUE_BATCH_SIZE,
    DEFAULT_QUEUE_POLL_INTERVAL_MS, LOCK_CACHE_NAME, MAX_LOCK_RETRY_INTERVAL_MS,
    MIN_LOCK_RETRY_INTERVAL_MS,
};
use crate::errors::{CacheError, CacheResult};
use crate::types::ConsistencyMode;

/// Top-level file configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub caches: Vec<CacheSettings>,
}

impl AppConfig {
    /// Validate every cache entry and reject duplicate names
    pub fn validate(&self) -> CacheResult<()> {
        let mut seen = std::collections::HashSet::new();
        for cache in &self.caches {
            cache.validate()?;
            if !seen.insert(cache.name.as_str()) {
                return Err(CacheError::configuration(format!(
                    "cache '{}' is configured more than once",
                    cache.name
                )));
            }
        }
        Ok(())
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive, e.g. `info` or `cachefront_core=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

/// Settings for one named cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub name: String,
    #[serde(default)]
    pub mode: ConsistencyMode,
    #[serde(default)]
    pub provider: ProviderSettings,
    /// Required for [`ConsistencyMode::WriteBehind`]
    #[serde(default)]
    pub queue: Option<QueueSettings>,
    #[serde(default)]
    pub lock: LockSettings,
}

impl CacheSettings {
    pub fn new(name: impl Into<String>, mode: ConsistencyMode) -> Self {
        Self {
            name: name.into(),
            mode,
            provider: ProviderSettings::default(),
            queue: None,
            lock: LockSettings::default(),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: ProviderSettings) -> Self {
        self.provider = provider;
        self
    }

    #[must_use]
    pub fn with_queue(mut self, queue: QueueSettings) -> Self {
        self.queue = Some(queue);
        self
    }

    #[must_use]
    pub fn with_lock(mut self, lock: LockSettings) -> Self {
        self.lock = lock;
        self
    }

    /// Whether this is the reserved lock-store cache, which takes no locks
    pub fn is_lock_cache(&self) -> bool {
        self.name == LOCK_CACHE_NAME
    }

    /// Checks that need nothing but the settings themselves
    ///
    /// Collaborator presence (persistence service, queue client) is checked
    /// where those handles are supplied.
    pub fn validate(&self) -> CacheResult<()> {
        if self.name.trim().is_empty() {
            return Err(CacheError::configuration("cache name must not be empty"));
        }

        if self.is_lock_cache() && self.mode.is_persistent() {
            return Err(CacheError::configuration(format!(
                "'{LOCK_CACHE_NAME}' is reserved for the lock store and must be non_persistent"
            )));
        }

        if self.mode == ConsistencyMode::WriteBehind {
            let queue = self.queue.as_ref().ok_or_else(|| {
                CacheError::configuration(format!(
                    "cache '{}': write_behind requires queue settings",
                    self.name
                ))
            })?;
            queue.validate().map_err(|reason| {
                CacheError::configuration(format!("cache '{}': {reason}", self.name))
            })?;
        }

        self.lock
            .validate()
            .map_err(|reason| CacheError::configuration(format!("cache '{}': {reason}", self.name)))?;
        self.provider
            .validate()
            .map_err(|reason| CacheError::configuration(format!("cache '{}': {reason}", self.name)))
    }
}

/// Cache backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderSettings {
    /// TTL map in process memory
    LocalMemory {
        #[serde(default)]
        ttl_millis: Option<u64>,
        #[serde(default)]
        max_entries: Option<usize>,
    },
    /// moka asynchronous cache
    Moka {
        #[serde(default)]
        ttl_millis: Option<u64>,
        #[serde(default)]
        max_capacity: Option<u64>,
    },
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self::LocalMemory { ttl_millis: None, max_entries: None }
    }
}

impl ProviderSettings {
    /// Entry time-to-live, if configured
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            Self::LocalMemory { ttl_millis, .. } | Self::Moka { ttl_millis, .. } => {
                ttl_millis.map(Duration::from_millis)
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::LocalMemory { ttl_millis: Some(0), .. } | Self::Moka { ttl_millis: Some(0), .. } => {
                Err("provider ttl_millis must be greater than 0".to_string())
            }
            Self::LocalMemory { max_entries: Some(0), .. } => {
                Err("provider max_entries must be greater than 0".to_string())
            }
            Self::Moka { max_capacity: Some(0), .. } => {
                Err("provider max_capacity must be greater than 0".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Lease lock timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSettings {
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_millis: u64,
    #[serde(default = "default_lease")]
    pub lease_millis: u64,
}

fn default_acquire_timeout() -> u64 {
    DEFAULT_LOCK_ACQUIRE_TIMEOUT_MS
}

fn default_lease() -> u64 {
    DEFAULT_LOCK_LEASE_MS
}

impl Default for LockSettings {
    fn default() -> Self {
        Self { acquire_timeout_millis: default_acquire_timeout(), lease_millis: default_lease() }
    }
}

impl LockSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_millis)
    }

    pub fn lease(&self) -> Duration {
        Duration::from_millis(self.lease_millis)
    }

    /// Poll interval while waiting for a held lock
    pub fn retry_interval(&self) -> Duration {
        retry_interval_for(self.acquire_timeout())
    }

    fn validate(&self) -> Result<(), String> {
        if self.lease_millis == 0 {
            return Err("lock lease_millis must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Poll interval for an acquire budget: a hundredth of it, kept within
/// 1..=50 ms
pub fn retry_interval_for(timeout: Duration) -> Duration {
    let millis = u64::try_from(timeout.as_millis() / 100).unwrap_or(u64::MAX);
    Duration::from_millis(millis.clamp(MIN_LOCK_RETRY_INTERVAL_MS, MAX_LOCK_RETRY_INTERVAL_MS))
}

/// Write-behind delivery settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Messages per second across all workers
    #[serde(default = "default_rate")]
    pub max_processing_rate: u32,
    /// Batches processed concurrently
    #[serde(default = "default_background_tasks")]
    pub max_background_tasks: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_millis: u64,
}

fn default_rate() -> u32 {
    DEFAULT_MAX_PROCESSING_RATE
}

fn default_background_tasks() -> usize {
    DEFAULT_MAX_BACKGROUND_TASKS
}

fn default_batch_size() -> usize {
    DEFAULT_QUEUE_BATCH_SIZE
}

fn default_poll_interval() -> u64 {
    DEFAULT_QUEUE_POLL_INTERVAL_MS
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_processing_rate: default_rate(),
            max_background_tasks: default_background_tasks(),
            batch_size: default_batch_size(),
            poll_interval_millis: default_poll_interval(),
        }
    }
}

impl QueueSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("queue batch_size must be greater than 0".to_string());
        }
        if self.max_background_tasks == 0 {
            return Err("queue max_background_tasks must be greater than 0".to_string());
        }
        if self.max_processing_rate == 0 {
            return Err("queue max_processing_rate must be greater than 0".to_string());
        }
        Ok(())
    }
}
