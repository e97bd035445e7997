use std::time::Duration;

use async_trait::async_trait;
use cachefront_common::cache::{Cache, CacheConfig, CacheStats};
use cachefront_core::CacheProvider;
use cachefront_domain::BackendResult;
use serde_json::Value;
use tracing::debug;

/// Provider over the in-process TTL map
///
/// Without a TTL or size bound entries live until removed.
pub struct LocalMemoryProvider {
    name: String,
    entries: Cache<String, Value>,
}

impl LocalMemoryProvider {
    pub fn new(name: impl Into<String>, ttl: Option<Duration>, max_entries: Option<usize>) -> Self {
        let mut builder = CacheConfig::builder().track_metrics(true);
        if let Some(ttl) = ttl {
            builder = builder.ttl(ttl);
        }
        if let Some(max_entries) = max_entries {
            builder = builder.max_size(max_entries);
        }

        Self { name: name.into(), entries: Cache::new(builder.build()) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> CacheStats {
        self.entries.stats()
    }

    /// Drop expired entries now instead of on next access
    pub fn purge_expired(&self) -> usize {
        let purged = self.entries.cleanup_expired();
        if purged > 0 {
            debug!(cache = %self.name, purged, "Purged expired entries");
        }
        purged
    }
}

#[async_trait]
impl CacheProvider for LocalMemoryProvider {
    async fn get(&self, key: &str) -> BackendResult<Option<Value>> {
        Ok(self.entries.get(&key.to_string()))
    }

    async fn put(&self, key: &str, value: Value) -> BackendResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> BackendResult<Option<Value>> {
        Ok(self.entries.remove(&key.to_string()))
    }

    async fn clear(&self) -> BackendResult<bool> {
        self.entries.clear();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for providers::local_memory.
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_put_get_remove_clear() {
        let provider = LocalMemoryProvider::new("sessions", None, None);

        provider.put("k1", json!({ "v": 1 })).await.unwrap();
        provider.put("k2", json!(2)).await.unwrap();
        assert_eq!(provider.get("k1").await.unwrap(), Some(json!({ "v": 1 })));

        assert_eq!(provider.remove("k1").await.unwrap(), Some(json!({ "v": 1 })));
        assert!(provider.get("k1").await.unwrap().is_none());

        assert!(provider.clear().await.unwrap());
        assert!(provider.get("k2").await.unwrap().is_none());
    }

    /// Validates the size bound and statistics.
    ///
    /// Assertions:
    /// - The store never holds more than `max_entries`.
    /// - Hits and misses are counted.
    #[tokio::test]
    async fn test_bounded_provider_tracks_stats() {
        let provider = LocalMemoryProvider::new("bounded", None, Some(2));

        for i in 0..5 {
            provider.put(&format!("k{i}"), json!(i)).await.unwrap();
        }
        provider.get("k4").await.unwrap();
        provider.get("k0").await.unwrap();

        let stats = provider.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.max_size, Some(2));
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
