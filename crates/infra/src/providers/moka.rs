use std::time::Duration;

use async_trait::async_trait;
use cachefront_core::CacheProvider;
use cachefront_domain::BackendResult;
use moka::future::Cache;
use serde_json::Value;

/// Provider backed by `moka::future::Cache`
///
/// Expiry and capacity eviction are handled by moka on its own clock.
pub struct MokaProvider {
    name: String,
    entries: Cache<String, Value>,
}

impl MokaProvider {
    pub fn new(name: impl Into<String>, ttl: Option<Duration>, max_capacity: Option<u64>) -> Self {
        let mut builder = Cache::<String, Value>::builder();
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }
        if let Some(max_capacity) = max_capacity {
            builder = builder.max_capacity(max_capacity);
        }

        Self { name: name.into(), entries: builder.build() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Approximate entry count; pending evictions may not be reflected yet
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

#[async_trait]
impl CacheProvider for MokaProvider {
    async fn get(&self, key: &str) -> BackendResult<Option<Value>> {
        Ok(self.entries.get(key).await)
    }

    async fn put(&self, key: &str, value: Value) -> BackendResult<()> {
        self.entries.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> BackendResult<Option<Value>> {
        Ok(self.entries.remove(key).await)
    }

    async fn clear(&self) -> BackendResult<bool> {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
        Ok(true)
    }
}
