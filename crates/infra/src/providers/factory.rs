use std::sync::Arc;

use cachefront_core::{CacheProvider, ProviderFactory};
use cachefront_domain::{CacheResult, ProviderSettings};
use tracing::debug;

use super::local_memory::LocalMemoryProvider;
use super::moka::MokaProvider;

/// Builds the provider named by each cache's settings
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProviderFactory;

impl ProviderFactory for DefaultProviderFactory {
    fn create(
        &self,
        cache_name: &str,
        settings: &ProviderSettings,
    ) -> CacheResult<Arc<dyn CacheProvider>> {
        debug!(cache = cache_name, ?settings, "Building cache provider");

        let provider: Arc<dyn CacheProvider> = match settings {
            ProviderSettings::LocalMemory { max_entries, .. } => {
                Arc::new(LocalMemoryProvider::new(cache_name, settings.ttl(), *max_entries))
            }
            ProviderSettings::Moka { max_capacity, .. } => {
                Arc::new(MokaProvider::new(cache_name, settings.ttl(), *max_capacity))
            }
        };
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for providers::factory.
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_builds_each_kind() {
        let factory = DefaultProviderFactory;

        for settings in [
            ProviderSettings::default(),
            ProviderSettings::Moka { ttl_millis: Some(60_000), max_capacity: Some(10) },
        ] {
            let provider = factory.create("sessions", &settings).unwrap();
            provider.put("k1", json!(true)).await.unwrap();
            assert_eq!(provider.get("k1").await.unwrap(), Some(json!(true)));
        }
    }
}
