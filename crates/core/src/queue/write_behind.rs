//! Deferred persistence for write-behind caches
//!
//! Queue messages carry only a key. The processor treats the cache as the
//! desired state and the store as the actual state, and persists the
//! difference, so redelivered or reordered notifications converge on the
//! same result.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use cachefront_domain::{CacheError, CacheResult, PersistenceAction};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::ports::MessageProcessor;
use crate::cache::registry::CacheRegistry;
use crate::cache::service::CacheService;

/// Reconciles one cache's keys with its persistence service
pub struct WriteBehindProcessor {
    cache_name: String,
    registry: Weak<CacheRegistry>,
}

impl WriteBehindProcessor {
    pub fn new(cache_name: impl Into<String>, registry: Weak<CacheRegistry>) -> Self {
        Self { cache_name: cache_name.into(), registry }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    fn resolve_cache(&self) -> CacheResult<Arc<CacheService>> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| CacheError::configuration("cache registry has been dropped"))?;
        registry.get_cache(&self.cache_name).ok_or_else(|| {
            CacheError::configuration(format!("cache '{}' is not registered", self.cache_name))
        })
    }
}

/// Action needed to move the store from `actual` to `desired`
fn reconcile(id: &str, desired: Option<&Value>, actual: Option<&Value>) -> Option<PersistenceAction> {
    match (desired, actual) {
        (Some(_), None) => Some(PersistenceAction::create(id)),
        (Some(desired), Some(actual)) if desired != actual => Some(PersistenceAction::update(id)),
        (None, Some(_)) => Some(PersistenceAction::delete(id)),
        _ => None,
    }
}

#[async_trait]
impl MessageProcessor for WriteBehindProcessor {
    #[instrument(skip(self, messages), fields(cache = %self.cache_name, messages = messages.len()))]
    async fn process(&self, messages: &[String]) -> CacheResult<()> {
        let cache = self.resolve_cache()?;
        let persistence = cache.persistence().cloned().ok_or_else(|| {
            CacheError::configuration(format!("cache '{}' has no persistence service", self.cache_name))
        })?;

        let ids: BTreeSet<&str> = messages.iter().map(String::as_str).collect();
        let mut actions = Vec::new();
        let mut items = HashMap::new();

        for id in ids {
            let desired = cache
                .provider()
                .get(id)
                .await
                .map_err(|err| CacheError::io(format!("Error reading cached value. Key: {id}"), err))?;
            let actual = persistence
                .get_by_id(id)
                .await
                .map_err(|err| CacheError::io(format!("Error reading stored value. Key: {id}"), err))?;

            let Some(action) = reconcile(id, desired.as_ref(), actual.as_ref()) else {
                debug!(key = id, "Store already matches cache");
                continue;
            };
            if let Some(value) = desired {
                items.insert(id.to_string(), value);
            }
            actions.push(action);
        }

        if actions.is_empty() {
            debug!("Nothing to persist");
            return Ok(());
        }

        let results = persistence.batch_persist(&actions, &items).await.map_err(|err| {
            warn!(actions = actions.len(), error = %err, "Write-behind batch failed, awaiting redelivery");
            CacheError::io("Error persisting write-behind batch", err)
        })?;

        let applied = results.values().filter(|rows| **rows > 0).count();
        info!(actions = actions.len(), applied, "Write-behind batch persisted");
        Ok(())
    }
}
