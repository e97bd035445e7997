//! Named cache instances, created once and shared

use std::sync::{Arc, Weak};

use cachefront_common::time::{SharedClock, SystemClock};
use cachefront_domain::{CacheError, CacheResult, CacheSettings, ConsistencyMode};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::ports::{PersistenceService, ProviderFactory};
use super::service::CacheService;
use crate::queue::ports::QueueClient;
use crate::queue::write_behind::WriteBehindProcessor;

/// Everything needed to build one cache
#[derive(Clone)]
pub struct CacheConfiguration {
    pub settings: CacheSettings,
    /// Required for write-through and write-behind
    pub persistence: Option<Arc<dyn PersistenceService>>,
    /// Required for write-behind
    pub queue_client: Option<Arc<dyn QueueClient>>,
    /// Stops the write-behind delivery loop
    pub cancellation: CancellationToken,
}

impl CacheConfiguration {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            persistence: None,
            queue_client: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn PersistenceService>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_queue_client(mut self, queue_client: Arc<dyn QueueClient>) -> Self {
        self.queue_client = Some(queue_client);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Reject mode/collaborator combinations that cannot work
    pub fn validate(&self) -> CacheResult<()> {
        self.settings.validate()?;

        let name = &self.settings.name;
        if self.settings.mode.is_persistent() && self.persistence.is_none() {
            return Err(CacheError::configuration(format!(
                "cache '{name}': {} requires a persistence service",
                self.settings.mode
            )));
        }
        if self.settings.mode == ConsistencyMode::WriteBehind && self.queue_client.is_none() {
            return Err(CacheError::configuration(format!(
                "cache '{name}': write_behind requires a queue client"
            )));
        }
        Ok(())
    }
}

struct Worker {
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

/// Application-owned registry of caches by name
///
/// Write-behind processors resolve their cache through a weak handle to the
/// registry, so construct it with [`CacheRegistry::new`] and keep the `Arc`.
pub struct CacheRegistry {
    caches: DashMap<String, Arc<CacheService>>,
    workers: DashMap<String, Worker>,
    provider_factory: Arc<dyn ProviderFactory>,
    clock: SharedClock,
    self_ref: Weak<CacheRegistry>,
}

impl CacheRegistry {
    pub fn new(provider_factory: Arc<dyn ProviderFactory>) -> Arc<Self> {
        Self::with_clock(provider_factory, Arc::new(SystemClock))
    }

    /// Registry whose lock leases are measured with `clock`
    pub fn with_clock(provider_factory: Arc<dyn ProviderFactory>, clock: SharedClock) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            caches: DashMap::new(),
            workers: DashMap::new(),
            provider_factory,
            clock,
            self_ref: self_ref.clone(),
        })
    }

    /// Return the cache named in `config`, creating it on first use
    ///
    /// The configuration is validated on every call, so a bad configuration
    /// fails here rather than on first use. Creating a write-behind cache
    /// starts its delivery loop.
    pub fn get_or_create(&self, config: CacheConfiguration) -> CacheResult<Arc<CacheService>> {
        config.validate()?;
        let name = config.settings.name.clone();

        let service = match self.caches.entry(name.clone()) {
            Entry::Occupied(existing) => return Ok(Arc::clone(existing.get())),
            Entry::Vacant(slot) => {
                let provider = self.provider_factory.create(&name, &config.settings.provider)?;
                let service = Arc::new(CacheService::new(
                    &config.settings,
                    provider,
                    config.persistence.clone(),
                    config.queue_client.clone(),
                    Arc::clone(&self.clock),
                )?);
                slot.insert(Arc::clone(&service));
                service
            }
        };

        if let Err(err) = self.start_write_behind(&config) {
            self.caches.remove(&name);
            return Err(err);
        }

        info!(cache = %name, mode = %config.settings.mode, "Cache created");
        Ok(service)
    }

    /// Look up an existing cache without creating one
    pub fn get_cache(&self, name: &str) -> Option<Arc<CacheService>> {
        self.caches.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Forget a cache, stopping its delivery loop
    pub fn remove_cache(&self, name: &str) -> Option<Arc<CacheService>> {
        if let Some((_, worker)) = self.workers.remove(name) {
            worker.cancellation.cancel();
        }
        self.caches.remove(name).map(|(_, service)| service)
    }

    pub fn cache_names(&self) -> Vec<String> {
        self.caches.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Cancel every delivery loop and wait for them to finish
    pub async fn shutdown(&self) {
        let names: Vec<String> = self.workers.iter().map(|entry| entry.key().clone()).collect();

        for name in names {
            let Some((_, worker)) = self.workers.remove(&name) else {
                continue;
            };
            worker.cancellation.cancel();
            if let Err(err) = worker.handle.await {
                warn!(cache = %name, error = %err, "Write-behind worker ended abnormally");
            }
        }
        info!("Cache registry shut down");
    }

    fn start_write_behind(&self, config: &CacheConfiguration) -> CacheResult<()> {
        if config.settings.mode != ConsistencyMode::WriteBehind {
            return Ok(());
        }

        let (Some(queue_client), Some(queue_settings)) =
            (config.queue_client.as_ref(), config.settings.queue)
        else {
            return Err(CacheError::configuration("write_behind requires a queue"));
        };

        let name = config.settings.name.clone();
        let processor = Arc::new(WriteBehindProcessor::new(name.clone(), self.self_ref.clone()));
        let handle = queue_client
            .dequeue_and_process(queue_settings, processor, config.cancellation.clone())
            .map_err(|err| CacheError::io(format!("Error starting write-behind for '{name}'"), err))?;

        info!(
            cache = %name,
            batch_size = queue_settings.batch_size,
            poll_interval_ms = queue_settings.poll_interval_millis,
            "Write-behind delivery started"
        );
        self.workers.insert(name, Worker { cancellation: config.cancellation.clone(), handle });
        Ok(())
    }
}
