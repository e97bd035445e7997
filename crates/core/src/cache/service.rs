//! Cache orchestrator - consistency-mode-aware operations over a provider
//! and an optional persistence service

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cachefront_common::error::ErrorClassification;
use cachefront_common::time::SharedClock;
use cachefront_domain::constants::{
    LOCK_OP_GET, LOCK_OP_PUT, LOCK_OP_PUT_IF_ABSENT, LOCK_OP_REMOVE, LOCK_OP_REPLACE,
    MAX_GET_AND_PUT_ATTEMPTS,
};
use cachefront_domain::{
    generate_etag, retry_interval_for, BackendError, CacheError, CacheResult, CacheSettings,
    Cacheable, ConsistencyMode, LockOwner, LockSettings, PagedResults, SearchQuery,
};
use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use super::ports::{CacheProvider, PersistenceService};
use crate::lock::{lock_name, LeaseLock, LockGuard};
use crate::queue::ports::QueueClient;

/// Durable side effect of a cache write
#[derive(Debug, Clone, Copy)]
enum Persist {
    Create,
    Update,
    Delete,
}

/// Cache façade enforcing its consistency mode
///
/// Every mutating operation writes the provider first, then persists
/// (write-through) or enqueues a key notification (write-behind). If the
/// second step fails the provider is restored to its prior value before the
/// error is returned.
pub struct CacheService {
    name: String,
    mode: ConsistencyMode,
    provider: Arc<dyn CacheProvider>,
    persistence: Option<Arc<dyn PersistenceService>>,
    queue_client: Option<Arc<dyn QueueClient>>,
    lock: Option<LeaseLock>,
    lock_settings: LockSettings,
}

impl fmt::Debug for CacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("locking", &self.lock.is_some())
            .finish_non_exhaustive()
    }
}

impl CacheService {
    /// Build a cache, checking that `settings.mode` has the collaborators it
    /// needs
    ///
    /// The reserved lock-store cache gets no lock of its own.
    pub fn new(
        settings: &CacheSettings,
        provider: Arc<dyn CacheProvider>,
        persistence: Option<Arc<dyn PersistenceService>>,
        queue_client: Option<Arc<dyn QueueClient>>,
        clock: SharedClock,
    ) -> CacheResult<Self> {
        settings.validate()?;

        if settings.mode.is_persistent() && persistence.is_none() {
            return Err(CacheError::configuration(format!(
                "cache '{}': {} requires a persistence service",
                settings.name, settings.mode
            )));
        }
        if settings.mode == ConsistencyMode::WriteBehind && queue_client.is_none() {
            return Err(CacheError::configuration(format!(
                "cache '{}': write_behind requires a queue client",
                settings.name
            )));
        }

        let lock = (!settings.is_lock_cache()).then(|| LeaseLock::new(settings.lock.lease(), clock));

        Ok(Self {
            name: settings.name.clone(),
            mode: settings.mode,
            provider,
            persistence: settings.mode.is_persistent().then_some(persistence).flatten(),
            queue_client: (settings.mode == ConsistencyMode::WriteBehind)
                .then_some(queue_client)
                .flatten(),
            lock,
            lock_settings: settings.lock,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ConsistencyMode {
        self.mode
    }

    pub(crate) fn provider(&self) -> &Arc<dyn CacheProvider> {
        &self.provider
    }

    pub(crate) fn persistence(&self) -> Option<&Arc<dyn PersistenceService>> {
        self.persistence.as_ref()
    }

    /// Read through the cache, falling back to the store in persistent modes
    ///
    /// A store hit is written back to the provider before returning.
    #[instrument(skip(self), fields(cache = %self.name))]
    pub async fn get<T: Cacheable>(&self, key: &str) -> CacheResult<Option<T>> {
        Ok(self.fetch::<T>(key).await?.map(|(value, _)| value))
    }

    /// Store `value` only if `key` has no value; returns the existing value
    /// untouched otherwise
    ///
    /// Etag entities get a fresh etag on create.
    #[instrument(skip(self, value), fields(cache = %self.name))]
    pub async fn get_and_put_if_absent<T: Cacheable>(
        &self,
        key: &str,
        mut value: T,
    ) -> CacheResult<Option<T>> {
        let _guard = self.lock_for(LOCK_OP_PUT_IF_ABSENT, key).await?;

        if let Some(existing) = self.get::<T>(key).await? {
            debug!(key, "Key present, put-if-absent is a no-op");
            return Ok(Some(existing));
        }

        if let Some(entity) = value.as_etag_entity_mut() {
            entity.set_etag(generate_etag());
        }

        let encoded = encode(&value)?;
        self.write_and_persist(key, encoded, None, Persist::Create, "GetAndPutIfAbsent").await?;
        Ok(None)
    }

    /// Replace an existing value; no-op returning `None` if `key` is absent
    ///
    /// For etag entities the caller's etag must match the stored one, else a
    /// concurrency error is returned and nothing is written. A successful
    /// replace stamps a fresh etag.
    #[instrument(skip(self, value), fields(cache = %self.name))]
    pub async fn get_and_replace<T: Cacheable>(
        &self,
        key: &str,
        mut value: T,
    ) -> CacheResult<Option<T>> {
        let _guard = self.lock_for(LOCK_OP_REPLACE, key).await?;

        let Some((current, prior)) = self.fetch::<T>(key).await? else {
            debug!(key, "Key absent, replace is a no-op");
            return Ok(None);
        };

        if let Some(entity) = value.as_etag_entity_mut() {
            let stored = current.as_etag_entity().and_then(|stored| stored.etag());
            if stored != entity.etag() {
                warn!(key, "Rejecting replace with stale etag");
                return Err(CacheError::concurrency(format!(
                    "Object was already updated first. Key: {key}"
                )));
            }
            entity.set_etag(generate_etag());
        }

        let encoded = encode(&value)?;
        self.write_and_persist(key, encoded, Some(prior), Persist::Update, "GetAndReplace").await?;
        Ok(Some(current))
    }

    /// Create or replace, returning the prior value
    ///
    /// Callers on the same key are serialized. A create or remove racing in
    /// through the single-purpose operations flips the dispatch and retries;
    /// a key that keeps flipping fails with a concurrency error.
    #[instrument(skip(self, value), fields(cache = %self.name))]
    pub async fn get_and_put<T: Cacheable>(&self, key: &str, value: T) -> CacheResult<Option<T>> {
        let _guard = self.lock_for(LOCK_OP_PUT, key).await?;

        let mut exists = self.get::<T>(key).await?.is_some();
        for attempt in 1..=MAX_GET_AND_PUT_ATTEMPTS {
            if exists {
                debug!(key, attempt, "GetAndPut: update");
                if let Some(prior) = self.get_and_replace(key, value.clone()).await? {
                    return Ok(Some(prior));
                }
            } else {
                debug!(key, attempt, "GetAndPut: create");
                if self.get_and_put_if_absent(key, value.clone()).await?.is_none() {
                    return Ok(None);
                }
            }
            exists = !exists;
        }

        warn!(key, "GetAndPut gave up after repeated concurrent writes");
        Err(CacheError::concurrency(format!(
            "Key kept changing between create and replace. Key: {key}"
        )))
    }

    /// Remove from the cache and, per mode, from the store; returns the
    /// removed value
    #[instrument(skip(self), fields(cache = %self.name))]
    pub async fn remove<T: Cacheable>(&self, key: &str) -> CacheResult<Option<T>> {
        let _guard = self.lock_for(LOCK_OP_REMOVE, key).await?;

        let (current, prior) = self.fetch::<T>(key).await?.unzip();

        let outcome = async {
            self.provider.remove(key).await?;
            self.propagate(key, None, Persist::Delete).await
        }
        .await;

        if let Err(err) = outcome {
            self.rollback(key, prior).await;
            return Err(self.io_error(format!("Error occurred when removing item from cache. Key: {key}"), err));
        }

        Ok(current)
    }

    /// Page through persisted entities matching `query`
    ///
    /// Each id is resolved through [`CacheService::get`], filling the cache
    /// as a side effect. Ids removed between the search and the read are
    /// left out of `items`.
    #[instrument(skip(self, query), fields(cache = %self.name))]
    pub async fn search_by_query<T: Cacheable>(
        &self,
        query: &SearchQuery,
        page_num: u32,
        page_size: u32,
        with_total: bool,
    ) -> CacheResult<PagedResults<T>> {
        let Some(persistence) = self.persistence.as_ref() else {
            return Err(CacheError::not_supported(format!(
                "search requires a persistent cache; '{}' is {}",
                self.name, self.mode
            )));
        };

        let ids = persistence
            .search_ids(query, page_num, page_size, with_total)
            .await
            .map_err(|err| self.io_error("Error searching persisted ids".to_string(), err))?;

        let values = try_join_all(ids.items.iter().map(|id| self.get::<T>(id))).await?;
        Ok(ids.with_items(values.into_iter().flatten().collect()))
    }

    /// Drop one key from the cache without touching the store
    pub async fn flush_key(&self, key: &str) -> CacheResult<bool> {
        let keys = [key.to_string()];
        self.flush(Some(&keys[..])).await
    }

    /// Drop the given keys, or everything, from the cache without touching
    /// the store
    #[instrument(skip(self, keys), fields(cache = %self.name))]
    pub async fn flush(&self, keys: Option<&[String]>) -> CacheResult<bool> {
        match keys {
            None => self
                .provider
                .clear()
                .await
                .map_err(|err| self.io_error("Error occurred when flushing the cache".to_string(), err)),
            Some(keys) => {
                try_join_all(keys.iter().map(|key| self.provider.remove(key)))
                    .await
                    .map_err(|err| self.io_error("Error occurred when flushing keys".to_string(), err))?;
                Ok(true)
            }
        }
    }

    /// Acquire a named lock for `owner`
    ///
    /// On the reserved lock-store cache this returns a guard holding nothing.
    pub async fn acquire_lock(
        &self,
        name: &str,
        owner: LockOwner,
        timeout: Duration,
        lease: Duration,
    ) -> CacheResult<LockGuard> {
        match &self.lock {
            None => Ok(LockGuard::noop(name, owner)),
            Some(lock) => {
                let retry = retry_interval_for(timeout);
                lock.acquire(name, owner, timeout, lease, retry).await
            }
        }
    }

    async fn lock_for(&self, operation: &str, key: &str) -> CacheResult<LockGuard> {
        self.acquire_lock(
            &lock_name(operation, key),
            LockOwner::new(),
            self.lock_settings.acquire_timeout(),
            self.lock_settings.lease(),
        )
        .await
    }

    /// Locked read returning the decoded value with the raw one it came from
    ///
    /// Rollbacks restore the raw value so fields `T` drops survive.
    async fn fetch<T: Cacheable>(&self, key: &str) -> CacheResult<Option<(T, Value)>> {
        let _guard = self.lock_for(LOCK_OP_GET, key).await?;

        let Some(raw) = self
            .load(key)
            .await
            .map_err(|err| self.io_error(format!("Error getting item from cache. Key: {key}"), err))?
        else {
            return Ok(None);
        };
        let value = decode::<T>(raw.clone())?;
        Ok(Some((value, raw)))
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, BackendError> {
        if let Some(value) = self.provider.get(key).await? {
            debug!(key, "Cache hit");
            return Ok(Some(value));
        }

        let Some(persistence) = self.persistence.as_ref() else {
            debug!(key, "Cache miss");
            return Ok(None);
        };

        let stored = persistence.get_by_id(key).await?;
        if let Some(value) = &stored {
            debug!(key, "Backfilling cache from store");
            self.provider.put(key, value.clone()).await?;
        }
        Ok(stored)
    }

    async fn write_and_persist(
        &self,
        key: &str,
        value: Value,
        prior: Option<Value>,
        persist: Persist,
        operation: &str,
    ) -> CacheResult<()> {
        let outcome = async {
            self.provider.put(key, value.clone()).await?;
            self.propagate(key, Some(&value), persist).await
        }
        .await;

        if let Err(err) = outcome {
            self.rollback(key, prior).await;
            return Err(self.io_error(format!("Error occurred during {operation}. Key: {key}"), err));
        }
        Ok(())
    }

    /// Carry a provider write to the store, synchronously or via the queue
    async fn propagate(
        &self,
        key: &str,
        value: Option<&Value>,
        persist: Persist,
    ) -> Result<(), BackendError> {
        match self.mode {
            ConsistencyMode::NonPersistent => Ok(()),
            ConsistencyMode::WriteThrough => {
                let persistence = self
                    .persistence
                    .as_ref()
                    .ok_or_else(|| BackendError::Internal("persistence service missing".into()))?;
                let rows = match (persist, value) {
                    (Persist::Create, Some(value)) => persistence.create(key, value).await?,
                    (Persist::Update, Some(value)) => persistence.update(key, value).await?,
                    (Persist::Delete, _) => persistence.delete(key).await?,
                    (_, None) => {
                        return Err(BackendError::Internal(format!("{persist:?} without a value")))
                    }
                };
                debug!(key, rows, ?persist, "Persisted write-through");
                Ok(())
            }
            ConsistencyMode::WriteBehind => {
                let queue = self
                    .queue_client
                    .as_ref()
                    .ok_or_else(|| BackendError::Internal("queue client missing".into()))?;
                queue.enqueue(key.to_string()).await?;
                debug!(key, "Enqueued write-behind notification");
                Ok(())
            }
        }
    }

    /// Restore the provider to `prior`, or remove `key` if there was none
    async fn rollback(&self, key: &str, prior: Option<Value>) {
        warn!(cache = %self.name, key, "Rolling back cache write");
        let restored = match prior {
            Some(value) => self.provider.put(key, value).await,
            None => self.provider.remove(key).await.map(|_| ()),
        };
        if let Err(err) = restored {
            error!(cache = %self.name, key, error = %err, "Cache rollback failed");
        }
    }

    fn io_error(&self, message: String, source: BackendError) -> CacheError {
        let err = CacheError::io(message, source);
        error!(
            cache = %self.name,
            error = %err,
            severity = %err.severity(),
            retryable = err.is_retryable(),
            "Cache operation failed"
        );
        err
    }
}

fn encode<T: Cacheable>(value: &T) -> CacheResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| CacheError::io("Error serializing cache value", BackendError::from(err)))
}

fn decode<T: Cacheable>(value: Value) -> CacheResult<T> {
    serde_json::from_value(value)
        .map_err(|err| CacheError::io("Error deserializing cache value", BackendError::from(err)))
}
