//! Port interfaces for cache backends and durable stores
//!
//! Values cross these boundaries as `serde_json::Value`; the orchestrator
//! converts to and from caller types.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cachefront_domain::{
    BackendResult, CacheResult, PagedResults, PersistenceAction, ProviderSettings, SearchQuery,
};
use serde_json::Value;

/// Fast key/value backend holding the cached copy
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Get a value, `None` when absent or expired
    async fn get(&self, key: &str) -> BackendResult<Option<Value>>;

    /// Insert or overwrite a value
    async fn put(&self, key: &str, value: Value) -> BackendResult<()>;

    /// Remove a value, returning what was there
    async fn remove(&self, key: &str) -> BackendResult<Option<Value>>;

    /// Drop every entry; `false` if the backend could not clear
    async fn clear(&self) -> BackendResult<bool>;
}

/// Durable store behind persistent consistency modes
#[async_trait]
pub trait PersistenceService: Send + Sync {
    /// Insert a new entity, returning rows changed
    async fn create(&self, id: &str, value: &Value) -> BackendResult<u64>;

    /// Fetch an entity by id
    async fn get_by_id(&self, id: &str) -> BackendResult<Option<Value>>;

    /// Overwrite an existing entity, returning rows changed
    async fn update(&self, id: &str, value: &Value) -> BackendResult<u64>;

    /// Delete an entity, returning rows changed
    async fn delete(&self, id: &str) -> BackendResult<u64>;

    /// Apply all actions atomically
    ///
    /// `items` carries the value for every create/update id. Each action maps
    /// to 1 if its write affected rows, else 0.
    async fn batch_persist(
        &self,
        actions: &[PersistenceAction],
        items: &HashMap<String, Value>,
    ) -> BackendResult<HashMap<PersistenceAction, u64>>;

    /// Page through ids matching `query`, ordered ascending
    ///
    /// `page_num` is 1-based; pages past the end are empty.
    async fn search_ids(
        &self,
        query: &SearchQuery,
        page_num: u32,
        page_size: u32,
        with_total: bool,
    ) -> BackendResult<PagedResults<String>>;
}

/// Builds the provider for a cache from its settings
pub trait ProviderFactory: Send + Sync {
    fn create(
        &self,
        cache_name: &str,
        settings: &ProviderSettings,
    ) -> CacheResult<Arc<dyn CacheProvider>>;
}
