//! Thread-safe key/value map with TTL expiry and optional eviction.
//!
//! This is the leaf storage primitive of the workspace. It never takes a
//! distributed lock of its own: every operation, including the
//! read-modify-write in [`Cache::update`], runs under one short-lived
//! in-process `RwLock` guard.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::config::{CacheConfig, EvictionPolicy};
use super::stats::{CacheEvent, CacheStats, Counters};
use crate::time::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    written_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| now.duration_since(self.written_at) >= ttl)
    }
}

#[derive(Debug)]
struct CacheStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    entries: HashMap<K, CacheEntry<V>>,
    /// Tracks order for LRU/FIFO eviction
    access_order: Vec<K>,
}

impl<K, V> CacheStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new() -> Self {
        Self { entries: HashMap::new(), access_order: Vec::new() }
    }

    fn forget(&mut self, key: &K) -> Option<CacheEntry<V>> {
        self.access_order.retain(|k| k != key);
        self.entries.remove(key)
    }
}

/// Generic thread-safe map with TTL expiry and configurable eviction
///
/// # Type Parameters
/// - `K`: Key type (must be `Eq + Hash + Clone`)
/// - `V`: Value type (must be `Clone`)
/// - `C`: Clock type for time-based operations (defaults to `SystemClock`)
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use cachefront_common::cache::{Cache, CacheConfig};
///
/// let cache: Cache<String, u32> = Cache::new(CacheConfig::ttl(Duration::from_secs(3)));
/// cache.insert("get:k1".to_string(), 1);
///
/// // Atomic read-modify-write on a single key
/// let next = cache.update("get:k1".to_string(), |current| current.map(|n| n + 1));
/// assert_eq!(next, Some(2));
/// ```
pub struct Cache<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    storage: Arc<RwLock<CacheStorage<K, V>>>,
    config: CacheConfig,
    counters: Counters,
    clock: C,
}

impl<K, V> Cache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new cache with the given configuration using system clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    /// Create a new cache with a custom clock (useful for testing)
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            storage: Arc::new(RwLock::new(CacheStorage::new())),
            config,
            counters: Counters::default(),
            clock,
        }
    }

    /// The clock this cache measures TTLs with
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Insert a value, resetting the entry's TTL
    ///
    /// If the cache is at capacity, an entry will be evicted according to the
    /// configured eviction policy before inserting the new entry.
    pub fn insert(&self, key: K, value: V) {
        let mut storage = self.storage.write();
        self.store(&mut storage, key, value);
    }

    /// Get a live value
    ///
    /// Returns `None` if the key doesn't exist or if the entry has expired;
    /// expired entries are dropped on the way out.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut storage = self.storage.write();
        let now = self.clock.now();

        let expired = match storage.entries.get(key) {
            None => {
                self.record(CacheEvent::Miss);
                return None;
            }
            Some(entry) => entry.is_expired(now, self.config.ttl),
        };

        if expired {
            storage.forget(key);
            self.record(CacheEvent::Miss);
            self.record(CacheEvent::Expiration);
            return None;
        }

        let value = storage.entries.get(key).map(|entry| entry.value.clone());

        if self.config.eviction_policy == EvictionPolicy::LRU {
            storage.access_order.retain(|k| k != key);
            storage.access_order.push(key.clone());
        }

        self.record(CacheEvent::Hit);
        value
    }

    /// Read-modify-write a single key under one write guard
    ///
    /// `f` receives the live value (expired entries are presented as absent)
    /// and returns the value to store, or `None` to delete the key. Returns
    /// whatever `f` returned. A stored value gets a fresh TTL.
    pub fn update<F>(&self, key: K, f: F) -> Option<V>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let mut storage = self.storage.write();
        let now = self.clock.now();

        if storage.entries.get(&key).is_some_and(|entry| entry.is_expired(now, self.config.ttl)) {
            storage.forget(&key);
            self.record(CacheEvent::Expiration);
        }

        let next = f(storage.entries.get(&key).map(|entry| &entry.value));

        match &next {
            Some(value) => self.store(&mut storage, key, value.clone()),
            None => {
                storage.forget(&key);
            }
        }

        next
    }

    /// Remove a value, returning it only if it had not expired
    pub fn remove(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut storage = self.storage.write();
        storage
            .forget(key)
            .filter(|entry| !entry.is_expired(now, self.config.ttl))
            .map(|entry| entry.value)
    }

    /// Clear all entries from the cache
    pub fn clear(&self) {
        let mut storage = self.storage.write();
        storage.entries.clear();
        storage.access_order.clear();

        if self.config.track_metrics {
            self.counters.reset();
        }
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.storage.read().entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove expired entries
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let Some(ttl) = self.config.ttl else {
            return 0;
        };

        let now = self.clock.now();
        let mut storage = self.storage.write();

        let expired: Vec<K> = storage
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, Some(ttl)))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired {
            storage.forget(key);
            self.record(CacheEvent::Expiration);
        }

        expired.len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len(), self.config.max_size)
    }

    fn store(&self, storage: &mut CacheStorage<K, V>, key: K, value: V) {
        if let Some(max_size) = self.config.max_size {
            if storage.entries.len() >= max_size && !storage.entries.contains_key(&key) {
                self.evict_one(storage);
            }
        }

        let entry = CacheEntry { value, written_at: self.clock.now() };
        storage.entries.insert(key.clone(), entry);

        if matches!(self.config.eviction_policy, EvictionPolicy::LRU | EvictionPolicy::FIFO) {
            storage.access_order.retain(|k| k != &key);
            storage.access_order.push(key);
        }

        self.record(CacheEvent::Insert);
    }

    fn evict_one(&self, storage: &mut CacheStorage<K, V>) {
        let victim = match self.config.eviction_policy {
            EvictionPolicy::LRU | EvictionPolicy::FIFO => storage.access_order.first().cloned(),
            EvictionPolicy::None => None,
        };

        if let Some(key) = victim {
            storage.forget(&key);
            self.record(CacheEvent::Eviction);
        }
    }

    fn record(&self, event: CacheEvent) {
        if self.config.track_metrics {
            self.counters.bump(event);
        }
    }
}

impl<K, V, C> Clone for Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: self.config.clone(),
            counters: self.counters.clone(),
            clock: self.clock.clone(),
        }
    }
}
