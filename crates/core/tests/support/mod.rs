//! Shared test helpers for `cachefront-core` integration tests.
//!
//! In-memory fakes for every port, each with switches for injecting
//! collaborator failures and counters for asserting what was written.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cachefront_core::{CacheProvider, MessageProcessor, PersistenceService, ProviderFactory, QueueClient};
use cachefront_domain::{
    BackendError, BackendResult, CacheResult, PagedResults, PersistenceAction, ProviderSettings,
    QueueSettings, SearchQuery, TotalCount, WriteType,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Versioned entity used across the suites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub owner: String,
    pub balance: i64,
    pub etag: Option<String>,
}

cachefront_domain::impl_etag_cacheable!(Account, etag);

impl Account {
    pub fn new(owner: &str, balance: i64) -> Self {
        Self { owner: owner.to_string(), balance, etag: None }
    }
}

/// Provider over a plain map; `fail_puts` makes every put fail and
/// `put_delay_ms` stalls each put before it lands
#[derive(Default)]
pub struct MemoryProvider {
    entries: Mutex<HashMap<String, Value>>,
    pub fail_puts: AtomicBool,
    pub put_delay_ms: AtomicU64,
}

impl MemoryProvider {
    pub fn snapshot(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Write behind the orchestrator's back
    pub fn insert_raw(&self, key: &str, value: Value) {
        self.entries.lock().unwrap().insert(key.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl CacheProvider for MemoryProvider {
    async fn get(&self, key: &str) -> BackendResult<Option<Value>> {
        Ok(self.snapshot(key))
    }

    async fn put(&self, key: &str, value: Value) -> BackendResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("provider offline".into()));
        }
        let delay = self.put_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.insert_raw(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> BackendResult<Option<Value>> {
        Ok(self.entries.lock().unwrap().remove(key))
    }

    async fn clear(&self) -> BackendResult<bool> {
        self.entries.lock().unwrap().clear();
        Ok(true)
    }
}

/// Store over an ordered map, counting every row it changes
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<String, Value>>,
    batches: Mutex<Vec<Vec<PersistenceAction>>>,
    pub fail_writes: AtomicBool,
    pub writes: AtomicUsize,
}

impl MemoryStore {
    pub fn row(&self, id: &str) -> Option<Value> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn rows(&self) -> BTreeMap<String, Value> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, id: &str, value: Value) {
        self.rows.lock().unwrap().insert(id.to_string(), value);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    fn check_writable(&self) -> BackendResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Database("store is read-only".into()));
        }
        Ok(())
    }

    fn apply(
        rows: &mut BTreeMap<String, Value>,
        action: &PersistenceAction,
        value: Option<&Value>,
    ) -> u64 {
        let changed = match (action.write_type, value) {
            (WriteType::Create, Some(value)) if !rows.contains_key(&action.id) => {
                rows.insert(action.id.clone(), value.clone());
                true
            }
            (WriteType::Update, Some(value)) if rows.contains_key(&action.id) => {
                rows.insert(action.id.clone(), value.clone());
                true
            }
            (WriteType::Delete, _) => rows.remove(&action.id).is_some(),
            _ => false,
        };
        u64::from(changed)
    }

    fn write(&self, action: &PersistenceAction, value: Option<&Value>) -> BackendResult<u64> {
        self.check_writable()?;
        let rows = Self::apply(&mut self.rows.lock().unwrap(), action, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(rows)
    }
}

#[async_trait]
impl PersistenceService for MemoryStore {
    async fn create(&self, id: &str, value: &Value) -> BackendResult<u64> {
        self.write(&PersistenceAction::create(id), Some(value))
    }

    async fn get_by_id(&self, id: &str) -> BackendResult<Option<Value>> {
        Ok(self.row(id))
    }

    async fn update(&self, id: &str, value: &Value) -> BackendResult<u64> {
        self.write(&PersistenceAction::update(id), Some(value))
    }

    async fn delete(&self, id: &str) -> BackendResult<u64> {
        self.write(&PersistenceAction::delete(id), None)
    }

    async fn batch_persist(
        &self,
        actions: &[PersistenceAction],
        items: &HashMap<String, Value>,
    ) -> BackendResult<HashMap<PersistenceAction, u64>> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        let results = actions
            .iter()
            .map(|action| (action.clone(), Self::apply(&mut rows, action, items.get(&action.id))))
            .collect();
        self.writes.fetch_add(actions.len(), Ordering::SeqCst);
        self.batches.lock().unwrap().push(actions.to_vec());
        Ok(results)
    }

    async fn search_ids(
        &self,
        query: &SearchQuery,
        page_num: u32,
        page_size: u32,
        with_total: bool,
    ) -> BackendResult<PagedResults<String>> {
        let rows = self.rows.lock().unwrap();
        let matching: Vec<String> =
            rows.iter().filter(|(id, value)| query.matches(id, value)).map(|(id, _)| id.clone()).collect();

        let offset = usize::try_from(PagedResults::<String>::offset(page_num, page_size)).unwrap();
        let items = matching.iter().skip(offset).take(page_size as usize).cloned().collect();
        let total = with_total.then(|| TotalCount::new(matching.len() as u64, page_size));
        Ok(PagedResults::new(page_num, page_size, items, total))
    }
}

/// Queue that records payloads and delivers them only when drained
#[derive(Default)]
pub struct RecordingQueue {
    messages: Mutex<Vec<String>>,
    processor: Mutex<Option<Arc<dyn MessageProcessor>>>,
    pub fail_enqueue: AtomicBool,
}

impl RecordingQueue {
    pub fn pending(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Deliver everything pending as one batch; messages stay queued on
    /// failure
    pub async fn drain(&self) -> CacheResult<usize> {
        let batch = std::mem::take(&mut *self.messages.lock().unwrap());
        self.deliver(batch).await
    }

    /// Deliver a single message through the processor's one-message path
    pub async fn deliver_one(&self, message: &str) -> CacheResult<()> {
        let processor = self.processor.lock().unwrap().clone().expect("no processor registered");
        processor.process_one(message).await
    }

    /// Deliver an arbitrary batch, bypassing the pending list
    pub async fn deliver(&self, batch: Vec<String>) -> CacheResult<usize> {
        let processor = self.processor.lock().unwrap().clone().expect("no processor registered");
        match processor.process(&batch).await {
            Ok(()) => Ok(batch.len()),
            Err(err) => {
                self.messages.lock().unwrap().extend(batch);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl QueueClient for RecordingQueue {
    async fn enqueue(&self, payload: String) -> BackendResult<()> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(BackendError::Queue("queue closed".into()));
        }
        self.messages.lock().unwrap().push(payload);
        Ok(())
    }

    fn dequeue_and_process(
        &self,
        _settings: QueueSettings,
        processor: Arc<dyn MessageProcessor>,
        cancellation: CancellationToken,
    ) -> BackendResult<JoinHandle<()>> {
        *self.processor.lock().unwrap() = Some(processor);
        Ok(tokio::spawn(async move { cancellation.cancelled().await }))
    }
}

/// Factory handing out one [`MemoryProvider`] per cache name
#[derive(Default)]
pub struct MemoryProviderFactory {
    providers: Mutex<HashMap<String, Arc<MemoryProvider>>>,
    pub created: AtomicUsize,
}

impl MemoryProviderFactory {
    pub fn provider(&self, cache_name: &str) -> Arc<MemoryProvider> {
        Arc::clone(self.providers.lock().unwrap().get(cache_name).expect("provider not created"))
    }
}

impl ProviderFactory for MemoryProviderFactory {
    fn create(
        &self,
        cache_name: &str,
        _settings: &ProviderSettings,
    ) -> CacheResult<Arc<dyn CacheProvider>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let provider = Arc::clone(
            self.providers.lock().unwrap().entry(cache_name.to_string()).or_default(),
        );
        Ok(provider)
    }
}
