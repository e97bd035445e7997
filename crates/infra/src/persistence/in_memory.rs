use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use cachefront_core::PersistenceService;
use cachefront_domain::{
    BackendError, BackendResult, PagedResults, PersistenceAction, SearchQuery, TotalCount, WriteType,
};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::check_page;

/// Persistence over an ordered in-process map
///
/// Useful for tests and single-process deployments; a batch is applied under
/// one write lock and validated before anything changes.
#[derive(Debug, Default)]
pub struct InMemoryPersistenceService {
    rows: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryPersistenceService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn apply(
        rows: &mut BTreeMap<String, Value>,
        action: &PersistenceAction,
        value: Option<&Value>,
    ) -> BackendResult<u64> {
        let changed = match action.write_type {
            WriteType::Create => {
                let value = value.ok_or_else(|| missing_value(action))?;
                if rows.contains_key(&action.id) {
                    return Err(BackendError::InvalidInput(format!("duplicate id: {}", action.id)));
                }
                rows.insert(action.id.clone(), value.clone());
                true
            }
            WriteType::Update => {
                let value = value.ok_or_else(|| missing_value(action))?;
                match rows.get_mut(&action.id) {
                    Some(slot) => {
                        *slot = value.clone();
                        true
                    }
                    None => false,
                }
            }
            WriteType::Delete => rows.remove(&action.id).is_some(),
        };
        Ok(u64::from(changed))
    }
}

fn missing_value(action: &PersistenceAction) -> BackendError {
    BackendError::InvalidInput(format!("no value supplied for {action}"))
}

#[async_trait]
impl PersistenceService for InMemoryPersistenceService {
    async fn create(&self, id: &str, value: &Value) -> BackendResult<u64> {
        Self::apply(&mut self.rows.write(), &PersistenceAction::create(id), Some(value))
    }

    async fn get_by_id(&self, id: &str) -> BackendResult<Option<Value>> {
        Ok(self.rows.read().get(id).cloned())
    }

    async fn update(&self, id: &str, value: &Value) -> BackendResult<u64> {
        Self::apply(&mut self.rows.write(), &PersistenceAction::update(id), Some(value))
    }

    async fn delete(&self, id: &str) -> BackendResult<u64> {
        Self::apply(&mut self.rows.write(), &PersistenceAction::delete(id), None)
    }

    async fn batch_persist(
        &self,
        actions: &[PersistenceAction],
        items: &HashMap<String, Value>,
    ) -> BackendResult<HashMap<PersistenceAction, u64>> {
        let mut rows = self.rows.write();

        // Apply to a scratch copy so a failing action leaves the store untouched
        let mut staged = rows.clone();
        let mut results: HashMap<PersistenceAction, u64> = HashMap::with_capacity(actions.len());
        for action in actions {
            let changed = Self::apply(&mut staged, action, items.get(&action.id))?;
            *results.entry(action.clone()).or_default() |= changed;
        }

        *rows = staged;
        debug!(actions = actions.len(), "Batch applied");
        Ok(results)
    }

    async fn search_ids(
        &self,
        query: &SearchQuery,
        page_num: u32,
        page_size: u32,
        with_total: bool,
    ) -> BackendResult<PagedResults<String>> {
        check_page(page_num, page_size)?;

        let rows = self.rows.read();
        let matching = || rows.iter().filter(|(id, value)| query.matches(id, value)).map(|(id, _)| id);

        let offset = usize::try_from(PagedResults::<String>::offset(page_num, page_size)).unwrap_or(usize::MAX);
        let items: Vec<String> = matching().skip(offset).take(page_size as usize).cloned().collect();
        let total = with_total.then(|| TotalCount::new(matching().count() as u64, page_size));

        Ok(PagedResults::new(page_num, page_size, items, total))
    }
}
