//! Persistence service adapters
//!
//! Both adapters share the same contract: `create` rejects an existing id,
//! `update` and `delete` report 0 rows for a missing id, batches are
//! all-or-nothing, and search pages are 1-based over ids in ascending order.

mod in_memory;
mod sqlite;

pub use in_memory::InMemoryPersistenceService;
pub use sqlite::SqlitePersistenceService;

use cachefront_domain::{BackendError, BackendResult};

/// Reject page 0 and empty pages before touching storage
fn check_page(page_num: u32, page_size: u32) -> BackendResult<()> {
    if page_num == 0 {
        return Err(BackendError::InvalidInput("page_num is 1-based".into()));
    }
    if page_size == 0 {
        return Err(BackendError::InvalidInput("page_size must be greater than 0".into()));
    }
    Ok(())
}
