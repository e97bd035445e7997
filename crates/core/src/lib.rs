//! # Cachefront Core
//!
//! The cache engine - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for cache providers, persistence services and queues
//! - The lease lock built on the common TTL map
//! - The consistency-aware cache orchestrator and its registry
//! - Write-behind reconciliation and the etag update helper
//!
//! ## Architecture Principles
//! - Depends only on `cachefront-common` and `cachefront-domain`
//! - No database, network, or file code
//! - All collaborators via traits

pub mod cache;
pub mod lock;
pub mod queue;

// Re-export specific items to avoid ambiguity
pub use cache::etag_update::{EtagUpdateHelper, UpdateOutcome};
pub use cache::ports::{CacheProvider, PersistenceService, ProviderFactory};
pub use cache::registry::{CacheConfiguration, CacheRegistry};
pub use cache::service::CacheService;
pub use lock::{LeaseLock, LockGuard};
pub use queue::ports::{MessageProcessor, QueueClient};
pub use queue::write_behind::WriteBehindProcessor;
