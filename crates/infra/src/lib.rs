//! # Cachefront Infrastructure
//!
//! Concrete adapters for the ports defined in `cachefront-core`.
//!
//! This crate contains:
//! - Cache providers (in-process `Cache`, Moka) and the provider factory
//! - Persistence stores (in-memory, SQLite via an r2d2 pool)
//! - The in-process notification queue that drives write-behind
//! - Configuration loading and tracing initialisation
//!
//! ## Architecture
//! - Implements traits defined in `cachefront-core`
//! - Depends on `cachefront-domain` and `cachefront-common`
//! - Contains all blocking and runtime-bound code

pub mod config;
pub mod errors;
pub mod observability;
pub mod persistence;
pub mod providers;
pub mod queue;

pub use errors::InfraError;
pub use observability::init_tracing;
pub use persistence::{InMemoryPersistenceService, SqlitePersistenceService};
pub use providers::{DefaultProviderFactory, LocalMemoryProvider, MokaProvider};
pub use queue::InMemoryQueueClient;
