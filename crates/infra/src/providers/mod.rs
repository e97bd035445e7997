//! Cache provider adapters
//!
//! - **`local_memory`**: the shared TTL map from `cachefront-common`, with
//!   optional LRU bound and hit/miss statistics
//! - **`moka`**: `moka::future::Cache` for high-concurrency workloads
//! - **`factory`**: picks an adapter from [`ProviderSettings`](cachefront_domain::ProviderSettings)

mod factory;
mod local_memory;
mod moka;

pub use factory::DefaultProviderFactory;
pub use local_memory::LocalMemoryProvider;
pub use moka::MokaProvider;
