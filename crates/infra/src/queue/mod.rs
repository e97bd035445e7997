//! Queue client adapters

mod in_memory;

pub use in_memory::InMemoryQueueClient;
