//! In-process key/value map with TTL expiry
//!
//! The distributed lock keeps its lease records here, and the local-memory
//! cache provider stores serialized values here. Both rely on
//! [`Cache::update`] for single-key read-modify-write without an outer lock.
//!
//! # Example
//! ```
//! use std::time::Duration;
//!
//! use cachefront_common::cache::{Cache, CacheConfig};
//!
//! let cache: Cache<String, Vec<u8>> =
//!     Cache::new(CacheConfig::ttl_lru(Duration::from_secs(300), 1000));
//! cache.insert("session".to_string(), vec![1, 2, 3]);
//! assert_eq!(cache.get(&"session".to_string()), Some(vec![1, 2, 3]));
//! ```

mod config;
mod core;
mod stats;

pub use core::Cache;

pub use config::{CacheConfig, CacheConfigBuilder, EvictionPolicy};
pub use stats::CacheStats;
