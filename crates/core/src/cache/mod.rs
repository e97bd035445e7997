//! Consistency-aware cache orchestration
//!
//! [`service::CacheService`] is the façade callers use; the registry builds
//! and owns instances by name, and the etag helper layers optimistic retries
//! on top.

pub mod etag_update;
pub mod ports;
pub mod registry;
pub mod service;
