//! # Cachefront Domain
//!
//! Data types shared by the cache engine and its adapters.
//!
//! This crate contains:
//! - The error taxonomy surfaced to callers (`CacheError`) and the
//!   collaborator failure type (`BackendError`)
//! - Consistency modes, persistence actions, paging and query types
//! - Lock records and owner identities
//! - The `Cacheable` / `EtagEntity` capability for cached values
//! - Configuration structures and constants
//!
//! ## Architecture
//! - Depends only on the `foundation` tier of `cachefront-common`
//! - Only external dependencies allowed
//! - Pure data and validation, no I/O

pub mod cacheable;
pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use cacheable::{generate_etag, Cacheable, EtagEntity};
pub use config::*;
pub use errors::*;
pub use types::*;
