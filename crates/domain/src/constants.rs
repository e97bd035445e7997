//! Application constants
//!
//! Centralized location for domain-level defaults shared by the engine and
//! its adapters.

// Lock store
/// Reserved cache name; a cache registered under it takes no locks
pub const LOCK_CACHE_NAME: &str = "lockCache";
pub const DEFAULT_LOCK_LEASE_MS: u64 = 3000;
pub const DEFAULT_LOCK_ACQUIRE_TIMEOUT_MS: u64 = 1000;
pub const MIN_LOCK_RETRY_INTERVAL_MS: u64 = 1;
pub const MAX_LOCK_RETRY_INTERVAL_MS: u64 = 50;

// Lock name prefixes, one per orchestrator operation
pub const LOCK_OP_GET: &str = "get";
pub const LOCK_OP_PUT: &str = "put";
pub const LOCK_OP_PUT_IF_ABSENT: &str = "put-if-absent";
pub const LOCK_OP_REPLACE: &str = "replace";
pub const LOCK_OP_REMOVE: &str = "remove";

/// Create/replace flips before get-and-put reports a concurrency error
pub const MAX_GET_AND_PUT_ATTEMPTS: u32 = 4;

// Write-behind queue defaults
pub const DEFAULT_MAX_PROCESSING_RATE: u32 = 1000;
pub const DEFAULT_MAX_BACKGROUND_TASKS: usize = 200;
pub const DEFAULT_QUEUE_BATCH_SIZE: usize = 100;
pub const DEFAULT_QUEUE_POLL_INTERVAL_MS: u64 = 1000;

// Etag helper
pub const DEFAULT_ETAG_MAX_RETRIES: u32 = 3;

// Logging
pub const DEFAULT_LOG_LEVEL: &str = "info";
