//! Lease-based distributed locking
//!
//! Lock names are scoped per operation and key (`"replace:k1"`), so an
//! operation may call another on the same key without deadlocking itself.
//! Different operation kinds on one key do not exclude each other.

mod lease;

pub use lease::{LeaseLock, LockGuard};

/// Lock name for an operation on a key
pub fn lock_name(operation: &str, key: &str) -> String {
    format!("{operation}:{key}")
}
