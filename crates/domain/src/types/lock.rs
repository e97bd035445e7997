//! Lease lock records

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a logical lock holder
///
/// Acquisitions made with the same owner are reentrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockOwner(Uuid);

impl LockOwner {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LockOwner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LockOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stored state of one held lock name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Wall-clock expiry in milliseconds since the UNIX epoch
    pub expires_at_millis: u64,
    pub owner: LockOwner,
    /// Reentrancy depth, at least 1 while stored
    pub count: u32,
}

impl LockRecord {
    /// First acquisition by `owner`
    pub fn claim(owner: LockOwner, now_millis: u64, lease_millis: u64) -> Self {
        Self { expires_at_millis: now_millis.saturating_add(lease_millis), owner, count: 1 }
    }

    /// Reentrant acquisition: one level deeper with a renewed lease
    #[must_use]
    pub fn reenter(&self, now_millis: u64, lease_millis: u64) -> Self {
        Self {
            expires_at_millis: now_millis.saturating_add(lease_millis),
            owner: self.owner,
            count: self.count.saturating_add(1),
        }
    }

    /// One level shallower, or `None` when the last level is released
    pub fn released(&self) -> Option<Self> {
        (self.count > 1).then(|| Self { count: self.count - 1, ..self.clone() })
    }

    pub fn is_expired(&self, now_millis: u64) -> bool {
        now_millis >= self.expires_at_millis
    }

    pub fn is_owned_by(&self, owner: &LockOwner) -> bool {
        self.owner == *owner
    }
}
