//! Domain types and models

pub mod lock;
pub mod paging;
pub mod persistence;

use serde::{Deserialize, Serialize};

pub use lock::{LockOwner, LockRecord};
pub use paging::{PagedResults, SearchQuery, TotalCount};
pub use persistence::{PersistenceAction, WriteType};

/// How writes reach the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    /// Cache only; no persistence service involved
    #[default]
    NonPersistent,
    /// Every write is persisted synchronously before returning
    WriteThrough,
    /// Writes enqueue a key notification; persistence is eventual
    WriteBehind,
}

crate::impl_domain_status_conversions!(ConsistencyMode {
    NonPersistent => "non_persistent",
    WriteThrough => "write_through",
    WriteBehind => "write_behind",
});

impl ConsistencyMode {
    /// Whether reads fall back to, and writes reach, a persistence service
    pub fn is_persistent(self) -> bool {
        matches!(self, Self::WriteThrough | Self::WriteBehind)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_consistency_mode_parsing() {
        assert_eq!(ConsistencyMode::from_str("Write_Behind").unwrap(), ConsistencyMode::WriteBehind);
        assert_eq!(ConsistencyMode::WriteThrough.to_string(), "write_through");
        assert!(ConsistencyMode::from_str("eventual").is_err());
    }

    #[test]
    fn test_persistent_modes() {
        assert!(!ConsistencyMode::NonPersistent.is_persistent());
        assert!(ConsistencyMode::WriteThrough.is_persistent());
        assert!(ConsistencyMode::WriteBehind.is_persistent());
    }
}
