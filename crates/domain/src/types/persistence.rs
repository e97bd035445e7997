//! Persistence intents used to batch durable writes

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of durable write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteType {
    Create,
    Update,
    Delete,
}

crate::impl_domain_status_conversions!(WriteType {
    Create => "create",
    Update => "update",
    Delete => "delete",
});

/// One durable write intent, equal by `(id, write_type)`
///
/// Used as a map key so a batch never carries the same intent twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersistenceAction {
    pub id: String,
    pub write_type: WriteType,
}

impl PersistenceAction {
    pub fn new(id: impl Into<String>, write_type: WriteType) -> Self {
        Self { id: id.into(), write_type }
    }

    pub fn create(id: impl Into<String>) -> Self {
        Self::new(id, WriteType::Create)
    }

    pub fn update(id: impl Into<String>) -> Self {
        Self::new(id, WriteType::Update)
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::new(id, WriteType::Delete)
    }
}

impl fmt::Display for PersistenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.write_type, self.id)
    }
}
