//! Capability traits for cached values

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// A value versioned by an opaque token
///
/// A replace succeeds only when the caller's token matches the stored one,
/// and every successful write stamps a fresh token.
pub trait EtagEntity {
    fn etag(&self) -> Option<&str>;
    fn set_etag(&mut self, etag: String);
}

/// A value the cache engine can store, persist and compare
///
/// Types opt into optimistic concurrency by returning `Some` from the
/// accessors; [`impl_etag_cacheable!`](crate::impl_etag_cacheable) does this
/// for a struct with an etag field.
pub trait Cacheable: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static {
    fn as_etag_entity(&self) -> Option<&dyn EtagEntity> {
        None
    }

    fn as_etag_entity_mut(&mut self) -> Option<&mut dyn EtagEntity> {
        None
    }
}

crate::impl_cacheable!(String, bool, i32, i64, u32, u64, f64, serde_json::Value);

impl<T: Cacheable> Cacheable for Vec<T> {}

/// Fresh random version token
pub fn generate_etag() -> String {
    Uuid::new_v4().to_string()
}
