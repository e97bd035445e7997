//! Paged search over persisted entities

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Total size of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalCount {
    pub total_results: u64,
    pub total_pages: u64,
}

impl TotalCount {
    /// Count with `total_pages = ceil(total_results / page_size)`
    pub fn new(total_results: u64, page_size: u32) -> Self {
        let total_pages = if page_size == 0 { 0 } else { total_results.div_ceil(u64::from(page_size)) };
        Self { total_results, total_pages }
    }
}

/// One page of results
///
/// `page_num` is 1-based and always echoes the requested page, including
/// pages past the end (which carry no items).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResults<T> {
    pub page_num: u32,
    pub page_size: u32,
    pub items: Vec<T>,
    pub total: Option<TotalCount>,
}

impl<T> PagedResults<T> {
    pub fn new(page_num: u32, page_size: u32, items: Vec<T>, total: Option<TotalCount>) -> Self {
        Self { page_num, page_size, items, total }
    }

    /// Same page metadata over different items
    pub fn with_items<U>(&self, items: Vec<U>) -> PagedResults<U> {
        PagedResults { page_num: self.page_num, page_size: self.page_size, items, total: self.total }
    }

    /// Zero-based offset of the first item on this page
    pub fn offset(page_num: u32, page_size: u32) -> u64 {
        u64::from(page_num.saturating_sub(1)) * u64::from(page_size)
    }
}

/// Store-agnostic filter over persisted JSON values
///
/// Ids are matched by prefix; `field_equals` compares dotted paths into the
/// stored value (`"address.city"`) against JSON literals. All conditions must
/// hold. Results are ordered by id ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub id_prefix: Option<String>,
    #[serde(default)]
    pub field_equals: Vec<(String, Value)>,
}

impl SearchQuery {
    /// Query matching every entity
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, path: impl Into<String>, expected: Value) -> Self {
        self.field_equals.push((path.into(), expected));
        self
    }

    /// Evaluate the query against an id and its stored value
    pub fn matches(&self, id: &str, value: &Value) -> bool {
        if let Some(prefix) = &self.id_prefix {
            if !id.starts_with(prefix.as_str()) {
                return false;
            }
        }

        self.field_equals.iter().all(|(path, expected)| {
            let actual = path.split('.').try_fold(value, |node, segment| node.get(segment));
            match actual {
                Some(actual) => actual == expected,
                None => expected.is_null(),
            }
        })
    }
}
