//! Document store capability
//!
//! The repository talks to persistence only through [`DocumentStore`]: named
//! collections of plain [`Document`]s, addressed by conjunctive equality
//! [`Filter`]s. A MongoDB driver, or the bundled [`MemoryDocumentStore`],
//! can sit behind it.
//!
//! # Example
//!
//! ```rust
//! use research_tracker::storage::{DocumentStore, Filter, MemoryDocumentStore};
//!
//! # async fn example() -> research_tracker::Result<()> {
//! let store = MemoryDocumentStore::new("research_tracker");
//!
//! let mut doc = research_tracker::model::Document::new();
//! doc.insert("_id".into(), "exp-1".into());
//! doc.insert("author".into(), "Kamel".into());
//! store.insert_one("experiments", doc).await?;
//!
//! let found = store
//!     .find_one("experiments", &Filter::new().equals("author", "Kamel"))
//!     .await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::MemoryDocumentStore;
pub use crate::model::Document;

use std::cmp::Ordering;
use std::future::Future;

use serde_json::Value;

use crate::Result;

/// Conjunctive equality filter over top-level document fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Create an empty filter (matches every document).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on `_id`.
    #[must_use]
    pub fn by_id(id: &str) -> Self {
        Self::new().equals("_id", id)
    }

    /// Add an equality condition.
    #[must_use]
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// The conditions, in insertion order.
    #[must_use]
    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    /// Whether there are no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether `doc` satisfies every condition.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| doc.get(field).unwrap_or(&Value::Null) == expected)
    }
}

impl<K, V> FromIterator<(K, V)> for Filter
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            conditions: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest first
    Ascending,
    /// Largest (newest) first
    #[default]
    Descending,
}

/// Sort order for [`DocumentStore::find`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// Field to sort on
    pub field: String,
    /// Direction
    pub order: SortOrder,
}

impl Sort {
    /// Create a sort on `field`.
    #[must_use]
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    /// Compare two documents on this sort's field.
    #[must_use]
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = compare_values(a.get(&self.field), b.get(&self.field));
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Cross-type ordering of field values:
/// missing/null < numbers < strings < objects < arrays < booleans.
#[must_use]
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Object(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Bool(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x
            .iter()
            .zip(y.iter())
            .map(|(x, y)| compare_values(Some(x), Some(y)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Document store capability consumed by the repository.
///
/// Implementations provide their own concurrency safety; single-document
/// writes are expected to be atomic. When disconnected, every operation
/// fails with `Error::StorageUnavailable`.
pub trait DocumentStore: Send + Sync {
    /// Name of the database backing this store.
    fn database_name(&self) -> &str;

    /// Last known connectivity state.
    fn is_connected(&self) -> bool;

    /// Round-trip to the backend.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// Declare an index on `field`. Indexes are performance hints only.
    fn create_index(&self, collection: &str, field: &str)
        -> impl Future<Output = Result<()>> + Send;

    /// Insert a document, returning its `_id`.
    ///
    /// Fails with `Error::DuplicateKey` if the `_id` is taken.
    fn insert_one(
        &self,
        collection: &str,
        doc: Document,
    ) -> impl Future<Output = Result<String>> + Send;

    /// First document matching `filter`.
    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<Option<Document>>> + Send;

    /// Documents matching `filter`, optionally sorted and capped.
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Document>>> + Send;

    /// Merge `patch` into the first matching document; returns the number of
    /// documents actually modified.
    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Document,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Delete the first matching document; returns the number removed.
    fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Delete every matching document; returns the number removed.
    fn delete_many(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Count matching documents.
    fn count_documents(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> impl Future<Output = Result<u64>> + Send;
}
