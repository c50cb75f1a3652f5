//! In-memory document store using `DashMap`.
//!
//! Data is lost on process restart. Useful for tests, demos, and as the
//! reference behaviour for real drivers.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use super::{Document, DocumentStore, Filter, Sort};
use crate::{Error, Result};

/// In-memory document store.
///
/// Each collection is an insertion-ordered list of documents inside a
/// lock-free concurrent map. Connectivity can be toggled with
/// [`MemoryDocumentStore::set_connected`] to exercise degraded mode.
///
/// # Example
///
/// ```rust
/// use research_tracker::storage::{DocumentStore, Filter, MemoryDocumentStore};
///
/// # async fn example() -> research_tracker::Result<()> {
/// let store = MemoryDocumentStore::new("research_tracker");
/// store.set_connected(false);
/// assert!(store.find_one("experiments", &Filter::new()).await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryDocumentStore {
    database: String,
    collections: DashMap<String, Vec<Document>>,
    indexes: DashMap<String, Vec<String>>,
    connected: AtomicBool,
}

impl MemoryDocumentStore {
    /// Create a connected, empty store.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: DashMap::new(),
            indexes: DashMap::new(),
            connected: AtomicBool::new(true),
        }
    }

    /// Simulate a connection drop or recovery.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Indexed fields recorded for `collection`.
    #[must_use]
    pub fn indexes(&self, collection: &str) -> Vec<String> {
        self.indexes
            .get(collection)
            .map(|fields| fields.value().clone())
            .unwrap_or_default()
    }

    /// Total number of documents across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collections.iter().map(|c| c.value().len()).sum()
    }

    /// Whether the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every document (indexes are kept).
    pub fn clear(&self) {
        self.collections.clear();
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::StorageUnavailable)
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new("research_tracker")
    }
}

fn document_id(doc: &Document) -> Option<&str> {
    doc.get("_id").and_then(Value::as_str)
}

impl DocumentStore for MemoryDocumentStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_connected()
    }

    async fn create_index(&self, collection: &str, field: &str) -> Result<()> {
        self.ensure_connected()?;
        let mut fields = self.indexes.entry(collection.to_string()).or_default();
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
        Ok(())
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> Result<String> {
        self.ensure_connected()?;
        let id = match document_id(&doc) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                doc.insert("_id".into(), Value::from(id.clone()));
                id
            }
        };

        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| document_id(d) == Some(id.as_str())) {
            return Err(Error::DuplicateKey(id));
        }
        docs.push(doc);
        Ok(id)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        self.ensure_connected()?;
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        self.ensure_connected()?;
        let mut matched: Vec<Document> = self
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();

        // stable: ties keep insertion order
        if let Some(sort) = sort {
            matched.sort_by(|a, b| sort.compare(a, b));
        }
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn update_one(&self, collection: &str, filter: &Filter, patch: Document) -> Result<u64> {
        self.ensure_connected()?;
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        let Some(doc) = docs.iter_mut().find(|d| filter.matches(d)) else {
            return Ok(0);
        };

        if let Some(new_id) = patch.get("_id") {
            if doc.get("_id") != Some(new_id) {
                return Err(Error::StorageError(
                    "the _id field is immutable and cannot be updated".to_string(),
                ));
            }
        }

        let mut modified = false;
        for (field, value) in patch {
            if doc.get(&field) != Some(&value) {
                doc.insert(field, value);
                modified = true;
            }
        }
        Ok(u64::from(modified))
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64> {
        self.ensure_connected()?;
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter().position(|d| filter.matches(d)) {
            Some(pos) => {
                docs.remove(pos);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64> {
        self.ensure_connected()?;
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64> {
        self.ensure_connected()?;
        Ok(self
            .collections
            .get(collection)
            .map_or(0, |docs| docs.iter().filter(|d| filter.matches(d)).count()) as u64)
    }
}
