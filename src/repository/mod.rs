//! Repository - stateless façade between entities and the document store
//!
//! Every operation serializes entities to documents on the way in and
//! deserializes them on the way out. Store failures never escape: they are
//! logged and turned into sentinels (`None`, empty `Vec`, `false`, `0`), so
//! callers can tell "store unavailable" from "nothing found" only through
//! [`TrackerRepository::is_connected`] or [`TrackerRepository::health_check`].
//!
//! # Example
//!
//! ```rust
//! use research_tracker::model::{Entity, Experiment, RunResult};
//! use research_tracker::repository::TrackerRepository;
//! use research_tracker::storage::MemoryDocumentStore;
//!
//! # async fn example() -> research_tracker::Result<()> {
//! let repo = TrackerRepository::new(MemoryDocumentStore::default());
//! repo.initialize().await;
//!
//! let experiment = Experiment::builder("Baseline").author("Kamel").build()?;
//! let id = repo.insert(&experiment).await.expect("stored");
//! repo.insert(&RunResult::new(&id)?).await;
//!
//! assert!(repo.delete::<Experiment>(&id).await);
//! assert!(repo.find_results_for_experiment(&id).await.is_empty());
//! # Ok(())
//! # }
//! ```

mod report;

pub use report::{HealthReport, HealthStatus, Statistics};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::model::{timestamp, Collection, Document, Entity, RunResult};
use crate::storage::{DocumentStore, Filter, Sort, SortOrder};

/// Default cap on the number of entities returned by [`TrackerRepository::find`].
pub const DEFAULT_LIMIT: usize = 100;

/// Sorting and paging options for [`TrackerRepository::find`].
///
/// Defaults to newest first (`created_at` descending), at most
/// [`DEFAULT_LIMIT`] entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOptions {
    sort: Sort,
    limit: Option<usize>,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            sort: Sort::new("created_at", SortOrder::Descending),
            limit: Some(DEFAULT_LIMIT),
        }
    }
}

impl FindOptions {
    /// Default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort on `field` in the given order.
    #[must_use]
    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Sort::new(field, order);
        self
    }

    /// Return at most `limit` entities.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Return every matching entity.
    #[must_use]
    pub const fn unlimited(mut self) -> Self {
        self.limit = None;
        self
    }

    /// Current sort.
    #[must_use]
    pub const fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Current cap, if any.
    #[must_use]
    pub const fn max_results(&self) -> Option<usize> {
        self.limit
    }
}

/// Repository over a [`DocumentStore`].
///
/// Holds no state beyond the store handle; no locking, retries, or
/// multi-document transactions. Concurrent `update`/`delete` on the same
/// entity interleave as the store allows (last write wins).
#[derive(Debug)]
pub struct TrackerRepository<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> TrackerRepository<S> {
    /// Wrap a store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Get the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Whether the store is reachable.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    /// Create the index hints for every collection.
    ///
    /// Returns `false` if the store is disconnected or any index could not
    /// be created; failures are logged and otherwise ignored.
    pub async fn initialize(&self) -> bool {
        if !self.degraded("initialize") {
            return false;
        }
        let mut ok = true;
        for collection in Collection::ALL {
            for field in collection.index_fields() {
                if let Err(e) = self.store.create_index(collection.as_str(), field).await {
                    warn!("Could not create index {collection}.{field}: {e}");
                    ok = false;
                }
            }
        }
        if ok {
            info!("Database indexes created for {}", self.store.database_name());
        }
        ok
    }

    /// Log and report degraded mode. Returns `true` when connected.
    fn degraded(&self, operation: &str) -> bool {
        let connected = self.store.is_connected();
        if !connected {
            warn!("{operation}: not connected to document store");
        }
        connected
    }

    /// Validate and store an entity.
    ///
    /// Returns the stored id, or `None` if the entity is invalid, the id
    /// already exists, or the store is unavailable.
    pub async fn insert<E: Entity>(&self, entity: &E) -> Option<String> {
        if !self.degraded("insert") {
            return None;
        }
        if let Err(e) = entity.validate() {
            warn!("Refusing to insert invalid {} {}: {e}", E::COLLECTION, entity.id());
            return None;
        }
        match self
            .store
            .insert_one(E::COLLECTION.as_str(), entity.to_representation())
            .await
        {
            Ok(id) => {
                info!("Inserted {} {id}", E::COLLECTION);
                Some(id)
            }
            Err(e) => {
                error!("Failed to insert {} {}: {e}", E::COLLECTION, entity.id());
                None
            }
        }
    }

    /// Find an entity by id.
    pub async fn find_by_id<E: Entity>(&self, id: &str) -> Option<E> {
        if !self.degraded("find_by_id") {
            return None;
        }
        match self
            .store
            .find_one(E::COLLECTION.as_str(), &Filter::by_id(id))
            .await
        {
            Ok(doc) => doc.and_then(|doc| decode::<E>(&doc)),
            Err(e) => {
                error!("Failed to find {} {id}: {e}", E::COLLECTION);
                None
            }
        }
    }

    /// Find entities matching every condition in `filter`.
    ///
    /// Documents that no longer deserialize are logged and skipped.
    pub async fn find<E: Entity>(&self, filter: &Filter, options: &FindOptions) -> Vec<E> {
        if !self.degraded("find") {
            return Vec::new();
        }
        match self
            .store
            .find(
                E::COLLECTION.as_str(),
                filter,
                Some(options.sort()),
                options.max_results(),
            )
            .await
        {
            Ok(docs) => docs.iter().filter_map(decode::<E>).collect(),
            Err(e) => {
                error!("Failed to find {}: {e}", E::COLLECTION);
                Vec::new()
            }
        }
    }

    /// Merge `updates` into the stored entity and refresh `updated_at`.
    ///
    /// The merged document must still deserialize into a valid entity;
    /// otherwise nothing is written. `_id` and `created_at` cannot be
    /// changed; patched fields are stored in normalized form. Returns
    /// whether a document changed.
    pub async fn update<E: Entity>(&self, id: &str, mut updates: Document) -> bool {
        if !self.degraded("update") {
            return false;
        }
        for immutable in ["_id", "created_at"] {
            if updates.remove(immutable).is_some() {
                debug!("Ignoring update of immutable field {immutable} on {id}");
            }
        }

        let filter = Filter::by_id(id);
        let current = match self.store.find_one(E::COLLECTION.as_str(), &filter).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                debug!("No {} {id} to update", E::COLLECTION);
                return false;
            }
            Err(e) => {
                error!("Failed to load {} {id} for update: {e}", E::COLLECTION);
                return false;
            }
        };

        updates.insert(
            "updated_at".into(),
            Value::from(timestamp::format(timestamp::now())),
        );
        let mut merged = current;
        merged.extend(updates.clone());
        let canonical = match E::from_representation(&merged) {
            Ok(entity) => entity.to_representation(),
            Err(e) => {
                warn!("Rejected update of {} {id}: {e}", E::COLLECTION);
                return false;
            }
        };

        // Write the patched keys in their normalized form; unknown keys are dropped.
        let patch: Document = updates
            .keys()
            .filter_map(|key| canonical.get(key).map(|value| (key.clone(), value.clone())))
            .collect();

        match self
            .store
            .update_one(E::COLLECTION.as_str(), &filter, patch)
            .await
        {
            Ok(modified) => modified > 0,
            Err(e) => {
                error!("Failed to update {} {id}: {e}", E::COLLECTION);
                false
            }
        }
    }

    /// Delete an entity and everything that depends on it.
    ///
    /// Dependents are removed even when the entity itself is already gone.
    /// Returns whether the entity was removed.
    pub async fn delete<E: Entity>(&self, id: &str) -> bool {
        if !self.degraded("delete") {
            return false;
        }
        let removed = match self
            .store
            .delete_one(E::COLLECTION.as_str(), &Filter::by_id(id))
            .await
        {
            Ok(count) => count > 0,
            Err(e) => {
                error!("Failed to delete {} {id}: {e}", E::COLLECTION);
                return false;
            }
        };

        for (collection, field) in E::DEPENDENTS {
            let filter = Filter::new().equals(*field, id);
            match self.store.delete_many(collection.as_str(), &filter).await {
                Ok(count) if count > 0 => {
                    info!("Deleted {count} {collection} belonging to {} {id}", E::COLLECTION);
                }
                Ok(_) => {}
                Err(e) => error!("Failed to delete {collection} of {} {id}: {e}", E::COLLECTION),
            }
        }

        if removed {
            info!("Deleted {} {id}", E::COLLECTION);
        }
        removed
    }

    /// All results of an experiment, by run number.
    pub async fn find_results_for_experiment(&self, experiment_id: &str) -> Vec<RunResult> {
        self.find(
            &Filter::new().equals("experiment_id", experiment_id),
            &FindOptions::new()
                .sort_by("run_number", SortOrder::Ascending)
                .unlimited(),
        )
        .await
    }

    /// Delete every result of an experiment; returns how many were removed.
    pub async fn delete_results_for_experiment(&self, experiment_id: &str) -> u64 {
        if !self.degraded("delete_results_for_experiment") {
            return 0;
        }
        let filter = Filter::new().equals("experiment_id", experiment_id);
        match self
            .store
            .delete_many(Collection::Results.as_str(), &filter)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                error!("Failed to delete results of {experiment_id}: {e}");
                0
            }
        }
    }

    /// Remove every document from every collection.
    pub async fn clear_all(&self) -> bool {
        if !self.degraded("clear_all") {
            return false;
        }
        for collection in Collection::ALL {
            if let Err(e) = self
                .store
                .delete_many(collection.as_str(), &Filter::new())
                .await
            {
                error!("Failed to clear {collection}: {e}");
                return false;
            }
        }
        warn!("All collections cleared");
        true
    }

    /// Per-collection document counts.
    pub async fn statistics(&self) -> Statistics {
        if !self.degraded("statistics") {
            return Statistics::disconnected();
        }
        let mut stats = Statistics::connected(self.store.database_name());
        for collection in Collection::ALL {
            match self
                .store
                .count_documents(collection.as_str(), &Filter::new())
                .await
            {
                Ok(count) => stats.set_count(collection, count),
                Err(e) => {
                    error!("Failed to get statistics: {e}");
                    return Statistics::failed(e.to_string());
                }
            }
        }
        stats
    }

    /// Probe the store.
    pub async fn health_check(&self) -> HealthReport {
        if !self.store.is_connected() {
            return HealthReport::disconnected();
        }
        match self.store.ping().await {
            Ok(()) => HealthReport::healthy(self.store.database_name()),
            Err(e) => {
                warn!("Health check failed: {e}");
                HealthReport::unhealthy(e.to_string())
            }
        }
    }
}

fn decode<E: Entity>(doc: &Document) -> Option<E> {
    match E::from_representation(doc) {
        Ok(entity) => Some(entity),
        Err(e) => {
            let id = doc.get("_id").and_then(Value::as_str).unwrap_or("<no id>");
            error!("Skipping unreadable {} document {id}: {e}", E::COLLECTION);
            None
        }
    }
}
