//! Entity model for research tracking
//!
//! ## Schema Overview
//!
//! ```text
//! Dataset (1) ──< Experiment (N)   [weak reference: dataset_id]
//!                     │
//!                     └──< RunResult (N) [cascade on delete: experiment_id]
//! ```
//!
//! Every entity carries an [`Identity`] (id plus timestamps), validates on
//! construction, and converts to and from a plain [`Document`], which is the
//! form the document store persists.
//!
//! ## Usage
//!
//! ```rust
//! use research_tracker::model::{Entity, Experiment, ExperimentStatus};
//!
//! let mut experiment = Experiment::builder("Baseline CNN")
//!     .author("Kamel")
//!     .tag("vision")
//!     .build()?;
//!
//! experiment.start();
//! assert_eq!(experiment.status(), ExperimentStatus::Running);
//!
//! let doc = experiment.to_representation();
//! let restored = Experiment::from_representation(&doc)?;
//! assert_eq!(restored, experiment);
//! # Ok::<(), research_tracker::Error>(())
//! ```

mod dataset;
mod experiment;
mod identity;
mod run_result;
pub mod timestamp;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};

use crate::Result;

pub use dataset::{Dataset, DatasetBuilder, DatasetFormat};
pub use experiment::{Experiment, ExperimentBuilder, ExperimentStatus};
pub use identity::Identity;
pub use run_result::{RunResult, RunResultBuilder};

/// Plain key-value representation of an entity (storage/wire form).
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Free-form key → value mapping (parameters, metrics, metadata).
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// The closed set of entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// `experiments`
    Experiments,
    /// `datasets`
    Datasets,
    /// `results`
    Results,
}

impl Collection {
    /// All collections, in statistics order.
    pub const ALL: [Self; 3] = [Self::Experiments, Self::Datasets, Self::Results];

    /// Collection name in the document store.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Experiments => "experiments",
            Self::Datasets => "datasets",
            Self::Results => "results",
        }
    }

    /// Fields the store should index for this collection.
    #[must_use]
    pub const fn index_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Experiments => &["name", "author", "status", "created_at"],
            Self::Datasets => &["name", "format"],
            Self::Results => &["experiment_id", "run_number"],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability shared by every persisted entity kind.
///
/// Equality and hashing of implementors are defined by [`Entity::id`] alone.
pub trait Entity: Sized + Send + Sync {
    /// Collection this entity is stored in.
    const COLLECTION: Collection;

    /// Dependent collections deleted alongside this entity, as
    /// `(collection, field holding this entity's id)`.
    const DEPENDENTS: &'static [(Collection, &'static str)] = &[];

    /// Identity base.
    fn identity(&self) -> &Identity;

    /// Mutable identity base (for [`Entity::touch`]).
    fn identity_mut(&mut self) -> &mut Identity;

    /// Check entity invariants.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` naming the first offending field.
    fn validate(&self) -> Result<()>;

    /// Convert to the plain document form.
    fn to_representation(&self) -> Document;

    /// Rebuild from the plain document form, applying defaults for missing
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidEnumValue` for an unrecognized enum tag,
    /// `Error::InvalidTimestamp` for malformed timestamps,
    /// `Error::Serialization` for wrongly typed fields, and
    /// `Error::Validation` if the result violates an invariant.
    fn from_representation(data: &Document) -> Result<Self>;

    /// Get the id.
    fn id(&self) -> &str {
        self.identity().id()
    }

    /// Get the creation timestamp.
    fn created_at(&self) -> DateTime<Utc> {
        self.identity().created_at()
    }

    /// Get the last update timestamp.
    fn updated_at(&self) -> DateTime<Utc> {
        self.identity().updated_at()
    }

    /// Refresh `updated_at`.
    fn touch(&mut self) {
        self.identity_mut().touch();
    }
}

/// Id-based `PartialEq`, `Eq` and `Hash` for an entity type.
macro_rules! impl_identity_eq {
    ($entity:ty) => {
        impl PartialEq for $entity {
            fn eq(&self, other: &Self) -> bool {
                $crate::model::Entity::id(self) == $crate::model::Entity::id(other)
            }
        }

        impl Eq for $entity {}

        impl std::hash::Hash for $entity {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                std::hash::Hash::hash($crate::model::Entity::id(self), state);
            }
        }
    };
}
pub(crate) use impl_identity_eq;

/// Drop empty and repeated entries, keeping first occurrences in order.
pub(crate) fn distinct(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| !item.is_empty() && seen.insert(item.clone()))
        .collect()
}
