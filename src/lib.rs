//! # research-tracker: Research Experiment Tracker
//!
//! **Version**: 0.1.0
//!
//! Records experiments, the datasets they use, and per-run results; persists
//! them to a document store and exports them as JSON, CSV, or Excel.
//!
//! ## Layers
//!
//! - [`model`]: validated entities with identity and timestamp discipline,
//!   plus their plain document form
//! - [`storage`]: the document store capability and an in-memory backend
//! - [`repository`]: CRUD, cascading delete, statistics, and health checks
//!   that never raise
//! - [`export`]: tabular and JSON export of experiments
//!
//! ## Example
//!
//! ```rust
//! use research_tracker::model::{Experiment, RunResult};
//! use research_tracker::repository::{FindOptions, TrackerRepository};
//! use research_tracker::storage::{Filter, MemoryDocumentStore};
//!
//! # async fn example() -> research_tracker::Result<()> {
//! let repo = TrackerRepository::new(MemoryDocumentStore::default());
//!
//! let mut experiment = Experiment::builder("ResNet sweep").author("Kamel").build()?;
//! experiment.start();
//! let id = repo.insert(&experiment).await.expect("store is connected");
//!
//! let run = RunResult::builder(&id).run_number(1).metric("accuracy", 0.91).build()?;
//! repo.insert(&run).await;
//!
//! let mine: Vec<Experiment> = repo
//!     .find(&Filter::new().equals("author", "Kamel"), &FindOptions::default())
//!     .await;
//! assert_eq!(mine.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod model;
pub mod repository;
pub mod storage;

pub use error::{Error, Result};
