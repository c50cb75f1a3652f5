//! Experiment - root entity for research tracking

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{distinct, impl_identity_eq, Attributes, Collection, Document, Entity, Identity};
use crate::{Error, Result};

/// Maximum experiment name length, in characters.
pub const MAX_NAME_LEN: usize = 200;

/// Lifecycle status of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    /// Created, not yet started.
    #[default]
    Planned,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Suspended.
    Paused,
}

impl ExperimentStatus {
    /// Get the stored string tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Paused => "paused",
        }
    }
}

impl FromStr for ExperimentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "planned" => Ok(Self::Planned),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "paused" => Ok(Self::Paused),
            other => Err(Error::invalid_enum("status", other)),
        }
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked research experiment.
///
/// Created in [`ExperimentStatus::Planned`]. Every mutator refreshes
/// `updated_at`; collections are only reachable through read-only views.
#[derive(Debug, Clone)]
pub struct Experiment {
    identity: Identity,
    name: String,
    description: String,
    author: String,
    status: ExperimentStatus,
    tags: Vec<String>,
    parameters: Attributes,
    metrics: Attributes,
    dataset_id: Option<String>,
}

impl_identity_eq!(Experiment);

impl Experiment {
    /// Create a planned experiment with the given name.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the name is blank or too long.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::builder(name).build()
    }

    /// Create a builder for constructing an experiment with optional fields.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ExperimentBuilder {
        ExperimentBuilder::new(name)
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the author.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> ExperimentStatus {
        self.status
    }

    /// Get the tags, in insertion order.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Get the parameters.
    #[must_use]
    pub const fn parameters(&self) -> &Attributes {
        &self.parameters
    }

    /// Get the metrics.
    #[must_use]
    pub const fn metrics(&self) -> &Attributes {
        &self.metrics
    }

    /// Get the associated dataset id, if any.
    #[must_use]
    pub fn dataset_id(&self) -> Option<&str> {
        self.dataset_id.as_deref()
    }

    /// Rename the experiment. The name is trimmed first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` and leaves the name unchanged if the
    /// trimmed name is blank or too long.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        check_name(name)?;
        self.name = name.to_string();
        self.touch();
        Ok(())
    }

    /// Replace the description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    /// Replace the author.
    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = author.into();
        self.touch();
    }

    /// Set the status directly.
    pub fn set_status(&mut self, status: ExperimentStatus) {
        self.status = status;
        self.touch();
    }

    /// Link (or unlink) a dataset.
    pub fn set_dataset_id(&mut self, dataset_id: Option<String>) {
        self.dataset_id = dataset_id;
        self.touch();
    }

    /// Add a tag. Empty and already-present tags are ignored.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
            self.touch();
        }
    }

    /// Remove a tag if present.
    pub fn remove_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
            self.touch();
        }
    }

    /// Set a parameter.
    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.parameters.insert(key.into(), value.into());
        self.touch();
    }

    /// Set a metric.
    pub fn set_metric(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metrics.insert(key.into(), value.into());
        self.touch();
    }

    /// Mark the experiment as running.
    pub fn start(&mut self) {
        self.status = ExperimentStatus::Running;
        self.touch();
    }

    /// Mark the experiment as paused.
    pub fn pause(&mut self) {
        self.status = ExperimentStatus::Paused;
        self.touch();
    }

    /// Mark the experiment as completed, merging any final metrics into the
    /// existing ones.
    pub fn complete(&mut self, metrics: Option<Attributes>) {
        self.status = ExperimentStatus::Completed;
        if let Some(metrics) = metrics {
            self.metrics.extend(metrics);
        }
        self.touch();
    }

    /// Mark the experiment as failed. A non-empty message is recorded under
    /// the `error` metric.
    pub fn fail(&mut self, message: Option<&str>) {
        self.status = ExperimentStatus::Failed;
        if let Some(message) = message.filter(|m| !m.is_empty()) {
            self.metrics
                .insert("error".to_string(), Value::from(message));
        }
        self.touch();
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("name", "Experiment name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(
            "name",
            format!("Experiment name must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(())
}

impl Entity for Experiment {
    const COLLECTION: Collection = Collection::Experiments;
    const DEPENDENTS: &'static [(Collection, &'static str)] =
        &[(Collection::Results, "experiment_id")];

    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }

    fn validate(&self) -> Result<()> {
        check_name(&self.name)
    }

    fn to_representation(&self) -> Document {
        let mut doc = self.identity.to_document();
        doc.insert("name".into(), Value::from(self.name.clone()));
        doc.insert("description".into(), Value::from(self.description.clone()));
        doc.insert("author".into(), Value::from(self.author.clone()));
        doc.insert("status".into(), Value::from(self.status.as_str()));
        doc.insert("tags".into(), Value::from(self.tags.clone()));
        doc.insert(
            "parameters".into(),
            Value::Object(self.parameters.clone().into_iter().collect()),
        );
        doc.insert(
            "metrics".into(),
            Value::Object(self.metrics.clone().into_iter().collect()),
        );
        doc.insert(
            "dataset_id".into(),
            self.dataset_id.clone().map_or(Value::Null, Value::from),
        );
        doc
    }

    fn from_representation(data: &Document) -> Result<Self> {
        let stored: StoredExperiment = serde_json::from_value(Value::Object(data.clone()))?;

        let status = match stored.status.as_deref() {
            Some(tag) => tag.parse()?,
            None => ExperimentStatus::default(),
        };
        let identity = Identity::from_stored(
            stored.id,
            stored.created_at.as_deref(),
            stored.updated_at.as_deref(),
        )?;

        let mut builder =
            ExperimentBuilder::new(stored.name.unwrap_or_else(|| "Untitled".to_string()))
                .description(stored.description.unwrap_or_default())
                .author(stored.author.unwrap_or_default())
                .status(status)
                .tags(stored.tags.unwrap_or_default())
                .parameters(stored.parameters.unwrap_or_default())
                .metrics(stored.metrics.unwrap_or_default());
        builder.identity = Some(identity);
        builder.dataset_id = stored.dataset_id;
        builder.build()
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) by {}", self.name, self.status, self.author)
    }
}

/// Stored form of an experiment; every field optional so missing keys take
/// their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredExperiment {
    #[serde(rename = "_id")]
    id: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    name: Option<String>,
    description: Option<String>,
    author: Option<String>,
    status: Option<String>,
    tags: Option<Vec<String>>,
    parameters: Option<Attributes>,
    metrics: Option<Attributes>,
    dataset_id: Option<String>,
}

/// Builder for `Experiment`.
#[derive(Debug)]
pub struct ExperimentBuilder {
    identity: Option<Identity>,
    id: Option<String>,
    name: String,
    description: String,
    author: String,
    status: ExperimentStatus,
    tags: Vec<String>,
    parameters: Attributes,
    metrics: Attributes,
    dataset_id: Option<String>,
}

impl ExperimentBuilder {
    /// Create a new builder with the required name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identity: None,
            id: None,
            name: name.into(),
            description: String::new(),
            author: String::new(),
            status: ExperimentStatus::default(),
            tags: Vec::new(),
            parameters: Attributes::new(),
            metrics: Attributes::new(),
            dataset_id: None,
        }
    }

    /// Use an existing id instead of generating one.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the author.
    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set the initial status.
    #[must_use]
    pub const fn status(mut self, status: ExperimentStatus) -> Self {
        self.status = status;
        self
    }

    /// Replace the tags.
    #[must_use]
    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Append a single tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Replace the parameters.
    #[must_use]
    pub fn parameters(mut self, parameters: Attributes) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set a single parameter.
    #[must_use]
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Replace the metrics.
    #[must_use]
    pub fn metrics(mut self, metrics: Attributes) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set a single metric.
    #[must_use]
    pub fn metric(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }

    /// Link a dataset.
    #[must_use]
    pub fn dataset_id(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_id = Some(dataset_id.into());
        self
    }

    /// Build and validate the `Experiment`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the name is blank or too long.
    pub fn build(self) -> Result<Experiment> {
        let experiment = Experiment {
            identity: self.identity.unwrap_or_else(|| Identity::new(self.id)),
            name: self.name,
            description: self.description,
            author: self.author,
            status: self.status,
            tags: distinct(self.tags),
            parameters: self.parameters,
            metrics: self.metrics,
            dataset_id: self.dataset_id,
        };
        experiment.validate()?;
        Ok(experiment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_new_defaults() {
        let experiment = Experiment::new("X").unwrap();
        assert_eq!(experiment.name(), "X");
        assert_eq!(experiment.status(), ExperimentStatus::Planned);
        assert!(experiment.tags().is_empty());
        assert!(experiment.dataset_id().is_none());
        assert_eq!(experiment.created_at(), experiment.updated_at());
    }

    #[test]
    fn test_blank_name_rejected() {
        for name in ["", "   ", "\t\n"] {
            let err = Experiment::new(name).unwrap_err();
            assert!(err.is_validation(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn test_name_length_limit() {
        assert!(Experiment::new("a".repeat(MAX_NAME_LEN)).is_ok());
        assert!(Experiment::new("a".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_lifecycle() {
        let mut experiment = Experiment::new("X").unwrap();
        let t0 = experiment.updated_at();

        experiment.start();
        assert_eq!(experiment.status(), ExperimentStatus::Running);
        let t1 = experiment.updated_at();
        assert!(t1 >= t0);

        let mut final_metrics = Attributes::new();
        final_metrics.insert("accuracy".into(), Value::from(0.9));
        experiment.complete(Some(final_metrics));
        assert_eq!(experiment.status(), ExperimentStatus::Completed);
        assert_eq!(experiment.metrics()["accuracy"], Value::from(0.9));
        assert!(experiment.updated_at() >= t1);
    }

    #[test]
    fn test_complete_merges_metrics() {
        let mut experiment = Experiment::builder("X").metric("loss", 0.4).build().unwrap();
        let mut final_metrics = Attributes::new();
        final_metrics.insert("accuracy".into(), Value::from(0.8));
        experiment.complete(Some(final_metrics));
        assert_eq!(experiment.metrics().len(), 2);
    }

    #[test]
    fn test_fail_records_message() {
        let mut experiment = Experiment::new("X").unwrap();
        experiment.fail(Some("out of memory"));
        assert_eq!(experiment.status(), ExperimentStatus::Failed);
        assert_eq!(experiment.metrics()["error"], "out of memory");

        let mut quiet = Experiment::new("Y").unwrap();
        quiet.fail(None);
        assert!(!quiet.metrics().contains_key("error"));
    }

    #[test]
    fn test_tags_are_set_like() {
        let mut experiment = Experiment::builder("X")
            .tags(["a", "b", "a"])
            .build()
            .unwrap();
        assert_eq!(experiment.tags(), ["a", "b"]);

        experiment.add_tag("b");
        experiment.add_tag("");
        experiment.add_tag("c");
        assert_eq!(experiment.tags(), ["a", "b", "c"]);

        experiment.remove_tag("a");
        assert_eq!(experiment.tags(), ["b", "c"]);
    }

    #[test]
    fn test_set_name_trims_and_validates() {
        let mut experiment = Experiment::new("X").unwrap();
        experiment.set_name("  Renamed  ").unwrap();
        assert_eq!(experiment.name(), "Renamed");
        assert!(experiment.set_name("   ").is_err());
        assert_eq!(experiment.name(), "Renamed");
    }

    #[test]
    fn test_equality_by_id() {
        let a = Experiment::builder("A").id("same").build().unwrap();
        let b = Experiment::builder("B").id("same").author("other").build().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Experiment::new("A").unwrap());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("paused".parse::<ExperimentStatus>().unwrap(), ExperimentStatus::Paused);
        let err = "archived".parse::<ExperimentStatus>().unwrap_err();
        assert!(matches!(err, Error::InvalidEnumValue { ref value, .. } if value == "archived"));
    }

    #[test]
    fn test_representation_defaults() {
        let mut doc = Document::new();
        doc.insert("name".into(), Value::from("From store"));
        let experiment = Experiment::from_representation(&doc).unwrap();
        assert_eq!(experiment.status(), ExperimentStatus::Planned);
        assert!(experiment.parameters().is_empty());
    }

    #[test]
    fn test_representation_missing_name_is_untitled() {
        let experiment = Experiment::from_representation(&Document::new()).unwrap();
        assert_eq!(experiment.name(), "Untitled");
    }

    #[test]
    fn test_representation_rejects_unknown_status() {
        let mut doc = Experiment::new("X").unwrap().to_representation();
        doc.insert("status".into(), Value::from("archived"));
        assert!(matches!(
            Experiment::from_representation(&doc),
            Err(Error::InvalidEnumValue { .. })
        ));
    }

    #[test]
    fn test_display() {
        let experiment = Experiment::builder("X").author("Kamel").build().unwrap();
        assert_eq!(experiment.to_string(), "X (planned) by Kamel");
    }
}
