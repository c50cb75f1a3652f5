//! Run Result - outcome of one execution of an experiment

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use super::{distinct, impl_identity_eq, Attributes, Collection, Document, Entity, Identity};
use crate::{Error, Result};

/// Metrics and artifacts recorded for a single run of an experiment.
///
/// `experiment_id` is a plain reference; nothing checks that the experiment
/// exists, but deleting the experiment through the repository removes its
/// results.
#[derive(Debug, Clone)]
pub struct RunResult {
    identity: Identity,
    experiment_id: String,
    run_number: i64,
    metrics: Attributes,
    artifacts: Vec<String>,
    notes: String,
    duration_seconds: f64,
}

impl_identity_eq!(RunResult);

impl RunResult {
    /// Create run 1 of the given experiment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if `experiment_id` is empty.
    pub fn new(experiment_id: impl Into<String>) -> Result<Self> {
        Self::builder(experiment_id).build()
    }

    /// Create a builder for constructing a result with optional fields.
    #[must_use]
    pub fn builder(experiment_id: impl Into<String>) -> RunResultBuilder {
        RunResultBuilder::new(experiment_id)
    }

    /// Get the parent experiment id.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the run number (1-based).
    #[must_use]
    pub const fn run_number(&self) -> i64 {
        self.run_number
    }

    /// Get the metrics.
    #[must_use]
    pub const fn metrics(&self) -> &Attributes {
        &self.metrics
    }

    /// Get the artifact paths, in insertion order.
    #[must_use]
    pub fn artifacts(&self) -> &[String] {
        &self.artifacts
    }

    /// Get the notes.
    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Get the run duration in seconds.
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// Get a metric by key.
    #[must_use]
    pub fn get_metric(&self, key: &str) -> Option<&Value> {
        self.metrics.get(key)
    }

    /// The `accuracy` metric, if present and numeric.
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        self.numeric_metric("accuracy")
    }

    /// The `loss` metric, if present and numeric.
    #[must_use]
    pub fn loss(&self) -> Option<f64> {
        self.numeric_metric("loss")
    }

    /// The `f1_score` metric, if present and numeric.
    #[must_use]
    pub fn f1_score(&self) -> Option<f64> {
        self.numeric_metric("f1_score")
    }

    fn numeric_metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(Value::as_f64)
    }

    /// Set a metric.
    pub fn set_metric(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metrics.insert(key.into(), value.into());
        self.touch();
    }

    /// Add an artifact path. Empty and already-present paths are ignored.
    pub fn add_artifact(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !path.is_empty() && !self.artifacts.contains(&path) {
            self.artifacts.push(path);
            self.touch();
        }
    }

    /// Replace the notes.
    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
        self.touch();
    }

    /// Set the run duration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` and keeps the previous duration if
    /// `seconds` is negative.
    pub fn set_duration(&mut self, seconds: f64) -> Result<()> {
        check_duration(seconds)?;
        self.duration_seconds = seconds;
        self.touch();
        Ok(())
    }
}

fn check_duration(seconds: f64) -> Result<()> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(())
    } else {
        Err(Error::validation(
            "duration_seconds",
            "Duration must be a finite, non-negative number",
        ))
    }
}

impl Entity for RunResult {
    const COLLECTION: Collection = Collection::Results;

    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }

    fn validate(&self) -> Result<()> {
        if self.experiment_id.is_empty() {
            return Err(Error::validation("experiment_id", "Experiment ID is required"));
        }
        if self.run_number < 1 {
            return Err(Error::validation("run_number", "Run number must be positive"));
        }
        check_duration(self.duration_seconds)
    }

    fn to_representation(&self) -> Document {
        let mut doc = self.identity.to_document();
        doc.insert("experiment_id".into(), Value::from(self.experiment_id.clone()));
        doc.insert("run_number".into(), Value::from(self.run_number));
        doc.insert(
            "metrics".into(),
            Value::Object(self.metrics.clone().into_iter().collect()),
        );
        doc.insert("artifacts".into(), Value::from(self.artifacts.clone()));
        doc.insert("notes".into(), Value::from(self.notes.clone()));
        doc.insert("duration_seconds".into(), Value::from(self.duration_seconds));
        doc
    }

    fn from_representation(data: &Document) -> Result<Self> {
        let stored: StoredRunResult = serde_json::from_value(Value::Object(data.clone()))?;
        let identity = Identity::from_stored(
            stored.id,
            stored.created_at.as_deref(),
            stored.updated_at.as_deref(),
        )?;

        let mut builder = RunResultBuilder::new(stored.experiment_id.unwrap_or_default())
            .run_number(stored.run_number.unwrap_or(1))
            .metrics(stored.metrics.unwrap_or_default())
            .artifacts(stored.artifacts.unwrap_or_default())
            .notes(stored.notes.unwrap_or_default())
            .duration_seconds(stored.duration_seconds.unwrap_or(0.0));
        builder.identity = Some(identity);
        builder.build()
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Run {}: ", self.run_number)?;
        for (i, (key, value)) in self.metrics.iter().take(3).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredRunResult {
    #[serde(rename = "_id")]
    id: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    experiment_id: Option<String>,
    run_number: Option<i64>,
    metrics: Option<Attributes>,
    artifacts: Option<Vec<String>>,
    notes: Option<String>,
    duration_seconds: Option<f64>,
}

/// Builder for `RunResult`.
#[derive(Debug)]
pub struct RunResultBuilder {
    identity: Option<Identity>,
    id: Option<String>,
    experiment_id: String,
    run_number: i64,
    metrics: Attributes,
    artifacts: Vec<String>,
    notes: String,
    duration_seconds: f64,
}

impl RunResultBuilder {
    /// Create a new builder with the required experiment id.
    #[must_use]
    pub fn new(experiment_id: impl Into<String>) -> Self {
        Self {
            identity: None,
            id: None,
            experiment_id: experiment_id.into(),
            run_number: 1,
            metrics: Attributes::new(),
            artifacts: Vec::new(),
            notes: String::new(),
            duration_seconds: 0.0,
        }
    }

    /// Use an existing id instead of generating one.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the run number.
    #[must_use]
    pub const fn run_number(mut self, run_number: i64) -> Self {
        self.run_number = run_number;
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

    /// Replace the artifact paths.
    #[must_use]
    pub fn artifacts<I, T>(mut self, artifacts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.artifacts = artifacts.into_iter().map(Into::into).collect();
        self
    }

    /// Set the notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Set the run duration in seconds.
    #[must_use]
    pub fn duration_seconds(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// Build and validate the `RunResult`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if `experiment_id` is empty, `run_number`
    /// is below 1, or the duration is negative.
    pub fn build(self) -> Result<RunResult> {
        let result = RunResult {
            identity: self.identity.unwrap_or_else(|| Identity::new(self.id)),
            experiment_id: self.experiment_id,
            run_number: self.run_number,
            metrics: self.metrics,
            artifacts: distinct(self.artifacts),
            notes: self.notes,
            duration_seconds: self.duration_seconds,
        };
        result.validate()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_number_bounds() {
        assert!(RunResult::builder("exp-1").run_number(0).build().unwrap_err().is_validation());
        assert!(RunResult::builder("exp-1").run_number(1).build().is_ok());
    }

    #[test]
    fn test_non_finite_duration_rejected() {
        for seconds in [f64::INFINITY, f64::NAN] {
            let err = RunResult::builder("exp-1")
                .duration_seconds(seconds)
                .build()
                .unwrap_err();
            assert!(matches!(err, Error::Validation { ref field, .. } if field == "duration_seconds"));
        }

        let mut result = RunResult::new("exp-1").unwrap();
        assert!(result.set_duration(f64::INFINITY).is_err());
        assert!(result.duration_seconds().abs() < f64::EPSILON);
    }

    #[test]
    fn test_requires_experiment_id() {
        let err = RunResult::new("").unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "experiment_id"));
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(RunResult::builder("e").duration_seconds(-0.5).build().is_err());
        let mut result = RunResult::new("e").unwrap();
        assert!(result.set_duration(-1.0).is_err());
        result.set_duration(42.0).unwrap();
        assert!((result.duration_seconds() - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metric_accessors() {
        let result = RunResult::builder("e")
            .metric("accuracy", 0.93)
            .metric("loss", 0.12)
            .build()
            .unwrap();
        assert_eq!(result.accuracy(), Some(0.93));
        assert_eq!(result.loss(), Some(0.12));
        assert_eq!(result.f1_score(), None);
        assert!(result.get_metric("precision").is_none());
    }

    #[test]
    fn test_artifacts_distinct() {
        let mut result = RunResult::new("e").unwrap();
        result.add_artifact("model.pt");
        result.add_artifact("model.pt");
        result.add_artifact("");
        assert_eq!(result.artifacts(), ["model.pt"]);
    }

    #[test]
    fn test_mutators_touch() {
        let mut result = RunResult::new("e").unwrap();
        let before = result.updated_at();
        result.set_notes("converged early");
        assert!(result.updated_at() >= before);
        assert_eq!(result.notes(), "converged early");
    }

    #[test]
    fn test_representation_defaults() {
        let mut doc = Document::new();
        doc.insert("experiment_id".into(), Value::from("exp-9"));
        let result = RunResult::from_representation(&doc).unwrap();
        assert_eq!(result.run_number(), 1);
        assert!(result.artifacts().is_empty());
    }

    #[test]
    fn test_representation_without_experiment_fails() {
        assert!(RunResult::from_representation(&Document::new())
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_display() {
        let result = RunResult::builder("e")
            .run_number(2)
            .metric("accuracy", 0.5)
            .build()
            .unwrap();
        assert_eq!(result.to_string(), "Run 2: accuracy=0.5");
    }
}
