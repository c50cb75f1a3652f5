//! Dataset - data source referenced by experiments

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{distinct, impl_identity_eq, Attributes, Collection, Document, Entity, Identity};
use crate::{Error, Result};

/// Storage format of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    /// Comma-separated values.
    #[default]
    Csv,
    /// JSON documents.
    Json,
    /// Apache Parquet.
    Parquet,
    /// HDF5.
    Hdf5,
    /// Image collection.
    Images,
    /// Video collection.
    Video,
    /// Anything else.
    Other,
}

impl DatasetFormat {
    /// Get the stored string tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Parquet => "parquet",
            Self::Hdf5 => "hdf5",
            Self::Images => "images",
            Self::Video => "video",
            Self::Other => "other",
        }
    }
}

impl FromStr for DatasetFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "parquet" => Ok(Self::Parquet),
            "hdf5" => Ok(Self::Hdf5),
            "images" => Ok(Self::Images),
            "video" => Ok(Self::Video),
            "other" => Ok(Self::Other),
            other => Err(Error::invalid_enum("format", other)),
        }
    }
}

impl fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A research dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    identity: Identity,
    name: String,
    description: String,
    source: String,
    format: DatasetFormat,
    size_mb: f64,
    num_samples: i64,
    features: Vec<String>,
    path: String,
    metadata: Attributes,
}

impl_identity_eq!(Dataset);

impl Dataset {
    /// Create an empty CSV dataset with the given name.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the name is blank.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::builder(name).build()
    }

    /// Create a builder for constructing a dataset with optional fields.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> DatasetBuilder {
        DatasetBuilder::new(name)
    }

    /// Get the dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the source (URL, lab, etc.).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the format.
    #[must_use]
    pub const fn format(&self) -> DatasetFormat {
        self.format
    }

    /// Get the size in megabytes.
    #[must_use]
    pub fn size_mb(&self) -> f64 {
        self.size_mb
    }

    /// Get the number of samples.
    #[must_use]
    pub const fn num_samples(&self) -> i64 {
        self.num_samples
    }

    /// Get the feature names, in insertion order.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Get the storage path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Attributes {
        &self.metadata
    }

    /// Rename the dataset. The name is trimmed first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` and leaves the name unchanged if blank.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("name", "Dataset name cannot be empty"));
        }
        self.name = name.to_string();
        self.touch();
        Ok(())
    }

    /// Replace the description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    /// Add a feature. Empty and already-present names are ignored.
    pub fn add_feature(&mut self, feature: impl Into<String>) {
        let feature = feature.into();
        if !feature.is_empty() && !self.features.contains(&feature) {
            self.features.push(feature);
            self.touch();
        }
    }

    /// Set a metadata field.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
        self.touch();
    }

    /// Update size and sample count together.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` and keeps the previous statistics if
    /// either value is negative.
    pub fn update_stats(&mut self, size_mb: f64, num_samples: i64) -> Result<()> {
        check_stats(size_mb, num_samples)?;
        self.size_mb = size_mb;
        self.num_samples = num_samples;
        self.touch();
        Ok(())
    }
}

fn check_stats(size_mb: f64, num_samples: i64) -> Result<()> {
    if !size_mb.is_finite() || size_mb < 0.0 {
        return Err(Error::validation(
            "size_mb",
            "Dataset size must be a finite, non-negative number",
        ));
    }
    if num_samples < 0 {
        return Err(Error::validation(
            "num_samples",
            "Number of samples cannot be negative",
        ));
    }
    Ok(())
}

impl Entity for Dataset {
    const COLLECTION: Collection = Collection::Datasets;

    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", "Dataset name is required"));
        }
        check_stats(self.size_mb, self.num_samples)
    }

    fn to_representation(&self) -> Document {
        let mut doc = self.identity.to_document();
        doc.insert("name".into(), Value::from(self.name.clone()));
        doc.insert("description".into(), Value::from(self.description.clone()));
        doc.insert("source".into(), Value::from(self.source.clone()));
        doc.insert("format".into(), Value::from(self.format.as_str()));
        doc.insert("size_mb".into(), Value::from(self.size_mb));
        doc.insert("num_samples".into(), Value::from(self.num_samples));
        doc.insert("features".into(), Value::from(self.features.clone()));
        doc.insert("path".into(), Value::from(self.path.clone()));
        doc.insert(
            "metadata".into(),
            Value::Object(self.metadata.clone().into_iter().collect()),
        );
        doc
    }

    fn from_representation(data: &Document) -> Result<Self> {
        let stored: StoredDataset = serde_json::from_value(Value::Object(data.clone()))?;

        let format = match stored.format.as_deref() {
            Some(tag) => tag.parse()?,
            None => DatasetFormat::default(),
        };
        let identity = Identity::from_stored(
            stored.id,
            stored.created_at.as_deref(),
            stored.updated_at.as_deref(),
        )?;

        let mut builder = DatasetBuilder::new(stored.name.unwrap_or_else(|| "Untitled".to_string()))
            .description(stored.description.unwrap_or_default())
            .source(stored.source.unwrap_or_default())
            .format(format)
            .size_mb(stored.size_mb.unwrap_or(0.0))
            .num_samples(stored.num_samples.unwrap_or(0))
            .features(stored.features.unwrap_or_default())
            .path(stored.path.unwrap_or_default())
            .metadata(stored.metadata.unwrap_or_default());
        builder.identity = Some(identity);
        builder.build()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} samples)",
            self.name, self.format, self.num_samples
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredDataset {
    #[serde(rename = "_id")]
    id: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    name: Option<String>,
    description: Option<String>,
    source: Option<String>,
    format: Option<String>,
    size_mb: Option<f64>,
    num_samples: Option<i64>,
    features: Option<Vec<String>>,
    path: Option<String>,
    metadata: Option<Attributes>,
}

/// Builder for `Dataset`.
#[derive(Debug)]
pub struct DatasetBuilder {
    identity: Option<Identity>,
    id: Option<String>,
    name: String,
    description: String,
    source: String,
    format: DatasetFormat,
    size_mb: f64,
    num_samples: i64,
    features: Vec<String>,
    path: String,
    metadata: Attributes,
}

impl DatasetBuilder {
    /// Create a new builder with the required name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identity: None,
            id: None,
            name: name.into(),
            description: String::new(),
            source: String::new(),
            format: DatasetFormat::default(),
            size_mb: 0.0,
            num_samples: 0,
            features: Vec::new(),
            path: String::new(),
            metadata: Attributes::new(),
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

    /// Set the source.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the format.
    #[must_use]
    pub const fn format(mut self, format: DatasetFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the size in megabytes.
    #[must_use]
    pub fn size_mb(mut self, size_mb: f64) -> Self {
        self.size_mb = size_mb;
        self
    }

    /// Set the number of samples.
    #[must_use]
    pub const fn num_samples(mut self, num_samples: i64) -> Self {
        self.num_samples = num_samples;
        self
    }

    /// Replace the feature names.
    #[must_use]
    pub fn features<I, T>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Set the storage path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Replace the metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Attributes) -> Self {
        self.metadata = metadata;
        self
    }

    /// Build and validate the `Dataset`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the name is blank or a statistic is
    /// negative.
    pub fn build(self) -> Result<Dataset> {
        let dataset = Dataset {
            identity: self.identity.unwrap_or_else(|| Identity::new(self.id)),
            name: self.name,
            description: self.description,
            source: self.source,
            format: self.format,
            size_mb: self.size_mb,
            num_samples: self.num_samples,
            features: distinct(self.features),
            path: self.path,
            metadata: self.metadata,
        };
        dataset.validate()?;
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_defaults() {
        let dataset = Dataset::new("MNIST").unwrap();
        assert_eq!(dataset.format(), DatasetFormat::Csv);
        assert_eq!(dataset.num_samples(), 0);
        assert!(dataset.features().is_empty());
    }

    #[test]
    fn test_dataset_validation() {
        assert!(Dataset::new(" ").unwrap_err().is_validation());
        assert!(Dataset::builder("d").size_mb(-1.0).build().is_err());
        assert!(Dataset::builder("d").size_mb(f64::NAN).build().is_err());
        assert!(Dataset::builder("d").num_samples(-5).build().is_err());
        assert!(Dataset::builder("d").size_mb(0.0).num_samples(0).build().is_ok());
    }

    #[test]
    fn test_non_finite_size_rejected() {
        for size in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let err = Dataset::builder("d").size_mb(size).build().unwrap_err();
            assert!(matches!(err, Error::Validation { ref field, .. } if field == "size_mb"));
        }

        let mut dataset = Dataset::new("d").unwrap();
        assert!(dataset.update_stats(f64::INFINITY, 1).is_err());
        assert!(dataset.size_mb().abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_stats_rolls_back_on_error() {
        let mut dataset = Dataset::builder("d")
            .size_mb(10.0)
            .num_samples(100)
            .build()
            .unwrap();
        assert!(dataset.update_stats(-1.0, 5).is_err());
        assert!((dataset.size_mb() - 10.0).abs() < f64::EPSILON);
        assert_eq!(dataset.num_samples(), 100);

        dataset.update_stats(12.5, 120).unwrap();
        assert_eq!(dataset.num_samples(), 120);
    }

    #[test]
    fn test_features_distinct() {
        let mut dataset = Dataset::builder("d")
            .features(["x", "y", "x"])
            .build()
            .unwrap();
        dataset.add_feature("y");
        dataset.add_feature("z");
        assert_eq!(dataset.features(), ["x", "y", "z"]);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("hdf5".parse::<DatasetFormat>().unwrap(), DatasetFormat::Hdf5);
        assert!(matches!(
            "xls".parse::<DatasetFormat>(),
            Err(Error::InvalidEnumValue { ref field, .. }) if field == "format"
        ));
    }

    #[test]
    fn test_representation_roundtrip() {
        let dataset = Dataset::builder("CIFAR-10")
            .format(DatasetFormat::Images)
            .size_mb(163.0)
            .num_samples(60_000)
            .features(["pixels", "label"])
            .path("/data/cifar")
            .build()
            .unwrap();

        let restored = Dataset::from_representation(&dataset.to_representation()).unwrap();
        assert_eq!(restored.format(), DatasetFormat::Images);
        assert_eq!(restored.num_samples(), 60_000);
        assert_eq!(restored.features(), dataset.features());
        assert_eq!(restored.created_at(), dataset.created_at());
    }

    #[test]
    fn test_display() {
        let dataset = Dataset::builder("d").num_samples(3).build().unwrap();
        assert_eq!(dataset.to_string(), "d (csv, 3 samples)");
    }
}
