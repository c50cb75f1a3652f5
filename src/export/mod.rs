//! Export of experiments to JSON, CSV, and Excel
//!
//! [`serialize`] turns a slice of experiments into bytes; [`FileExporter`]
//! writes those bytes under an output directory. CSV and Excel project a
//! fixed column set ([`COLUMNS`]); metrics an experiment does not carry
//! render as empty cells.
//!
//! # Example
//!
//! ```rust
//! use research_tracker::export::{serialize, ExportFormat};
//! use research_tracker::model::Experiment;
//!
//! let experiment = Experiment::builder("Baseline")
//!     .tags(["cnn", "vision"])
//!     .metric("accuracy", 0.93)
//!     .build()
//!     .unwrap();
//!
//! let csv = serialize(&[experiment], ExportFormat::Csv).unwrap();
//! let text = String::from_utf8(csv).unwrap();
//! assert!(text.contains("cnn; vision"));
//! ```

mod xlsx;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::ExportConfig;
use crate::model::{timestamp, Document, Entity, Experiment};
use crate::{Error, Result};

/// Version tag written into the JSON envelope.
pub const FORMAT_VERSION: &str = "1.0";

/// Tabular column keys, in order.
pub const COLUMNS: [&str; 11] = [
    "id",
    "name",
    "description",
    "author",
    "status",
    "tags",
    "created_at",
    "updated_at",
    "accuracy",
    "loss",
    "f1_score",
];

/// Metrics projected into tabular exports.
const METRIC_COLUMNS: [&str; 3] = ["accuracy", "loss", "f1_score"];

/// Separator used when flattening tags into one cell.
const TAG_SEPARATOR: &str = "; ";

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Pretty-printed JSON envelope
    Json,
    /// Comma-separated values
    Csv,
    /// Excel workbook
    Xlsx,
}

impl ExportFormat {
    /// All formats.
    pub const ALL: [Self; 3] = [Self::Json, Self::Csv, Self::Xlsx];

    /// File extension (without the dot).
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Serialize)]
struct ExportMetadata {
    exported_at: String,
    total_count: usize,
    format_version: &'static str,
}

#[derive(Serialize)]
struct ExportEnvelope {
    experiments: Vec<Document>,
    metadata: ExportMetadata,
}

#[derive(Deserialize)]
struct ImportEnvelope {
    #[serde(default)]
    experiments: Vec<Document>,
}

/// Serialize experiments in the given format.
///
/// # Errors
///
/// Returns `Error::ExportError` if the CSV or Excel writer fails, or
/// `Error::Serialization` for JSON failures.
pub fn serialize(experiments: &[Experiment], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Json => to_json(experiments),
        ExportFormat::Csv => to_csv(experiments),
        ExportFormat::Xlsx => xlsx::to_xlsx(experiments),
    }
}

fn to_json(experiments: &[Experiment]) -> Result<Vec<u8>> {
    let envelope = ExportEnvelope {
        experiments: experiments.iter().map(Entity::to_representation).collect(),
        metadata: ExportMetadata {
            exported_at: timestamp::format(timestamp::now()),
            total_count: experiments.len(),
            format_version: FORMAT_VERSION,
        },
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

fn to_csv(experiments: &[Experiment]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS).map_err(export_error)?;
    for experiment in experiments {
        writer
            .write_record(row(experiment).iter().map(Cell::text))
            .map_err(export_error)?;
    }
    writer.into_inner().map_err(export_error)
}

/// Read experiments back from a JSON export.
///
/// A missing `experiments` key yields an empty list.
///
/// # Errors
///
/// Returns `Error::Serialization` for malformed JSON, or any error from
/// [`Entity::from_representation`] for an invalid entry.
pub fn import_experiments_json(bytes: &[u8]) -> Result<Vec<Experiment>> {
    let envelope: ImportEnvelope = serde_json::from_slice(bytes)?;
    let experiments = envelope
        .experiments
        .iter()
        .map(Experiment::from_representation)
        .collect::<Result<Vec<_>>>()?;
    info!("Imported {} experiments from JSON", experiments.len());
    Ok(experiments)
}

/// One tabular cell.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Empty => String::new(),
        }
    }

    fn metric(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Empty,
            Some(Value::Number(n)) => n.as_f64().map_or(Self::Empty, Self::Number),
            Some(Value::String(s)) => Self::Text(s.clone()),
            Some(other) => Self::Text(other.to_string()),
        }
    }
}

/// Project an experiment onto [`COLUMNS`].
pub(crate) fn row(experiment: &Experiment) -> Vec<Cell> {
    let mut cells = vec![
        Cell::Text(experiment.id().to_string()),
        Cell::Text(experiment.name().to_string()),
        Cell::Text(experiment.description().to_string()),
        Cell::Text(experiment.author().to_string()),
        Cell::Text(experiment.status().as_str().to_string()),
        Cell::Text(experiment.tags().join(TAG_SEPARATOR)),
        Cell::Text(timestamp::format(experiment.created_at())),
        Cell::Text(timestamp::format(experiment.updated_at())),
    ];
    cells.extend(
        METRIC_COLUMNS
            .iter()
            .map(|key| Cell::metric(experiment.metrics().get(*key))),
    );
    cells
}

pub(crate) fn export_error(e: impl fmt::Display) -> Error {
    Error::ExportError(e.to_string())
}

/// Writes exports into an output directory.
#[derive(Debug, Clone)]
pub struct FileExporter {
    output_dir: PathBuf,
}

impl FileExporter {
    /// Create an exporter, creating `output_dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory cannot be created.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
            info!("Created directory: {}", output_dir.display());
        }
        Ok(Self { output_dir })
    }

    /// Create an exporter for the configured output directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory cannot be created.
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        Self::new(&config.output_directory)
    }

    /// Output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Serialize `experiments` and write them to `filename` (default
    /// `experiments.<ext>`) under the output directory.
    ///
    /// # Errors
    ///
    /// Returns serialization errors from [`serialize`] or `Error::Io` if
    /// the file cannot be written.
    pub fn export(
        &self,
        experiments: &[Experiment],
        format: ExportFormat,
        filename: Option<&str>,
    ) -> Result<PathBuf> {
        let path = filename.map_or_else(
            || self.output_dir.join(format!("experiments.{}", format.extension())),
            |name| self.output_dir.join(name),
        );
        let bytes = serialize(experiments, format)?;
        fs::write(&path, bytes)?;
        info!(
            "Exported {} experiments to {}: {}",
            experiments.len(),
            format,
            path.display()
        );
        Ok(path)
    }

    /// Read a JSON export from the output directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, otherwise see
    /// [`import_experiments_json`].
    pub fn import_json(&self, filename: &str) -> Result<Vec<Experiment>> {
        let bytes = fs::read(self.output_dir.join(filename))?;
        import_experiments_json(&bytes)
    }
}
