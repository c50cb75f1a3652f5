//! Property-based tests for research-tracker
//!
//! - Document round-trip preserves every field
//! - Blank names and non-finite numbers never construct
//! - Stored timestamps keep `updated_at >= created_at`
//! - Run with ProptestConfig::with_cases(100)

use proptest::prelude::*;
use research_tracker::model::{
    Attributes, Dataset, DatasetFormat, Entity, Experiment, ExperimentStatus, RunResult,
};
use serde_json::Value;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

fn arb_status() -> impl Strategy<Value = ExperimentStatus> {
    prop_oneof![
        Just(ExperimentStatus::Planned),
        Just(ExperimentStatus::Running),
        Just(ExperimentStatus::Completed),
        Just(ExperimentStatus::Failed),
        Just(ExperimentStatus::Paused),
    ]
}

fn arb_format() -> impl Strategy<Value = DatasetFormat> {
    prop_oneof![
        Just(DatasetFormat::Csv),
        Just(DatasetFormat::Json),
        Just(DatasetFormat::Parquet),
        Just(DatasetFormat::Hdf5),
        Just(DatasetFormat::Images),
        Just(DatasetFormat::Video),
        Just(DatasetFormat::Other),
    ]
}

/// Non-blank name within the length limit
fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 _-]{0,60}"
}

fn arb_blank() -> impl Strategy<Value = String> {
    "[ \t\n]{0,10}"
}

/// Id as supplied by callers (not necessarily a UUID)
fn arb_id() -> impl Strategy<Value = String> {
    "[a-f0-9]{8}-[a-f0-9]{4}"
}

/// Free-form attribute value: finite number, integer, string, or flag
fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z ]{0,12}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

/// Non-empty attribute map
fn arb_attributes() -> impl Strategy<Value = Attributes> {
    proptest::collection::btree_map("[a-z_]{1,8}", arb_value(), 1..5)
}

fn arb_experiment() -> impl Strategy<Value = Experiment> {
    (
        arb_id(),
        arb_name(),
        ".{0,40}",
        "[A-Za-z ]{0,20}",
        arb_status(),
        proptest::collection::vec("[a-z]{1,8}", 1..5),
        arb_attributes(),
        arb_attributes(),
        proptest::option::of("[a-f0-9]{8}"),
    )
        .prop_map(
            |(id, name, description, author, status, tags, parameters, metrics, dataset_id)| {
                let mut builder = Experiment::builder(name)
                    .id(id)
                    .description(description)
                    .author(author)
                    .status(status)
                    .tags(tags)
                    .parameters(parameters)
                    .metrics(metrics);
                if let Some(dataset_id) = dataset_id {
                    builder = builder.dataset_id(dataset_id);
                }
                builder.build().unwrap()
            },
        )
}

fn arb_dataset() -> impl Strategy<Value = Dataset> {
    (
        arb_id(),
        arb_name(),
        ".{0,40}",
        "[a-z:/.]{0,30}",
        arb_format(),
        0.0f64..1.0e5,
        0i64..10_000_000,
        proptest::collection::vec("[a-z]{1,8}", 1..6),
        "[a-z/]{1,20}",
        arb_attributes(),
    )
        .prop_map(
            |(id, name, description, source, format, size_mb, num_samples, features, path, metadata)| {
                Dataset::builder(name)
                    .id(id)
                    .description(description)
                    .source(source)
                    .format(format)
                    .size_mb(size_mb)
                    .num_samples(num_samples)
                    .features(features)
                    .path(path)
                    .metadata(metadata)
                    .build()
                    .unwrap()
            },
        )
}

fn arb_run_result() -> impl Strategy<Value = RunResult> {
    (
        arb_id(),
        "[a-f0-9]{8}",
        1i64..1000,
        arb_attributes(),
        proptest::collection::vec("[a-z/]{1,12}\\.pt", 1..4),
        ".{0,40}",
        0.0f64..1.0e4,
    )
        .prop_map(
            |(id, experiment_id, run_number, metrics, artifacts, notes, duration)| {
                RunResult::builder(experiment_id)
                    .id(id)
                    .run_number(run_number)
                    .metrics(metrics)
                    .artifacts(artifacts)
                    .notes(notes)
                    .duration_seconds(duration)
                    .build()
                    .unwrap()
            },
        )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: experiment document round-trip is field-equal
    #[test]
    fn prop_experiment_roundtrip(experiment in arb_experiment()) {
        let restored = Experiment::from_representation(&experiment.to_representation()).unwrap();
        prop_assert_eq!(restored.id(), experiment.id());
        prop_assert_eq!(restored.name(), experiment.name());
        prop_assert_eq!(restored.description(), experiment.description());
        prop_assert_eq!(restored.author(), experiment.author());
        prop_assert_eq!(restored.status(), experiment.status());
        prop_assert_eq!(restored.tags(), experiment.tags());
        prop_assert_eq!(restored.parameters(), experiment.parameters());
        prop_assert_eq!(restored.metrics(), experiment.metrics());
        prop_assert_eq!(restored.dataset_id(), experiment.dataset_id());
        prop_assert_eq!(restored.created_at(), experiment.created_at());
        prop_assert_eq!(restored.updated_at(), experiment.updated_at());
    }

    /// Property: dataset document round-trip is field-equal
    #[test]
    fn prop_dataset_roundtrip(dataset in arb_dataset()) {
        let restored = Dataset::from_representation(&dataset.to_representation()).unwrap();
        prop_assert_eq!(restored.id(), dataset.id());
        prop_assert_eq!(restored.name(), dataset.name());
        prop_assert_eq!(restored.description(), dataset.description());
        prop_assert_eq!(restored.source(), dataset.source());
        prop_assert_eq!(restored.format(), dataset.format());
        prop_assert_eq!(restored.size_mb().to_bits(), dataset.size_mb().to_bits());
        prop_assert_eq!(restored.num_samples(), dataset.num_samples());
        prop_assert_eq!(restored.features(), dataset.features());
        prop_assert_eq!(restored.path(), dataset.path());
        prop_assert_eq!(restored.metadata(), dataset.metadata());
        prop_assert_eq!(restored.created_at(), dataset.created_at());
        prop_assert_eq!(restored.updated_at(), dataset.updated_at());
    }

    /// Property: run result document round-trip is field-equal
    #[test]
    fn prop_run_result_roundtrip(result in arb_run_result()) {
        let restored = RunResult::from_representation(&result.to_representation()).unwrap();
        prop_assert_eq!(restored.id(), result.id());
        prop_assert_eq!(restored.experiment_id(), result.experiment_id());
        prop_assert_eq!(restored.run_number(), result.run_number());
        prop_assert_eq!(restored.metrics(), result.metrics());
        prop_assert_eq!(restored.artifacts(), result.artifacts());
        prop_assert_eq!(restored.notes(), result.notes());
        prop_assert_eq!(
            restored.duration_seconds().to_bits(),
            result.duration_seconds().to_bits()
        );
        prop_assert_eq!(restored.created_at(), result.created_at());
        prop_assert_eq!(restored.updated_at(), result.updated_at());
    }

    /// Property: non-finite or negative sizes and durations never validate
    #[test]
    fn prop_non_finite_numbers_rejected(
        value in prop_oneof![
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            Just(f64::NAN),
            -1.0e6f64..-1.0e-9,
        ]
    ) {
        prop_assert!(Dataset::builder("d").size_mb(value).build().unwrap_err().is_validation());
        prop_assert!(
            RunResult::builder("e").duration_seconds(value).build().unwrap_err().is_validation()
        );
    }

    /// Property: blank names never construct an experiment or dataset
    #[test]
    fn prop_blank_names_rejected(name in arb_blank()) {
        prop_assert!(Experiment::new(name.clone()).unwrap_err().is_validation());
        prop_assert!(Dataset::new(name).unwrap_err().is_validation());
    }

    /// Property: tags never contain duplicates whatever the input
    #[test]
    fn prop_tags_distinct(tags in proptest::collection::vec("[ab]{1,2}", 0..12)) {
        let experiment = Experiment::builder("t").tags(tags.clone()).build().unwrap();
        let stored = experiment.tags();
        for (i, tag) in stored.iter().enumerate() {
            prop_assert!(!stored[..i].contains(tag));
        }
        for tag in &tags {
            prop_assert!(stored.contains(tag));
        }
    }

    /// Property: mutation never moves updated_at below created_at
    #[test]
    fn prop_touch_keeps_timestamp_order(experiment in arb_experiment(), metric in -10.0f64..10.0) {
        let mut experiment = experiment;
        experiment.set_metric("score", metric);
        experiment.start();
        prop_assert!(experiment.updated_at() >= experiment.created_at());

        let doc = experiment.to_representation();
        prop_assert!(matches!(doc.get("updated_at"), Some(Value::String(_))));
    }
}
