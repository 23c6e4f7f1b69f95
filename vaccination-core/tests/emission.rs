//! Integration tests for the emission pipeline.
//!
//! Exercises load → validate → map → emit from the public API with CSV files
//! on disk and an in-test validation engine.

use pretty_assertions::assert_eq;
use vaccination_core::{
    ExpectationOutcome, IngestError, MetadataWorkUnit, Pipeline, PipelineContext, Recipe,
    RuntimeBatchRequest, SinkConfig, Source, VaccinationSource, ValidationEngine,
    ValidationResult,
};

const HEADER: &str = "location,date,vaccine,source_url,total_vaccinations,people_vaccinated,people_fully_vaccinated,total_boosters";

fn write_csv(dir: &tempfile::TempDir, rows: &[&str]) -> String {
    let path = dir.path().join("vaccinations.csv");
    std::fs::write(&path, format!("{HEADER}\n{}\n", rows.join("\n"))).unwrap();
    path.to_str().unwrap().to_string()
}

fn source(config: serde_json::Value) -> VaccinationSource {
    VaccinationSource::create(config, PipelineContext::default()).unwrap()
}

/// Engine with a fixed verdict; reports the batch row count as observed value.
struct FixedEngine {
    pass: bool,
}

impl ValidationEngine for FixedEngine {
    fn name(&self) -> &str {
        "fixed"
    }

    fn validate(&self, request: &RuntimeBatchRequest<'_>) -> Result<ValidationResult, IngestError> {
        Ok(ValidationResult::from_outcomes(
            &request.expectation_suite_name,
            &request.data_asset_name,
            vec![ExpectationOutcome {
                expectation_type: "expect_column_values_to_not_be_null".into(),
                column: Some("total_boosters".into()),
                success: self.pass,
                unexpected_count: if self.pass { 0 } else { 1 },
                unexpected_rows: if self.pass { vec![] } else { vec![0] },
                observed: Some(request.batch_data.row_count().to_string()),
            }],
        ))
    }
}

/// Engine that cannot run at all.
struct BrokenEngine;

impl ValidationEngine for BrokenEngine {
    fn name(&self) -> &str {
        "broken"
    }

    fn validate(&self, _: &RuntimeBatchRequest<'_>) -> Result<ValidationResult, IngestError> {
        Err(IngestError::validation_engine("suite store unreachable"))
    }
}

// ── Concrete scenarios ───────────────────────────────────────────────────

#[tokio::test]
async fn test_us_row_maps_to_expected_unit() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &["United States,2021-01-12,Pfizer/BioNTech,http://example.org,5000,4000,1000,"],
    );
    let mut src = source(serde_json::json!({ "csv_file_url": csv }));

    let units: Vec<MetadataWorkUnit> = src
        .get_workunits()
        .await
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(units.len(), 1);
    let wu = &units[0];
    assert_eq!(wu.id, "2021-01-12");
    assert!(wu.urn().as_str().ends_with("United_States,PROD)"));

    let props = wu.properties().unwrap();
    assert_eq!(
        props.description,
        "Vaccination data for United States on 2021-01-12"
    );
    assert_eq!(props.custom_properties["total_boosters"], "None");
    assert_eq!(props.custom_properties["total_vaccinations"], "5000");
    assert_eq!(props.custom_properties["people_vaccinated"], "4000");
    assert_eq!(props.custom_properties["people_fully_vaccinated"], "1000");

    assert_eq!(src.get_report().workunits_produced, 1);
}

#[tokio::test]
async fn test_wrong_date_format_aborts_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &[
            "United States,2021-01-12,Pfizer/BioNTech,http://example.org,5000,4000,1000,",
            "United States,13-01-2021,Pfizer/BioNTech,http://example.org,6000,4500,1500,",
            "United States,2021-01-14,Pfizer/BioNTech,http://example.org,7000,5000,2000,",
        ],
    );
    let mut src = source(serde_json::json!({ "csv_file_url": csv }));

    let results: Vec<Result<MetadataWorkUnit, IngestError>> =
        src.get_workunits().await.unwrap().collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    match &results[1] {
        Err(IngestError::Format {
            row, field, value, ..
        }) => {
            assert_eq!(*row, 1);
            assert_eq!(field, "date");
            assert_eq!(value, "13-01-2021");
        }
        other => panic!("expected format error, got {other:?}"),
    }

    let report = src.get_report();
    assert_eq!(report.workunits_produced, 1);
    assert_eq!(report.failures.len(), 1);
}

#[tokio::test]
async fn test_parenthesized_location_is_emitted() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &[
            "Micronesia (country),2021-07-01,Moderna,https://a,100,80,,",
            "Chile,2021-07-01,Sinovac,https://b,200,150,,",
        ],
    );
    let mut src = source(serde_json::json!({ "csv_file_url": csv }));

    let units: Vec<MetadataWorkUnit> = src
        .get_workunits()
        .await
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(units.len(), 2);
    assert_eq!(
        units[0].urn().as_str(),
        "urn:li:dataset:(urn:li:dataPlatform:vaccination_data,Micronesia_%28country%29,PROD)"
    );
    assert!(src.get_report().failures.is_empty());
    assert_eq!(src.get_report().workunits_produced, 2);
}

// ── Ordering and counting ────────────────────────────────────────────────

#[tokio::test]
async fn test_order_preserved_and_counter_matches() {
    let dir = tempfile::TempDir::new().unwrap();
    let rows: Vec<String> = (1..=20)
        .rev()
        .map(|d| format!("Chile,2021-03-{d:02},Sinovac,http://a,{d},{d},,"))
        .collect();
    let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let csv = write_csv(&dir, &row_refs);
    let mut src = source(serde_json::json!({ "csv_file_url": csv, "env": "DEV" }));

    let mut stream = src.get_workunits().await.unwrap();
    let mut ids = Vec::new();
    while let Some(item) = stream.next() {
        ids.push(item.unwrap().id);
        assert_eq!(stream.report().workunits_produced, ids.len());
    }
    drop(stream);

    let expected: Vec<String> = (1..=20).rev().map(|d| format!("2021-03-{d:02}")).collect();
    assert_eq!(ids, expected);
    assert_eq!(src.get_report().workunit_ids, expected);
    assert_eq!(src.get_report().rows_loaded, 20);
}

#[tokio::test]
async fn test_duplicate_dates_collide() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &[
            "Chile,2021-01-01,Sinovac,http://a,1,,,",
            "Peru,2021-01-01,Sinopharm,http://b,2,,,",
        ],
    );
    let mut src = source(serde_json::json!({ "csv_file_url": csv }));
    let ids: Vec<String> = src
        .get_workunits()
        .await
        .unwrap()
        .map(|r| r.unwrap().id)
        .collect();
    assert_eq!(ids, vec!["2021-01-01", "2021-01-01"]);
}

#[tokio::test]
async fn test_early_stop_is_safe() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &[
            "Chile,2021-01-01,Sinovac,http://a,1,,,",
            "Chile,2021-01-02,Sinovac,http://a,2,,,",
            "Chile,2021-01-03,Sinovac,http://a,3,,,",
        ],
    );
    let mut src = source(serde_json::json!({ "csv_file_url": csv }));
    let first = src.get_workunits().await.unwrap().next().unwrap().unwrap();
    assert_eq!(first.id, "2021-01-01");
    assert_eq!(src.get_report().workunits_produced, 1);
    src.close().unwrap();
}

// ── Run-level failures ───────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_source_aborts() {
    let mut src = source(serde_json::json!({ "csv_file_url": "/no/such/file.csv" }));
    let err = src.get_workunits().await.unwrap_err();
    assert!(matches!(err, IngestError::SourceUnavailable { .. }));
    assert_eq!(src.get_report().failures.len(), 1);
}

#[tokio::test]
async fn test_missing_column_aborts_before_any_unit() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("partial.csv");
    std::fs::write(&path, "location,date,vaccine\nChile,2021-01-01,Sinovac\n").unwrap();
    let mut src = source(serde_json::json!({ "csv_file_url": path.to_str().unwrap() }));
    let err = src.get_workunits().await.unwrap_err();
    assert!(matches!(err, IngestError::MissingColumn(ref c) if c == "source_url"));
}

#[tokio::test]
async fn test_header_only_csv_warns_and_emits_nothing() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, format!("{HEADER}\n")).unwrap();
    let mut src = source(serde_json::json!({ "csv_file_url": path.to_str().unwrap() }));

    assert_eq!(src.get_workunits().await.unwrap().count(), 0);
    let report = src.get_report();
    assert_eq!(report.rows_loaded, 0);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].key, "source");
}

#[tokio::test]
async fn test_non_utf8_file_is_a_decode_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("latin1.csv");
    let mut bytes = format!("{HEADER}\n").into_bytes();
    bytes.extend_from_slice(b"Cura\xe7ao,2021-01-01,Pfizer,http://a,1,,,\n");
    std::fs::write(&path, bytes).unwrap();
    let mut src = source(serde_json::json!({ "csv_file_url": path.to_str().unwrap() }));

    let err = src.get_workunits().await.unwrap_err();
    assert!(matches!(err, IngestError::Csv(_)), "{err:?}");
}

// ── Validation policy ────────────────────────────────────────────────────

#[tokio::test]
async fn test_annotate_policy_emits_everything_and_attaches_result() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &[
            "Chile,2021-01-01,Sinovac,http://a,1,,,",
            "Chile,2021-01-02,Sinovac,http://a,2,,,",
        ],
    );
    let mut src = source(serde_json::json!({
        "csv_file_url": csv,
        "validation": { "policy": "annotate" }
    }))
    .with_validation_engine(Box::new(FixedEngine { pass: false }));
    assert!(src.has_validation());

    let count = src.get_workunits().await.unwrap().count();
    assert_eq!(count, 2);

    let validation = src.get_report().validation.as_ref().unwrap();
    assert!(!validation.success);
    assert_eq!(validation.expectation_suite_name, "vaccination_expectations");
    assert_eq!(validation.results[0].observed.as_deref(), Some("2"));

    let warnings = &src.get_report().warnings;
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].key, "validation");
    assert!(warnings[0].message.contains("failed 1 of 1"));
}

#[tokio::test]
async fn test_block_policy_stops_before_first_unit() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(&dir, &["Chile,2021-01-01,Sinovac,http://a,1,,,"]);
    let mut src = source(serde_json::json!({
        "csv_file_url": csv,
        "validation": { "policy": "block" }
    }))
    .with_validation_engine(Box::new(FixedEngine { pass: false }));

    let err = src.get_workunits().await.unwrap_err();
    assert!(matches!(err, IngestError::ValidationFailed { .. }));
    let report = src.get_report();
    assert_eq!(report.workunits_produced, 0);
    assert!(report.validation.is_some());
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_block_policy_passes_clean_batch() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(&dir, &["Chile,2021-01-01,Sinovac,http://a,1,,,"]);
    let mut src = source(serde_json::json!({
        "csv_file_url": csv,
        "validation": { "policy": "block" }
    }))
    .with_validation_engine(Box::new(FixedEngine { pass: true }));

    assert_eq!(src.get_workunits().await.unwrap().count(), 1);
}

#[tokio::test]
async fn test_engine_failure_aborts_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(&dir, &["Chile,2021-01-01,Sinovac,http://a,1,,,"]);
    let mut src = source(serde_json::json!({ "csv_file_url": csv, "validation": {} }))
        .with_validation_engine(Box::new(BrokenEngine));

    let err = src.get_workunits().await.unwrap_err();
    assert!(matches!(err, IngestError::ValidationEngine(_)));
}

#[tokio::test]
async fn test_engine_ignored_without_validation_section() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(&dir, &["Chile,2021-01-01,Sinovac,http://a,1,,,"]);
    let mut src = source(serde_json::json!({ "csv_file_url": csv }))
        .with_validation_engine(Box::new(BrokenEngine));

    assert!(!src.has_validation());
    assert_eq!(src.get_workunits().await.unwrap().count(), 1);
    assert!(src.get_report().validation.is_none());
}

// ── Pipeline ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pipeline_writes_units_to_file_sink() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &[
            "Chile,2021-01-01,Sinovac,http://a,1,,,",
            "Chile,2021-01-02,Sinovac,http://a,2,,,",
        ],
    );
    let out = dir.path().join("mces.jsonl");
    let recipe = Recipe {
        pipeline_name: Some("vaccination_us".into()),
        source: vaccination_core::config::SourceRecipe {
            source_type: "vaccination".into(),
            config: serde_json::json!({ "csv_file_url": csv }),
        },
        sink: SinkConfig::File {
            filename: out.clone(),
        },
    };

    let mut pipeline = Pipeline::create(&recipe, None).unwrap();
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.source_report.workunits_produced, 2);
    assert_eq!(summary.pipeline_name.as_deref(), Some("vaccination_us"));

    let lines: Vec<MetadataWorkUnit> = std::fs::read_to_string(&out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].id, "2021-01-02");
}

#[tokio::test]
async fn test_pipeline_abort_flushes_written_units() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &[
            "Chile,2021-01-01,Sinovac,http://a,1,,,",
            "Chile,2021-01-02,Sinovac,http://a,many,,,",
        ],
    );
    let out = dir.path().join("mces.jsonl");
    let recipe = Recipe {
        source: vaccination_core::config::SourceRecipe {
            source_type: "vaccination".into(),
            config: serde_json::json!({ "csv_file_url": csv }),
        },
        ..Recipe::default()
    };
    let sink = Box::new(vaccination_core::sink::FileSink::create(&out).unwrap());

    let mut pipeline = Pipeline::with_sink(&recipe, None, sink).unwrap();
    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, IngestError::Type { row: 1, .. }));
    assert_eq!(pipeline.source_report().workunits_produced, 1);
    assert_eq!(std::fs::read_to_string(&out).unwrap().lines().count(), 1);
}
