//! End-to-end tests for the cache-aware extraction pipeline
//!
//! Drives `Extractor` with an in-memory record source against a temporary
//! cache directory, checking the cache-hit/cache-miss behavior and the
//! shape of the persisted CSV snapshots.

use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use serde_json::{json, Value};
use tempfile::TempDir;

use sfextract::cache::CacheStore;
use sfextract::extract::{ExtractError, Extractor, RecordSource, PUBLIC_SCHEMA};
use sfextract::salesforce::FetchError;
use sfextract::table::Table;

/// Record source backed by canned records, counting how often it is hit
struct CannedSource {
    records: Vec<Value>,
    calls: Rc<Cell<usize>>,
}

impl RecordSource for CannedSource {
    fn fetch(&self) -> Result<Vec<Value>, FetchError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.records.clone())
    }
}

/// A raw survey-response record as Salesforce would return it: nested
/// relationship objects, each carrying an `attributes` metadata object.
fn raw_record(id: &str, email: Option<&str>) -> Value {
    json!({
        "attributes": {"type": "Participant_SurveyAssessment_Response__c", "url": "/x"},
        "Id": id,
        "Program_Survey_ID__c": "SV_3JJ1CYeq4QtkUHI",
        "Due_Date__c": "2024-05-01",
        "Survey_Response_ID__c": "R_xyz",
        "Enrollment__r": {
            "attributes": {"type": "Enrollment__c", "url": "/x"},
            "Id": "a0E1",
            "Date_Of_Enrollment__c": "2024-01-15",
            "Gender__c": "M",
            "Race_Ethnicity__c": "Two or more",
            "Program_Location__c": "North",
            "Program_Stream__c": "Day",
            "Cohorts__r": {
                "attributes": {"type": "Cohort__c", "url": "/x"},
                "Id": "a0C7",
                "Name": "Fall 2023",
                "Start_Date__c": "2023-09-01",
                "Program__r": {
                    "attributes": {"type": "Program__c", "url": "/x"},
                    "Name": "Bridges"
                }
            },
            "Participant_Contact__r": {
                "attributes": {"type": "Contact", "url": "/x"},
                "FirstName": "Sam",
                "LastName": "Rivera",
                "Email": email,
                "Birthdate": "1988-03-22",
                "External_Reference_ID__c": "EXT-7"
            }
        }
    })
}

struct Pipeline {
    extractor: Extractor<CannedSource>,
    calls: Rc<Cell<usize>>,
    cache_dir: PathBuf,
    _temp_dir: TempDir,
}

fn pipeline_with(records: Vec<Value>) -> Pipeline {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let cache_root = temp_dir.path().join("cache");
    let calls = Rc::new(Cell::new(0));
    let source = CannedSource {
        records,
        calls: Rc::clone(&calls),
    };
    let extractor = Extractor::new(CacheStore::new(cache_root.clone()), source, "sf");
    Pipeline {
        extractor,
        calls,
        cache_dir: cache_root.join("sf"),
        _temp_dir: temp_dir,
    }
}

fn snapshot_names(pipeline: &Pipeline) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(&pipeline.cache_dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn test_first_run_fetches_and_persists_one_snapshot() {
    let pipeline = pipeline_with(vec![raw_record("a0B1", Some("sam@example.org"))]);

    let table = pipeline.extractor.extract(false).expect("run should succeed");

    assert_eq!(pipeline.calls.get(), 1);
    assert_eq!(snapshot_names(&pipeline).len(), 1);
    assert_eq!(table.columns(), PUBLIC_SCHEMA);
    assert_eq!(table.num_rows(), 1);
}

#[test]
fn test_snapshot_file_has_public_schema_header() {
    let pipeline = pipeline_with(vec![raw_record("a0B1", None)]);

    pipeline.extractor.extract(false).expect("run should succeed");

    let name = snapshot_names(&pipeline).pop().expect("one snapshot");
    let content = fs::read_to_string(pipeline.cache_dir.join(name)).expect("read snapshot");
    let header = content.lines().next().expect("header row");
    assert_eq!(header, PUBLIC_SCHEMA.join(","));
    // No provider metadata column leaked into the snapshot
    assert!(!content.contains("attributes"));
}

#[test]
fn test_second_run_serves_cache_without_fetching() {
    let pipeline = pipeline_with(vec![raw_record("a0B1", Some("sam@example.org"))]);

    let fresh = pipeline.extractor.extract(false).expect("first run");
    let cached = pipeline.extractor.extract(false).expect("second run");

    assert_eq!(pipeline.calls.get(), 1, "cache hit must not call the source");
    assert_eq!(snapshot_names(&pipeline).len(), 1, "cache hit must not write");
    assert_eq!(cached, fresh);
}

#[test]
fn test_force_fetch_writes_a_new_snapshot() {
    let pipeline = pipeline_with(vec![raw_record("a0B1", None)]);

    // Seed an older snapshot by hand so the fresh one gets a later name
    fs::create_dir_all(&pipeline.cache_dir).expect("create cache dir");
    fs::write(
        pipeline.cache_dir.join("19991231235959.csv"),
        format!("{}\n", PUBLIC_SCHEMA.join(",")),
    )
    .expect("seed snapshot");

    pipeline.extractor.extract(true).expect("forced run");

    assert_eq!(pipeline.calls.get(), 1);
    let names = snapshot_names(&pipeline);
    assert_eq!(names.len(), 2);
    assert_eq!(names[0], "19991231235959.csv");
}

#[test]
fn test_cached_snapshot_round_trips_exactly() {
    let pipeline = pipeline_with(vec![
        raw_record("a0B1", Some("sam@example.org")),
        raw_record("a0B2", None),
    ]);

    let fresh = pipeline.extractor.extract(true).expect("forced run");

    let name = snapshot_names(&pipeline).pop().expect("one snapshot");
    let read_back = Table::read_csv(&pipeline.cache_dir.join(name)).expect("read snapshot");
    assert_eq!(read_back, fresh);
    // Null email flattened to a missing cell and stayed missing on disk
    assert_eq!(read_back.rows()[1][16], None);
}

#[test]
fn test_failing_source_leaves_cache_empty() {
    struct RejectedLogin;

    impl RecordSource for RejectedLogin {
        fn fetch(&self) -> Result<Vec<Value>, FetchError> {
            Err(FetchError::Login("INVALID_LOGIN".to_string()))
        }
    }

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let cache_root = temp_dir.path().join("cache");
    let extractor = Extractor::new(CacheStore::new(cache_root.clone()), RejectedLogin, "sf");

    let err = extractor.extract(false).expect_err("run must fail");

    assert!(matches!(err, ExtractError::Fetch(_)));
    let entries = fs::read_dir(cache_root.join("sf"))
        .map(|e| e.count())
        .unwrap_or(0);
    assert_eq!(entries, 0, "failed run must not cache");
}
