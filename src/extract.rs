//! Extraction orchestrator: cache-aware fetch, normalize, flatten, persist
//!
//! `Extractor::extract` is the single analyst-facing operation. It either
//! serves the latest cached snapshot or runs the full pipeline: fetch raw
//! records from the source, strip provider metadata, flatten to a table,
//! rename to the public schema and persist a new cache entry. A run either
//! fully produces and caches a table or fails without caching anything.

use log::info;
use serde_json::Value;
use thiserror::Error;

use crate::cache::{CacheError, CacheStore};
use crate::flatten::flatten;
use crate::normalize::strip_metadata;
use crate::salesforce::FetchError;
use crate::table::{Table, TableError};

/// Stable column names exposed to consumers, in fixed order.
///
/// The flattened source paths are renamed to these positionally, so the
/// order here must match the field order of the fetch query.
pub const PUBLIC_SCHEMA: [&str; 19] = [
    "pas_id",
    "qx_survey_id",
    "due_date",
    "response_id",
    "enrollment_id",
    "date_of_enrollment",
    "gender",
    "race",
    "program_location",
    "program_stream",
    "cohort_id",
    "cohort_name",
    "cohort_start_date",
    "program_name",
    "first_name",
    "last_name",
    "email",
    "birthdate",
    "external_reference_id",
];

/// Default dataset identifier for the Salesforce survey extract
pub const DEFAULT_DATASET: &str = "sf";

/// Errors that can occur during an extraction run
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The remote fetch failed (login, query, or transport)
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The cache directory could not be created or listed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Reading or writing a snapshot failed, or the fetched data's shape
    /// did not match the public schema
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Source of raw record trees, the seam between the pipeline and the
/// remote service. Implemented by `SalesforceClient`; tests substitute
/// in-memory stubs.
pub trait RecordSource {
    /// Fetches the full raw record set from the remote service
    fn fetch(&self) -> Result<Vec<Value>, FetchError>;
}

/// Cache-aware extraction pipeline for one dataset
#[derive(Debug)]
pub struct Extractor<S> {
    cache: CacheStore,
    source: S,
    dataset: String,
}

impl<S: RecordSource> Extractor<S> {
    /// Creates an extractor over `cache` and `source` for `dataset`
    pub fn new(cache: CacheStore, source: S, dataset: impl Into<String>) -> Self {
        Self {
            cache,
            source,
            dataset: dataset.into(),
        }
    }

    /// Produces the result table, from cache when possible.
    ///
    /// With `force_fetch` false and an existing cache entry, the entry's
    /// contents are returned as-is and no remote call is made; the cached
    /// file is not re-validated against the current schema. Otherwise the
    /// full pipeline runs and its result is persisted as a new cache entry
    /// before being returned.
    pub fn extract(&self, force_fetch: bool) -> Result<Table, ExtractError> {
        if !force_fetch {
            if let Some(entry) = self.cache.latest_entry(&self.dataset)? {
                info!("loading cache file: {}", entry.display());
                return Ok(Table::read_csv(&entry)?);
            }
            info!("no cache file found, fetching from source");
        }

        let mut records = self.source.fetch()?;
        for record in &mut records {
            strip_metadata(record);
        }

        let mut table = flatten(&records);
        table.rename_columns(&PUBLIC_SCHEMA)?;

        let entry = self.cache.new_entry_path(&self.dataset, "csv")?;
        table.write_csv(&entry)?;
        info!("cache file created: {}", entry.display());

        Ok(table)
    }
}
