//! Tabular snapshot representation and CSV persistence
//!
//! A `Table` is the artifact the extraction pipeline produces and caches:
//! named columns in a fixed order, one row per source record, with missing
//! or null fields represented as `None`. Tables round-trip through the
//! header-row CSV format used for cache entries.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur reading, writing, or reshaping a table
#[derive(Debug, Error)]
pub enum TableError {
    /// Filesystem read or write failed
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization or parsing failed
    #[error("snapshot CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A positional rename was given the wrong number of names
    #[error("rename expects {expected} columns, table has {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },
}

/// A tabular result set: ordered columns and one row per record
///
/// Cells are `Option<String>`: `None` means the field was absent or null
/// in the source record. On disk a `None` cell is an empty CSV field, so
/// a written-then-read table compares equal to the original apart from
/// present-but-empty strings, which come back as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Builds a table from raw parts.
    ///
    /// Every row must have exactly `columns.len()` cells; the flattener
    /// and the CSV reader uphold this.
    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Self { columns, rows }
    }

    /// The column names, in table order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The rows, each the same width as `columns()`
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Number of rows in the table
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the table
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Replaces all column names positionally.
    ///
    /// This is a strict 1:1 rename, not a transformation: if the table does
    /// not have exactly `names.len()` columns the shape of the fetched data
    /// no longer matches expectations and the rename fails.
    pub fn rename_columns(&mut self, names: &[&str]) -> Result<(), TableError> {
        if names.len() != self.columns.len() {
            return Err(TableError::ColumnCountMismatch {
                expected: names.len(),
                actual: self.columns.len(),
            });
        }
        self.columns = names.iter().map(|name| name.to_string()).collect();
        Ok(())
    }

    /// Writes the table to `path` as UTF-8 CSV with a header row
    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let file = File::create(path)?;
        self.write_csv_to(file)
    }

    /// Writes the table to an arbitrary writer as CSV with a header row.
    ///
    /// A zero-column table produces no output at all; CSV has no way to
    /// express a header row with zero fields.
    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<(), TableError> {
        if self.columns.is_empty() {
            return Ok(());
        }
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(&self.columns)?;
        for row in &self.rows {
            out.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        out.flush()?;
        Ok(())
    }

    /// Reads a table from a CSV file written by [`Table::write_csv`]
    pub fn read_csv(path: &Path) -> Result<Self, TableError> {
        let file = File::open(path)?;
        Self::read_csv_from(file)
    }

    /// Reads a table from an arbitrary CSV reader.
    ///
    /// The first record is the header row; empty fields become `None`
    /// cells. Empty input yields an empty table.
    pub fn read_csv_from<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut input = csv::Reader::from_reader(reader);
        let columns: Vec<String> = input.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in input.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            None
                        } else {
                            Some(field.to_string())
                        }
                    })
                    .collect(),
            );
        }
        Ok(Self { columns, rows })
    }
}
