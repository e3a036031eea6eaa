//! Command-line interface parsing for sfextract
//!
//! This module handles parsing of CLI arguments using clap, including the
//! --fetch flag that forces a fresh pull even when a cache entry exists.

use clap::Parser;
use thiserror::Error;

use crate::extract::DEFAULT_DATASET;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The dataset identifier contains characters unsafe in a path segment
    #[error("Invalid dataset id: '{0}'. Use only letters, digits, '-' and '_'")]
    InvalidDataset(String),
}

/// Extract Salesforce survey responses into cached CSV snapshots
#[derive(Parser, Debug)]
#[command(name = "sfextract")]
#[command(about = "Extract Salesforce survey responses into cached CSV snapshots")]
#[command(version)]
pub struct Cli {
    /// Force a fresh fetch from Salesforce even when a cache entry exists
    #[arg(long)]
    pub fetch: bool,

    /// Dataset identifier scoping the cache directory
    #[arg(long, default_value = DEFAULT_DATASET, value_parser = parse_dataset_arg)]
    pub dataset: String,

    /// Write the resulting table to stdout as CSV
    #[arg(long)]
    pub print: bool,
}

/// Validates a dataset identifier for use as a path segment.
///
/// # Arguments
/// * `s` - The dataset id string from the CLI
///
/// # Returns
/// * `Ok(String)` if the id is non-empty and path-safe
/// * `Err(CliError::InvalidDataset)` otherwise
pub fn parse_dataset_arg(s: &str) -> Result<String, CliError> {
    let valid = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(s.to_string())
    } else {
        Err(CliError::InvalidDataset(s.to_string()))
    }
}
