//! sfextract library
//!
//! Cache-aware extraction of Salesforce survey-response records into flat
//! CSV snapshots. The modules are exposed for use in integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod extract;
pub mod flatten;
pub mod normalize;
pub mod salesforce;
pub mod table;
