//! Cache module for storing dataset snapshots to disk
//!
//! This module provides a cache store that maps each logical dataset to a
//! directory of timestamped CSV snapshot files. Snapshots are append-only:
//! every fresh extraction writes a new file, and the latest snapshot is
//! resolved by filename order rather than mtime.

mod store;

pub use store::{CacheError, CacheStore};
