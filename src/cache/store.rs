//! Cache store for persisting dataset snapshots to disk
//!
//! Each logical dataset gets its own directory under the cache root; every
//! extraction writes a new file named with a fixed-width wall-clock
//! timestamp. Because the format is fixed-width, lexicographic filename
//! order equals chronological order and the latest snapshot is simply the
//! greatest filename. Files are never mutated or deleted here.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;

/// Fixed-width, second-resolution timestamp used for snapshot filenames
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Errors raised by cache directory and path operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Creating or listing a cache directory failed
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Filesystem store mapping dataset identifiers to snapshot directories
///
/// Writes are append-only-by-new-filename, so concurrent readers need no
/// locking. Two snapshots taken within the same clock second for the same
/// dataset share a filename and the later write overwrites the earlier
/// one; that collision is an accepted limitation of the format.
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory under which per-dataset directories live
    root: PathBuf,
}

impl CacheStore {
    /// Creates a store rooted at `root` (typically `{data root}/cache`)
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Returns the directory for `dataset`, creating it if absent.
    ///
    /// The dataset identifier is used as a path segment, so it must not
    /// contain path separators; the CLI validates this at parse time.
    pub fn dataset_dir(&self, dataset: &str) -> Result<PathBuf, CacheError> {
        let dir = self.root.join(dataset);
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        Ok(dir)
    }

    /// Returns the most recent snapshot for `dataset`, or `None` if the
    /// dataset has no snapshots yet.
    ///
    /// "Most recent" is the lexicographically greatest filename, which the
    /// fixed-width timestamp format makes equal to the newest.
    pub fn latest_entry(&self, dataset: &str) -> Result<Option<PathBuf>, CacheError> {
        let dir = self.dataset_dir(dataset)?;
        let mut latest: Option<PathBuf> = None;
        for entry in fs::read_dir(&dir).map_err(|e| CacheError::io(&dir, e))? {
            let entry = entry.map_err(|e| CacheError::io(&dir, e))?;
            let path = entry.path();
            if latest
                .as_ref()
                .map_or(true, |current| path.file_name() > current.file_name())
            {
                latest = Some(path);
            }
        }
        Ok(latest)
    }

    /// Generates the path for a new snapshot of `dataset` with the given
    /// file extension, named with the current wall-clock time.
    pub fn new_entry_path(&self, dataset: &str, extension: &str) -> Result<PathBuf, CacheError> {
        let dir = self.dataset_dir(dataset)?;
        let stamp = Local::now().format(TIMESTAMP_FORMAT);
        Ok(dir.join(format!("{}.{}", stamp, extension)))
    }
}
