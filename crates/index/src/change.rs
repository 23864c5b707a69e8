//! Classification of a file against the prior run's index.

use std::path::Path;

use crate::error::IndexError;
use crate::search::SortedIndex;

/// Outcome of comparing a fresh digest with the prior index.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileStatus {
    /// The path was absent from the prior index (or there was no prior run).
    New,
    /// The path was present with a different digest.
    Changed,
    /// The path was present with the same digest; its payload is omitted
    /// from the new archive, but the record is still appended to the current
    /// index so later runs keep seeing it.
    Unchanged,
}

impl FileStatus {
    /// Reports whether the file's payload must be streamed into the archive.
    #[must_use]
    pub const fn needs_ingest(self) -> bool {
        matches!(self, FileStatus::New | FileStatus::Changed)
    }
}

/// Classifies `path` given its fresh digest and the prior index, if any.
///
/// # Errors
///
/// Propagates [`IndexError`] from the prior-index lookup.
pub fn classify(
    path: &Path,
    fresh_hex: &str,
    prior: Option<&mut SortedIndex>,
) -> Result<FileStatus, IndexError> {
    let Some(prior) = prior else {
        return Ok(FileStatus::New);
    };
    match prior.lookup(path)? {
        Some(prior_hex) if prior_hex == fresh_hex => Ok(FileStatus::Unchanged),
        Some(_) => Ok(FileStatus::Changed),
        None => Ok(FileStatus::New),
    }
}
