//! The unsorted append log written during a walk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::record::Record;

/// Buffered writer for the unsorted digest log.
///
/// Records land in walk order; [`sort_index`](crate::sort_index) turns the
/// finished log into a searchable index.
pub struct AppendLog {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl AppendLog {
    /// Creates (or truncates) the log at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Io`] when the file cannot be created.
    pub fn create(path: &Path) -> Result<Self, IndexError> {
        let file = File::create(path).map_err(|source| IndexError::io(path, source))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    /// Appends one `(path, digest)` record.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Format`] for unrepresentable paths and
    /// [`IndexError::Io`] for write failures.
    pub fn append(&mut self, file_path: &Path, hex: &str) -> Result<(), IndexError> {
        let record = Record::new(file_path, hex)?;
        record
            .write_to(&mut self.writer)
            .map_err(|source| IndexError::io(&self.path, source))?;
        self.records += 1;
        Ok(())
    }

    /// Number of records appended so far.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.records
    }

    /// Reports whether nothing has been appended.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Flushes buffered records to disk.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Io`] when the flush fails.
    pub fn finish(mut self) -> Result<(), IndexError> {
        self.writer
            .flush()
            .map_err(|source| IndexError::io(&self.path, source))
    }
}
