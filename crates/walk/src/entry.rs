use std::fs;
use std::path::{Path, PathBuf};

/// A single filesystem entry produced by a traversal.
///
/// Entries are yielded for regular files and symbolic links; directories are
/// descended but never yielded themselves.
#[derive(Debug)]
pub struct WalkEntry {
    pub(crate) path: PathBuf,
    pub(crate) metadata: fs::Metadata,
    pub(crate) depth: usize,
}

impl WalkEntry {
    /// Returns the absolute path of the entry.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consumes the entry, returning its absolute path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// Provides access to the [`fs::Metadata`] captured for the entry.
    ///
    /// The metadata comes from `symlink_metadata`, so symbolic links report
    /// their own file type rather than the target's.
    #[must_use]
    pub fn metadata(&self) -> &fs::Metadata {
        &self.metadata
    }

    /// Reports whether the entry is a regular file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.metadata.file_type().is_file()
    }

    /// Reports the depth of the entry below the root (direct children are `1`).
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }
}
