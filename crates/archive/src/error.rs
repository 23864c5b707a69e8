use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while writing or reading an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Filesystem or stream failure.
    #[error("archive I/O failure on '{path}': {source}", path = .path.display())]
    Io {
        /// File the operation was working on.
        path: PathBuf,
        /// Underlying error emitted by the operating system or codec.
        source: io::Error,
    },

    /// The container could not be parsed as a tar stream.
    #[error("'{path}' is not a readable archive: {reason}", path = .path.display())]
    Format {
        /// Archive that failed to parse.
        path: PathBuf,
        /// Human-readable description of the defect.
        reason: String,
    },

    /// The requested member is not present in the archive.
    #[error("archive member '{logical_path}' not found in '{path}'", path = .path.display())]
    MemberNotFound {
        /// Archive that was scanned.
        path: PathBuf,
        /// Logical path that was requested.
        logical_path: String,
    },
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
