use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while writing, sorting, or searching a digest index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Filesystem failure on the named file.
    #[error("index I/O failure on '{path}': {source}", path = .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },

    /// A record could not be parsed, or a path cannot be represented in the
    /// record format.
    #[error("malformed index record: {reason}")]
    Format {
        /// Human-readable description of the defect.
        reason: String,
    },
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }
}
