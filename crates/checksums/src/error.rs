use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure while digesting a stream.
#[derive(Debug, Error)]
pub enum DigestError {
    /// The underlying file could not be opened or read.
    #[error("failed to read '{path}' for digesting: {source}", path = .path.display())]
    Io {
        /// Path whose contents could not be read.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },

    /// The hashing primitive reported a failure.
    #[error("message digest failure: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),
}

impl DigestError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
