use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::exit_code::ExitCode;

/// Central error type for the orchestration layer.
///
/// Subsystem errors are wrapped transparently; the variants added here cover
/// the orchestrator's own failures. [`Error::exit_code`] maps every variant
/// to the process exit code the binary reports.
#[derive(Debug, Error)]
pub enum Error {
    /// Traversal root could not be inspected.
    #[error(transparent)]
    Walk(#[from] ezbak_walk::WalkError),

    /// Digesting failed.
    #[error(transparent)]
    Digest(#[from] ezbak_checksums::DigestError),

    /// Index append, sort, or lookup failed.
    #[error(transparent)]
    Index(#[from] ezbak_index::IndexError),

    /// Container write or extraction failed.
    #[error(transparent)]
    Archive(#[from] ezbak_archive::ArchiveError),

    /// Encryption pipeline failed.
    #[error(transparent)]
    Crypt(#[from] ezbak_crypt::CryptError),

    /// Orchestrator-level filesystem failure.
    #[error("I/O failure on '{path}': {source}", path = .path.display())]
    Io {
        /// File or directory the operation was working on.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },

    /// Missing or malformed configuration, or an unknown algorithm name.
    #[error("configuration error: {reason}")]
    Config {
        /// Human-readable description of the defect.
        reason: String,
    },

    /// The run was cancelled by a signal.
    #[error("interrupted")]
    Interrupted,
}

impl Error {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Creates a configuration error with the given reason.
    ///
    /// Exposed so the CLI layer can report unknown algorithm names and
    /// missing settings through the same taxonomy.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Maps the error to the process exit code the binary reports.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Error::Walk(_) => ExitCode::FileSelect,
            Error::Digest(err) => match err {
                ezbak_checksums::DigestError::Io { .. } => ExitCode::FileIo,
                ezbak_checksums::DigestError::Crypto(_) => ExitCode::Crypto,
            },
            Error::Index(err) => match err {
                ezbak_index::IndexError::Io { .. } => ExitCode::FileIo,
                ezbak_index::IndexError::Format { .. } => ExitCode::Format,
            },
            Error::Archive(err) => match err {
                ezbak_archive::ArchiveError::Io { .. } => ExitCode::FileIo,
                ezbak_archive::ArchiveError::Format { .. }
                | ezbak_archive::ArchiveError::MemberNotFound { .. } => ExitCode::Format,
            },
            Error::Crypt(err) => match err {
                ezbak_crypt::CryptError::Io { .. } => ExitCode::FileIo,
                ezbak_crypt::CryptError::Format { .. } => ExitCode::Format,
                ezbak_crypt::CryptError::Primitive { .. }
                | ezbak_crypt::CryptError::State { .. } => ExitCode::Crypto,
            },
            Error::Io { .. } => ExitCode::FileIo,
            Error::Config { .. } => ExitCode::Config,
            Error::Interrupted => ExitCode::Interrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_config_exit_code() {
        assert_eq!(Error::config("bad").exit_code(), ExitCode::Config);
    }

    #[test]
    fn interruption_maps_to_signal_exit_code() {
        assert_eq!(Error::Interrupted.exit_code(), ExitCode::Interrupted);
    }

    #[test]
    fn io_errors_map_to_file_io() {
        let err = Error::io(
            Path::new("/x"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.exit_code(), ExitCode::FileIo);
    }
}
