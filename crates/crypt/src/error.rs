use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure inside the encryption pipeline.
#[derive(Debug, Error)]
pub enum CryptError {
    /// Filesystem failure.
    #[error("crypto I/O failure on '{path}': {source}", path = .path.display())]
    Io {
        /// File the operation was working on.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },

    /// The input does not carry the expected `Salted__` framing.
    #[error("'{path}' is not a salted artifact: {reason}", path = .path.display())]
    Format {
        /// File that failed to parse.
        path: PathBuf,
        /// Human-readable description of the defect.
        reason: String,
    },

    /// A cryptographic primitive failed (init, update, final, or the RNG
    /// after its fallback).
    #[error("cryptographic primitive failure: {reason}")]
    Primitive {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// The [`KeyMaterial`](crate::KeyMaterial) state machine was driven out
    /// of order.
    #[error("crypto state misuse: {reason}")]
    State {
        /// Which transition was attempted illegally.
        reason: String,
    },
}

impl CryptError {
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

    pub(crate) fn primitive(reason: impl Into<String>) -> Self {
        Self::Primitive {
            reason: reason.into(),
        }
    }

    pub(crate) fn state(reason: impl Into<String>) -> Self {
        Self::State {
            reason: reason.into(),
        }
    }
}

impl From<openssl::error::ErrorStack> for CryptError {
    fn from(stack: openssl::error::ErrorStack) -> Self {
        Self::primitive(stack.to_string())
    }
}
