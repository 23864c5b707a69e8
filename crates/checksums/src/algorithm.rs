//! Enumeration of the digest algorithms recognised by the backup format.

use std::fmt;
use std::str::FromStr;

use openssl::hash::MessageDigest;
use thiserror::Error;

/// Digest algorithms usable for the per-file content index.
///
/// The algorithm must stay stable between a run and its successor; otherwise
/// every file would read as changed. The orchestrator enforces that by
/// ignoring a prior index recorded under a different algorithm.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HashAlgorithm {
    /// MD5 (128-bit). Kept for speed and legacy indexes, not for security.
    Md5,
    /// SHA-1 (160-bit).
    Sha1,
    /// SHA-256 (256-bit). The default.
    Sha256,
    /// SHA-512 (512-bit).
    Sha512,
}

impl HashAlgorithm {
    /// Returns the canonical lowercase name used in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Width in characters of the hexadecimal digest string.
    #[must_use]
    pub const fn hex_width(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 32,
            HashAlgorithm::Sha1 => 40,
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha512 => 128,
        }
    }

    /// Resolves the OpenSSL message digest backing this algorithm.
    #[must_use]
    pub fn message_digest(self) -> MessageDigest {
        match self {
            HashAlgorithm::Md5 => MessageDigest::md5(),
            HashAlgorithm::Sha1 => MessageDigest::sha1(),
            HashAlgorithm::Sha256 => MessageDigest::sha256(),
            HashAlgorithm::Sha512 => MessageDigest::sha512(),
        }
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        Self::Sha256
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown digest algorithm name.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("unsupported checksum algorithm: {input}")]
pub struct HashAlgorithmParseError {
    input: String,
}

impl HashAlgorithmParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the invalid input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashAlgorithmParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(HashAlgorithmParseError::new(other)),
        }
    }
}
