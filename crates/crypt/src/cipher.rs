//! Cipher selection by name.

use std::fmt;
use std::str::FromStr;

use openssl::symm::Cipher;
use thiserror::Error;

/// A symmetric cipher usable for archive encryption, addressed by the name
/// the `openssl enc` utility uses for it.
///
/// The name is recorded in the configuration file and as the encrypted
/// archive's final extension, so a later restore can pick the matching
/// cipher without guessing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CipherSpec {
    /// AES-128 in CBC mode.
    Aes128Cbc,
    /// AES-192 in CBC mode.
    Aes192Cbc,
    /// AES-256 in CBC mode. The recommended default.
    Aes256Cbc,
    /// AES-128 in CTR mode.
    Aes128Ctr,
    /// AES-256 in CTR mode.
    Aes256Ctr,
    /// Triple DES in CBC mode, for interoperability with old archives.
    DesEde3Cbc,
}

impl CipherSpec {
    /// Returns the `openssl enc`-compatible cipher name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            CipherSpec::Aes128Cbc => "aes-128-cbc",
            CipherSpec::Aes192Cbc => "aes-192-cbc",
            CipherSpec::Aes256Cbc => "aes-256-cbc",
            CipherSpec::Aes128Ctr => "aes-128-ctr",
            CipherSpec::Aes256Ctr => "aes-256-ctr",
            CipherSpec::DesEde3Cbc => "des-ede3-cbc",
        }
    }

    /// Resolves the OpenSSL cipher implementation.
    #[must_use]
    pub fn cipher(self) -> Cipher {
        match self {
            CipherSpec::Aes128Cbc => Cipher::aes_128_cbc(),
            CipherSpec::Aes192Cbc => Cipher::aes_192_cbc(),
            CipherSpec::Aes256Cbc => Cipher::aes_256_cbc(),
            CipherSpec::Aes128Ctr => Cipher::aes_128_ctr(),
            CipherSpec::Aes256Ctr => Cipher::aes_256_ctr(),
            CipherSpec::DesEde3Cbc => Cipher::des_ede3_cbc(),
        }
    }

    /// Key length in bytes.
    #[must_use]
    pub fn key_len(self) -> usize {
        self.cipher().key_len()
    }

    /// IV length in bytes, zero for modes without one.
    #[must_use]
    pub fn iv_len(self) -> usize {
        self.cipher().iv_len().unwrap_or(0)
    }

    /// Cipher block size in bytes.
    #[must_use]
    pub fn block_size(self) -> usize {
        self.cipher().block_size()
    }
}

impl fmt::Display for CipherSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unsupported cipher name.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("unsupported cipher: {input}")]
pub struct CipherParseError {
    input: String,
}

impl CipherParseError {
    /// Returns the invalid input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl FromStr for CipherSpec {
    type Err = CipherParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-128-cbc" => Ok(CipherSpec::Aes128Cbc),
            "aes-192-cbc" => Ok(CipherSpec::Aes192Cbc),
            "aes-256-cbc" => Ok(CipherSpec::Aes256Cbc),
            "aes-128-ctr" => Ok(CipherSpec::Aes128Ctr),
            "aes-256-ctr" => Ok(CipherSpec::Aes256Ctr),
            "des-ede3-cbc" => Ok(CipherSpec::DesEde3Cbc),
            other => Err(CipherParseError {
                input: other.to_string(),
            }),
        }
    }
}
