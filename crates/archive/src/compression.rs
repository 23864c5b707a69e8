//! Shared enumeration describing the archive compression filters.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Compression filters applicable to the tar stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Compression {
    /// No filter; the output is a plain tar stream.
    None,
    /// gzip (DEFLATE) via `flate2`.
    Gzip,
    /// bzip2 via the `bzip2` crate.
    Bzip2,
    /// xz/LZMA2 via `xz2`.
    Xz,
    /// LZ4 frame format via `lz4_flex`. The level knob is ignored; the frame
    /// encoder has a single speed profile.
    Lz4,
}

impl Compression {
    /// Returns the canonical name used in configuration files and the CLI.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            Compression::Xz => "xz",
            Compression::Lz4 => "lz4",
        }
    }

    /// Returns the archive-name extension, or `None` for the plain filter.
    #[must_use]
    pub const fn extension(self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some("gz"),
            Compression::Bzip2 => Some("bz2"),
            Compression::Xz => Some("xz"),
            Compression::Lz4 => Some("lz4"),
        }
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unsupported compression name.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("unsupported compressor: {input}")]
pub struct CompressionParseError {
    input: String,
}

impl CompressionParseError {
    /// Returns the invalid input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl FromStr for Compression {
    type Err = CompressionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gzip" | "gz" => Ok(Compression::Gzip),
            "bzip2" | "bz2" => Ok(Compression::Bzip2),
            "xz" => Ok(Compression::Xz),
            "lz4" => Ok(Compression::Lz4),
            other => Err(CompressionParseError {
                input: other.to_string(),
            }),
        }
    }
}
