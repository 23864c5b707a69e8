//! The `path NUL hex LF` record format.

use std::io::Write;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use crate::error::IndexError;

/// One `(path, digest)` pair as stored in an index file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    path: PathBuf,
    hex: String,
}

impl Record {
    /// Creates a record, rejecting paths the on-disk format cannot carry.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Format`] when the path contains a `NUL` or `LF`
    /// byte, which would corrupt the record framing.
    pub fn new(path: &Path, hex: &str) -> Result<Self, IndexError> {
        let bytes = path.as_os_str().as_bytes();
        if bytes.is_empty() {
            return Err(IndexError::format("empty path"));
        }
        if bytes.iter().any(|&b| b == b'\0' || b == b'\n') {
            return Err(IndexError::format(format!(
                "path '{}' contains a NUL or LF byte",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            hex: hex.to_string(),
        })
    }

    /// Returns the recorded path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path as raw bytes, the unit of index ordering.
    #[must_use]
    pub fn path_bytes(&self) -> &[u8] {
        self.path.as_os_str().as_bytes()
    }

    /// Returns the hexadecimal digest string.
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Consumes the record, returning the digest string.
    #[must_use]
    pub fn into_hex(self) -> String {
        self.hex
    }

    /// Serialized length in bytes, used for run budgeting.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.path_bytes().len() + 1 + self.hex.len() + 1
    }

    /// Writes the record in its on-disk form.
    pub(crate) fn write_to<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        out.write_all(self.path_bytes())?;
        out.write_all(b"\0")?;
        out.write_all(self.hex.as_bytes())?;
        out.write_all(b"\n")
    }

    /// Parses one record from a line with the trailing `LF` already removed.
    pub(crate) fn parse(line: &[u8]) -> Result<Self, IndexError> {
        let sep = line
            .iter()
            .position(|&b| b == b'\0')
            .ok_or_else(|| IndexError::format("record is missing the NUL separator"))?;
        let (path, rest) = line.split_at(sep);
        if path.is_empty() {
            return Err(IndexError::format("record has an empty path"));
        }
        let hex = std::str::from_utf8(&rest[1..])
            .map_err(|_| IndexError::format("digest is not valid UTF-8"))?;
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IndexError::format(format!("invalid digest '{hex}'")));
        }
        Ok(Self {
            path: PathBuf::from(std::ffi::OsString::from_vec(path.to_vec())),
            hex: hex.to_string(),
        })
    }
}
