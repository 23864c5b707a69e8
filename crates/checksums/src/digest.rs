//! Streaming digest helpers.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use openssl::hash::Hasher;

use crate::algorithm::HashAlgorithm;
use crate::error::DigestError;

/// Read-buffer size used when digesting a stream.
pub const DIGEST_BUFFER_LEN: usize = 64 * 1024;

/// Digests the contents of `path`, returning the lowercase hex string.
///
/// # Errors
///
/// Returns [`DigestError::Io`] when the file cannot be opened or read and
/// [`DigestError::Crypto`] when the hashing primitive fails.
pub fn hex_digest_file(
    algorithm: HashAlgorithm,
    path: &Path,
) -> Result<String, DigestError> {
    let file = File::open(path).map_err(|source| DigestError::io(path, source))?;
    hex_digest_reader(algorithm, file, path)
}

/// Digests everything `reader` yields, returning the lowercase hex string.
///
/// `origin` only labels I/O errors; no filesystem access happens through it.
pub fn hex_digest_reader<R: Read>(
    algorithm: HashAlgorithm,
    mut reader: R,
    origin: &Path,
) -> Result<String, DigestError> {
    let mut hasher = Hasher::new(algorithm.message_digest())?;
    let mut buffer = [0_u8; DIGEST_BUFFER_LEN];

    loop {
        let len = reader
            .read(&mut buffer)
            .map_err(|source| DigestError::io(origin, source))?;
        if len == 0 {
            break;
        }
        hasher.update(&buffer[..len])?;
    }

    let digest = hasher.finish()?;
    Ok(to_lower_hex(&digest))
}

/// Digests an in-memory byte slice.
pub fn hex_digest_bytes(
    algorithm: HashAlgorithm,
    data: &[u8],
) -> Result<String, DigestError> {
    let mut hasher = Hasher::new(algorithm.message_digest())?;
    hasher.update(data)?;
    let digest = hasher.finish()?;
    Ok(to_lower_hex(&digest))
}

fn to_lower_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from_digit(u32::from(byte >> 4), 16).unwrap_or('0'));
        out.push(char::from_digit(u32::from(byte & 0x0f), 16).unwrap_or('0'));
    }
    out
}
