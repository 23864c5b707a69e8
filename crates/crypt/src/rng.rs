//! CSPRNG access with a `/dev/urandom` fallback.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use crate::error::CryptError;

/// Fills `buf` with cryptographically secure random bytes.
///
/// The OpenSSL CSPRNG is the primary source. When it reports failure the
/// bytes are read from `/dev/urandom` instead; if that also fails the
/// operation aborts with [`CryptError::Primitive`]. There is no silent
/// downgrade to a non-cryptographic generator.
pub fn fill_random(buf: &mut [u8]) -> Result<(), CryptError> {
    if openssl::rand::rand_bytes(buf).is_ok() {
        return Ok(());
    }

    tracing::warn!("OpenSSL CSPRNG failed, falling back to /dev/urandom");
    let mut urandom = File::open("/dev/urandom").map_err(|error| {
        CryptError::primitive(format!(
            "CSPRNG failed and /dev/urandom is unavailable: {error}"
        ))
    })?;
    urandom.read_exact(buf).map_err(|error| {
        CryptError::primitive(format!(
            "CSPRNG failed and /dev/urandom could not be read: {error}"
        ))
    })
}

/// Returns one random byte, for randomizing scrub lengths.
pub fn random_byte() -> Result<u8, CryptError> {
    let mut byte = [0_u8; 1];
    fill_random(&mut byte)?;
    Ok(byte[0])
}

/// Overwrites the file's bytes with random data, flushes, then unlinks it.
///
/// Used for decrypted temp copies of prior archives so plaintext does not
/// survive on disk. A shred that fails midway still attempts the unlink.
pub fn shred_file(path: &Path) -> Result<(), CryptError> {
    let result = overwrite_contents(path);
    let removed = std::fs::remove_file(path).map_err(|source| CryptError::io(path, source));
    result.and(removed)
}

fn overwrite_contents(path: &Path) -> Result<(), CryptError> {
    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|source| CryptError::io(path, source))?;
    let len = file
        .metadata()
        .map_err(|source| CryptError::io(path, source))?
        .len();

    let mut remaining = len;
    let mut buffer = [0_u8; 64 * 1024];
    while remaining > 0 {
        let chunk = remaining.min(buffer.len() as u64) as usize;
        fill_random(&mut buffer[..chunk])?;
        file.write_all(&buffer[..chunk])
            .map_err(|source| CryptError::io(path, source))?;
        remaining -= chunk as u64;
    }
    file.flush().map_err(|source| CryptError::io(path, source))?;
    file.sync_all().map_err(|source| CryptError::io(path, source))
}
