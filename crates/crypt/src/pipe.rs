//! Streaming encrypt/decrypt with `Salted__` framing.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use openssl::symm::{Crypter, Mode};

use crate::error::CryptError;
use crate::keys::KeyMaterial;

/// Magic prefix of every encrypted artifact, shared with `openssl enc`.
pub const SALT_MAGIC: &[u8; 8] = b"Salted__";

/// Salt length in bytes. Fixed at 8 for header compatibility.
pub const SALT_LEN: usize = 8;

const CHUNK_LEN: usize = 64 * 1024;

/// Reads the 16-byte header of `input` and installs its salt into `keys`.
///
/// # Errors
///
/// [`CryptError::Format`] when the magic bytes are wrong or the header is
/// truncated; [`CryptError::State`] when `keys` has no cipher yet.
pub fn extract_salt(input: &Path, keys: &mut KeyMaterial) -> Result<(), CryptError> {
    let mut file = File::open(input).map_err(|source| CryptError::io(input, source))?;

    let mut magic = [0_u8; SALT_MAGIC.len()];
    file.read_exact(&mut magic)
        .map_err(|_| CryptError::format(input, "missing salt header"))?;
    if &magic != SALT_MAGIC {
        return Err(CryptError::format(input, "bad magic bytes"));
    }

    let mut salt = [0_u8; SALT_LEN];
    file.read_exact(&mut salt)
        .map_err(|_| CryptError::format(input, "truncated salt"))?;

    keys.set_salt(salt)
}

/// Encrypts `input` to `output` under `keys`, prefixing the salt header.
///
/// `progress` receives the plaintext byte count after each chunk. On any
/// failure the partial output is removed before the error is returned.
///
/// # Errors
///
/// [`CryptError::State`] when `keys` is not ready, [`CryptError::Io`] for
/// stream failures, [`CryptError::Primitive`] when the cipher fails.
pub fn encrypt_file(
    input: &Path,
    output: &Path,
    keys: &KeyMaterial,
    progress: Option<&mut dyn FnMut(u64)>,
) -> Result<(), CryptError> {
    let result = encrypt_inner(input, output, keys, progress);
    if result.is_err() {
        let _ = fs::remove_file(output);
    }
    result
}

fn encrypt_inner(
    input: &Path,
    output: &Path,
    keys: &KeyMaterial,
    mut progress: Option<&mut dyn FnMut(u64)>,
) -> Result<(), CryptError> {
    if !keys.is_ready() {
        return Err(CryptError::state("encrypt requires derived keys"));
    }
    let cipher = keys.cipher()?;

    let in_file = File::open(input).map_err(|source| CryptError::io(input, source))?;
    let mut reader = BufReader::new(in_file);
    let out_file = File::create(output).map_err(|source| CryptError::io(output, source))?;
    let mut writer = BufWriter::new(out_file);

    let salt = keys.salt()?;
    writer
        .write_all(SALT_MAGIC)
        .map_err(|source| CryptError::io(output, source))?;
    writer
        .write_all(salt)
        .map_err(|source| CryptError::io(output, source))?;

    let iv = keys.iv()?;
    let mut crypter = Crypter::new(
        cipher.cipher(),
        Mode::Encrypt,
        keys.key()?,
        (!iv.is_empty()).then_some(iv),
    )?;

    let mut in_buf = vec![0_u8; CHUNK_LEN];
    let mut out_buf = vec![0_u8; CHUNK_LEN + cipher.block_size()];
    loop {
        let read = reader
            .read(&mut in_buf)
            .map_err(|source| CryptError::io(input, source))?;
        if read == 0 {
            break;
        }
        let written = crypter.update(&in_buf[..read], &mut out_buf)?;
        writer
            .write_all(&out_buf[..written])
            .map_err(|source| CryptError::io(output, source))?;
        if let Some(progress) = progress.as_deref_mut() {
            progress(read as u64);
        }
    }

    let written = crypter.finalize(&mut out_buf)?;
    writer
        .write_all(&out_buf[..written])
        .map_err(|source| CryptError::io(output, source))?;
    writer
        .flush()
        .map_err(|source| CryptError::io(output, source))
}

/// Decrypts `input` (which must carry the salt header) to `output`.
///
/// `keys` must be ready and derived from the salt this artifact carries; a
/// mismatch means the caller skipped [`extract_salt`]. On any failure the
/// partial output is removed before the error is returned.
///
/// # Errors
///
/// [`CryptError::Format`] for bad framing, [`CryptError::State`] for key
/// misuse, [`CryptError::Primitive`] when the cipher rejects the data (the
/// usual symptom of a wrong password), [`CryptError::Io`] for stream
/// failures.
pub fn decrypt_file(
    input: &Path,
    output: &Path,
    keys: &KeyMaterial,
    progress: Option<&mut dyn FnMut(u64)>,
) -> Result<(), CryptError> {
    let result = decrypt_inner(input, output, keys, progress);
    if result.is_err() {
        let _ = fs::remove_file(output);
    }
    result
}

fn decrypt_inner(
    input: &Path,
    output: &Path,
    keys: &KeyMaterial,
    mut progress: Option<&mut dyn FnMut(u64)>,
) -> Result<(), CryptError> {
    if !keys.is_ready() {
        return Err(CryptError::state("decrypt requires derived keys"));
    }
    let cipher = keys.cipher()?;

    let in_file = File::open(input).map_err(|source| CryptError::io(input, source))?;
    let mut reader = BufReader::new(in_file);

    let mut magic = [0_u8; SALT_MAGIC.len()];
    reader
        .read_exact(&mut magic)
        .map_err(|_| CryptError::format(input, "missing salt header"))?;
    if &magic != SALT_MAGIC {
        return Err(CryptError::format(input, "bad magic bytes"));
    }
    let mut salt = [0_u8; SALT_LEN];
    reader
        .read_exact(&mut salt)
        .map_err(|_| CryptError::format(input, "truncated salt"))?;
    if &salt != keys.salt()? {
        return Err(CryptError::state(
            "keys were derived for a different salt (call extract_salt first)",
        ));
    }

    let out_file = File::create(output).map_err(|source| CryptError::io(output, source))?;
    let mut writer = BufWriter::new(out_file);

    let iv = keys.iv()?;
    let mut crypter = Crypter::new(
        cipher.cipher(),
        Mode::Decrypt,
        keys.key()?,
        (!iv.is_empty()).then_some(iv),
    )?;

    let mut in_buf = vec![0_u8; CHUNK_LEN];
    let mut out_buf = vec![0_u8; CHUNK_LEN + cipher.block_size()];
    loop {
        let read = reader
            .read(&mut in_buf)
            .map_err(|source| CryptError::io(input, source))?;
        if read == 0 {
            break;
        }
        let written = crypter.update(&in_buf[..read], &mut out_buf)?;
        writer
            .write_all(&out_buf[..written])
            .map_err(|source| CryptError::io(output, source))?;
        if let Some(progress) = progress.as_deref_mut() {
            progress(read as u64);
        }
    }

    let written = crypter.finalize(&mut out_buf)?;
    writer
        .write_all(&out_buf[..written])
        .map_err(|source| CryptError::io(output, source))?;
    writer
        .flush()
        .map_err(|source| CryptError::io(output, source))
}
