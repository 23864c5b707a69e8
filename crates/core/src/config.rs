//! The persisted configuration file.
//!
//! Binary-safe `KEY=value` entries, each value terminated by a `NUL` byte so
//! arbitrary path bytes survive a round trip. Multi-valued keys
//! (`DIRECTORIES`, `EXCLUDE`) hold a sequence of `NUL`-terminated strings
//! closed by an empty string. A newline before each key keeps the file
//! greppable without affecting parsing. Unknown keys are skipped so older
//! binaries can read configs written by newer ones.

use std::fs;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use ezbak_archive::Compression;
use ezbak_checksums::HashAlgorithm;
use ezbak_crypt::CipherSpec;

use crate::error::Error;
use crate::options::Options;
use crate::paths;

const NONE_SENTINEL: &[u8] = b"none";

/// Returns the configuration file location, `$HOME/.ezbak`.
///
/// # Errors
///
/// [`Error::Config`] when the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf, Error> {
    Ok(paths::home_directory()?.join(".ezbak"))
}

/// Loads options from `path`.
///
/// Returns `Ok(None)` when no configuration exists yet.
///
/// # Errors
///
/// [`Error::Io`] when the file exists but cannot be read and
/// [`Error::Config`] when an entry is malformed.
pub fn load_config(path: &Path) -> Result<Option<Options>, Error> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(Error::io(path, source)),
    };
    parse(&bytes).map(Some)
}

/// Persists `options` to `path` with mode `0600`; the file may carry a
/// stored password.
///
/// # Errors
///
/// [`Error::Io`] when the file cannot be written.
pub fn store_config(path: &Path, options: &Options) -> Result<(), Error> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let bytes = serialize(options);
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|source| Error::io(path, source))?;
    file.write_all(&bytes)
        .map_err(|source| Error::io(path, source))
}

fn serialize(options: &Options) -> Vec<u8> {
    let mut out = Vec::new();

    push_single(
        &mut out,
        b"PREV",
        options
            .prev_backup
            .as_ref()
            .map_or(NONE_SENTINEL, |p| p.as_os_str().as_bytes()),
    );
    push_multi(&mut out, b"DIRECTORIES", &options.directories);
    push_multi(&mut out, b"EXCLUDE", &options.exclusions);
    push_single(&mut out, b"HASH_ALGORITHM", options.hash_algorithm.name().as_bytes());
    push_single(
        &mut out,
        b"ENC_ALGORITHM",
        options
            .cipher
            .map_or(NONE_SENTINEL, |c| c.name().as_bytes()),
    );
    if let Some(password) = &options.password {
        push_single(&mut out, b"ENC_PASSWORD", hex_encode(password.as_bytes()).as_bytes());
    }
    push_single(&mut out, b"C_TYPE", options.compression.name().as_bytes());
    push_single(
        &mut out,
        b"C_LEVEL",
        options
            .compression_level
            .map_or_else(|| "0".to_string(), |l| l.to_string())
            .as_bytes(),
    );
    push_single(
        &mut out,
        b"OUTPUT_DIRECTORY",
        options
            .output_directory
            .as_ref()
            .map_or(NONE_SENTINEL, |p| p.as_os_str().as_bytes()),
    );
    let flags: u32 = u32::from(options.verbose);
    push_single(&mut out, b"FLAGS", flags.to_string().as_bytes());

    out
}

fn push_single(out: &mut Vec<u8>, key: &[u8], value: &[u8]) {
    out.push(b'\n');
    out.extend_from_slice(key);
    out.push(b'=');
    out.extend_from_slice(value);
    out.push(b'\0');
}

fn push_multi(out: &mut Vec<u8>, key: &[u8], values: &[PathBuf]) {
    out.push(b'\n');
    out.extend_from_slice(key);
    out.push(b'=');
    for value in values {
        out.extend_from_slice(value.as_os_str().as_bytes());
        out.push(b'\0');
    }
    out.push(b'\0');
}

fn parse(bytes: &[u8]) -> Result<Options, Error> {
    let mut options = Options::default();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] == b'\n' {
            pos += 1;
            continue;
        }
        let eq = find(bytes, pos, b'=')
            .ok_or_else(|| Error::config("config entry is missing '='"))?;
        let key = &bytes[pos..eq];
        pos = eq + 1;

        match key {
            b"DIRECTORIES" => options.directories = read_multi(bytes, &mut pos)?,
            b"EXCLUDE" => options.exclusions = read_multi(bytes, &mut pos)?,
            _ => {
                let value = read_single(bytes, &mut pos)?;
                apply_single(&mut options, key, value)?;
            }
        }
    }

    options.prev_hash_algorithm = Some(options.hash_algorithm);
    Ok(options)
}

fn apply_single(options: &mut Options, key: &[u8], value: &[u8]) -> Result<(), Error> {
    match key {
        b"PREV" => {
            options.prev_backup = optional_path(value);
        }
        b"HASH_ALGORITHM" => {
            options.hash_algorithm = parse_utf8::<HashAlgorithm>(value, "HASH_ALGORITHM")?;
        }
        b"ENC_ALGORITHM" => {
            options.cipher = if value == NONE_SENTINEL {
                None
            } else {
                Some(parse_utf8::<CipherSpec>(value, "ENC_ALGORITHM")?)
            };
        }
        b"ENC_PASSWORD" => {
            let raw = hex_decode(value)
                .ok_or_else(|| Error::config("ENC_PASSWORD is not valid hex"))?;
            options.password = Some(
                String::from_utf8(raw)
                    .map_err(|_| Error::config("ENC_PASSWORD is not valid UTF-8"))?,
            );
        }
        b"C_TYPE" => {
            options.compression = parse_utf8::<Compression>(value, "C_TYPE")?;
        }
        b"C_LEVEL" => {
            let level: u32 = std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| Error::config("C_LEVEL is not a number"))?;
            options.compression_level = (level != 0).then_some(level);
        }
        b"OUTPUT_DIRECTORY" => {
            options.output_directory = optional_path(value);
        }
        b"FLAGS" => {
            let flags: u32 = std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| Error::config("FLAGS is not a number"))?;
            options.verbose = flags & 1 != 0;
        }
        // Unknown keys are tolerated for forward compatibility.
        _ => {}
    }
    Ok(())
}

fn optional_path(value: &[u8]) -> Option<PathBuf> {
    if value == NONE_SENTINEL || value.is_empty() {
        None
    } else {
        Some(PathBuf::from(std::ffi::OsString::from_vec(value.to_vec())))
    }
}

fn parse_utf8<T: std::str::FromStr>(value: &[u8], key: &str) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    let text = std::str::from_utf8(value)
        .map_err(|_| Error::config(format!("{key} is not valid UTF-8")))?;
    text.parse::<T>()
        .map_err(|error| Error::config(format!("{key}: {error}")))
}

fn read_single<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<&'a [u8], Error> {
    let nul = find(bytes, *pos, b'\0')
        .ok_or_else(|| Error::config("config value is missing its NUL terminator"))?;
    let value = &bytes[*pos..nul];
    *pos = nul + 1;
    Ok(value)
}

fn read_multi(bytes: &[u8], pos: &mut usize) -> Result<Vec<PathBuf>, Error> {
    let mut values = Vec::new();
    loop {
        let value = read_single(bytes, pos)?;
        if value.is_empty() {
            return Ok(values);
        }
        values.push(PathBuf::from(std::ffi::OsString::from_vec(value.to_vec())));
    }
}

fn find(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|i| from + i)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from_digit(u32::from(byte >> 4), 16).unwrap_or('0'));
        out.push(char::from_digit(u32::from(byte & 0x0f), 16).unwrap_or('0'));
    }
    out
}

fn hex_decode(hex: &[u8]) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    let nibble = |b: u8| char::from(b).to_digit(16).map(|d| d as u8);
    hex.chunks_exact(2)
        .map(|pair| Some(nibble(pair[0])? << 4 | nibble(pair[1])?))
        .collect()
}
