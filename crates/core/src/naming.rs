//! Archive-name conventions.
//!
//! Archives are named `backup-<unix-time>.tar[.<comp-ext>][.<cipher>]`, so
//! the name alone says how to open one. Both the incremental baseline and
//! the restore path rely on that instead of trusting the current options,
//! which may have changed since the archive was written.

use std::path::Path;

use ezbak_archive::Compression;
use ezbak_crypt::CipherSpec;

/// Infers cipher and compression from an archive name such as
/// `backup-1712345678.tar.bz2.aes-256-cbc`.
///
/// Unknown trailing extensions read as "plaintext, uncompressed", which is
/// exactly what a bare `.tar` is.
#[must_use]
pub fn infer_archive_format(archive: &Path) -> (Option<CipherSpec>, Compression) {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut rest = name.as_str();

    let mut cipher = None;
    if let Some((prefix, extension)) = rest.rsplit_once('.') {
        if let Ok(spec) = extension.parse::<CipherSpec>() {
            cipher = Some(spec);
            rest = prefix;
        }
    }

    let compression = match rest.rsplit_once('.').map(|(_, extension)| extension) {
        Some("gz") => Compression::Gzip,
        Some("bz2") => Compression::Bzip2,
        Some("xz") => Compression::Xz,
        Some("lz4") => Compression::Lz4,
        _ => Compression::None,
    };
    (cipher, compression)
}
