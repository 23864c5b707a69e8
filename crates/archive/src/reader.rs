//! Member extraction from finished archives.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use lz4_flex::frame::FrameDecoder;
use tar::Archive;
use xz2::read::XzDecoder;

use crate::compression::Compression;
use crate::error::ArchiveError;

/// Decompressing source feeding the tar reader.
enum Source {
    Plain(BufReader<File>),
    Gzip(GzDecoder<BufReader<File>>),
    Bzip2(BzDecoder<BufReader<File>>),
    Xz(XzDecoder<BufReader<File>>),
    Lz4(Box<FrameDecoder<BufReader<File>>>),
}

impl Source {
    fn open(path: &Path, compression: Compression) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|source| ArchiveError::io(path, source))?;
        let input = BufReader::new(file);
        Ok(match compression {
            Compression::None => Source::Plain(input),
            Compression::Gzip => Source::Gzip(GzDecoder::new(input)),
            Compression::Bzip2 => Source::Bzip2(BzDecoder::new(input)),
            Compression::Xz => Source::Xz(XzDecoder::new(input)),
            Compression::Lz4 => Source::Lz4(Box::new(FrameDecoder::new(input))),
        })
    }
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::Plain(input) => input.read(buf),
            Source::Gzip(decoder) => decoder.read(buf),
            Source::Bzip2(decoder) => decoder.read(buf),
            Source::Xz(decoder) => decoder.read(buf),
            Source::Lz4(decoder) => decoder.read(buf),
        }
    }
}

/// Copies the first member matching `logical_path` to `out_path`.
///
/// Scanning stops at the first hit, so pulling `/checksums` out of a large
/// archive does not read the remaining payloads.
///
/// # Errors
///
/// Returns [`ArchiveError::MemberNotFound`] when no member matches,
/// [`ArchiveError::Format`] when the container does not parse, and
/// [`ArchiveError::Io`] for stream failures.
pub fn extract_one(
    archive_path: &Path,
    compression: Compression,
    logical_path: &Path,
    out_path: &Path,
) -> Result<u64, ArchiveError> {
    let source = Source::open(archive_path, compression)?;
    let mut archive = Archive::new(source);
    let want = logical_path
        .strip_prefix("/")
        .unwrap_or(logical_path)
        .as_os_str()
        .as_bytes();

    let entries = archive
        .entries()
        .map_err(|error| ArchiveError::format(archive_path, error.to_string()))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|error| ArchiveError::format(archive_path, error.to_string()))?;
        let matches = {
            let path = entry
                .path()
                .map_err(|error| ArchiveError::format(archive_path, error.to_string()))?;
            path.as_os_str().as_bytes() == want
        };
        if !matches {
            continue;
        }

        let mut out =
            File::create(out_path).map_err(|source| ArchiveError::io(out_path, source))?;
        let copied = io::copy(&mut entry, &mut out)
            .map_err(|source| ArchiveError::io(out_path, source))?;
        return Ok(copied);
    }

    Err(ArchiveError::MemberNotFound {
        path: archive_path.to_path_buf(),
        logical_path: logical_path.display().to_string(),
    })
}

/// Unpacks every `/files/*` payload into `dest_dir`, preserving mode and
/// mtime, and returns the number of files restored.
///
/// The `/checksums` and `/removed` manifests are skipped; they describe the
/// backup run, not the tree.
///
/// # Errors
///
/// Returns [`ArchiveError::Format`] when the container does not parse and
/// [`ArchiveError::Io`] when a payload cannot be written.
pub fn extract_files(
    archive_path: &Path,
    compression: Compression,
    dest_dir: &Path,
) -> Result<u64, ArchiveError> {
    let source = Source::open(archive_path, compression)?;
    let mut archive = Archive::new(source);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);

    let mut restored = 0_u64;
    let entries = archive
        .entries()
        .map_err(|error| ArchiveError::format(archive_path, error.to_string()))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|error| ArchiveError::format(archive_path, error.to_string()))?;
        let relative: Option<PathBuf> = {
            let path = entry
                .path()
                .map_err(|error| ArchiveError::format(archive_path, error.to_string()))?;
            path.strip_prefix("files").ok().map(Path::to_path_buf)
        };
        let Some(relative) = relative else {
            continue;
        };

        let dest = dest_dir.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| ArchiveError::io(parent, source))?;
        }
        entry
            .unpack(&dest)
            .map_err(|source| ArchiveError::io(&dest, source))?;
        restored += 1;
    }
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ArchiveWriter;

    #[test]
    fn extract_files_restores_the_tree_shape() {
        let temp = tempfile::tempdir().expect("tempdir");
        let src_a = temp.path().join("a.txt");
        let src_b = temp.path().join("b.txt");
        fs::write(&src_a, b"alpha").expect("write a");
        fs::write(&src_b, b"beta").expect("write b");

        let archive_path = temp.path().join("backup.tar.gz");
        let mut writer =
            ArchiveWriter::create(&archive_path, Compression::Gzip, None).expect("create");
        writer
            .add_file(&src_a, Path::new("/files/data/sub/a.txt"))
            .expect("add a");
        writer.add_file(&src_b, Path::new("/files/data/b.txt")).expect("add b");
        // Manifests must not be unpacked by restore.
        writer.add_file(&src_a, Path::new("/checksums")).expect("add index");
        writer.close().expect("close");

        let dest = temp.path().join("restore");
        let restored =
            extract_files(&archive_path, Compression::Gzip, &dest).expect("extract");
        assert_eq!(restored, 2);
        assert_eq!(fs::read(dest.join("data/sub/a.txt")).expect("read"), b"alpha");
        assert_eq!(fs::read(dest.join("data/b.txt")).expect("read"), b"beta");
        assert!(!dest.join("checksums").exists());
    }

    #[test]
    fn extract_one_stops_at_first_match() {
        let temp = tempfile::tempdir().expect("tempdir");
        let src = temp.path().join("index");
        fs::write(&src, b"/a\000\n").expect("write");

        let archive_path = temp.path().join("backup.tar");
        let mut writer =
            ArchiveWriter::create(&archive_path, Compression::None, None).expect("create");
        writer.add_file(&src, Path::new("/checksums")).expect("add");
        writer.close().expect("close");

        let out = temp.path().join("extracted");
        let copied =
            extract_one(&archive_path, Compression::None, Path::new("/checksums"), &out).expect("extract");
        assert_eq!(copied, 6);
        assert_eq!(fs::read(&out).expect("read"), b"/a\000\n");
    }

    #[test]
    fn wrong_compression_reports_format_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let src = temp.path().join("x");
        fs::write(&src, b"payload").expect("write");

        let archive_path = temp.path().join("backup.tar.gz");
        let mut writer =
            ArchiveWriter::create(&archive_path, Compression::Gzip, None).expect("create");
        writer.add_file(&src, Path::new("/files/x")).expect("add");
        writer.close().expect("close");

        let out = temp.path().join("out");
        let err = extract_one(&archive_path, Compression::None, Path::new("/files/x"), &out)
            .expect_err("gzip bytes are not a tar stream");
        assert!(matches!(
            err,
            ArchiveError::Format { .. } | ArchiveError::MemberNotFound { .. }
        ));
    }
}
