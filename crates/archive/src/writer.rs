//! Streaming archive creation.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use lz4_flex::frame::FrameEncoder;
use tar::{Builder, EntryType, Header};
use xz2::write::XzEncoder;

use crate::compression::Compression;
use crate::error::ArchiveError;
use crate::id_lookup;

/// Chunk size used when streaming payloads into the container.
pub const COPY_BUFFER_LEN: usize = 64 * 1024;

/// Compressing sink feeding the output file, finished explicitly so every
/// codec gets to write its trailer.
enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Bzip2(BzEncoder<BufWriter<File>>),
    Xz(XzEncoder<BufWriter<File>>),
    Lz4(Box<FrameEncoder<BufWriter<File>>>),
}

impl Sink {
    fn new(file: File, compression: Compression, level: Option<u32>) -> Self {
        let out = BufWriter::new(file);
        match compression {
            Compression::None => Sink::Plain(out),
            Compression::Gzip => {
                let level = level.map_or_else(flate2::Compression::default, flate2::Compression::new);
                Sink::Gzip(GzEncoder::new(out, level))
            }
            Compression::Bzip2 => {
                let level = level.map_or_else(bzip2::Compression::default, bzip2::Compression::new);
                Sink::Bzip2(BzEncoder::new(out, level))
            }
            Compression::Xz => Sink::Xz(XzEncoder::new(out, level.unwrap_or(6))),
            Compression::Lz4 => Sink::Lz4(Box::new(FrameEncoder::new(out))),
        }
    }

    fn finish(self) -> io::Result<BufWriter<File>> {
        match self {
            Sink::Plain(out) => Ok(out),
            Sink::Gzip(encoder) => encoder.finish(),
            Sink::Bzip2(encoder) => encoder.finish(),
            Sink::Xz(encoder) => encoder.finish(),
            Sink::Lz4(encoder) => encoder
                .finish()
                .map_err(|error| io::Error::new(io::ErrorKind::Other, error)),
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(out) => out.write(buf),
            Sink::Gzip(encoder) => encoder.write(buf),
            Sink::Bzip2(encoder) => encoder.write(buf),
            Sink::Xz(encoder) => encoder.write(buf),
            Sink::Lz4(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(out) => out.flush(),
            Sink::Gzip(encoder) => encoder.flush(),
            Sink::Bzip2(encoder) => encoder.flush(),
            Sink::Xz(encoder) => encoder.flush(),
            Sink::Lz4(encoder) => encoder.flush(),
        }
    }
}

/// Streaming tar writer with the backup format's member conventions.
///
/// Callers pass logical paths with a leading slash (`/files/...`,
/// `/checksums`, `/removed`); members are stored slash-stripped the way GNU
/// tar stores absolute paths, and the reader side normalises again, so the
/// convention is symmetric.
pub struct ArchiveWriter {
    path: PathBuf,
    builder: Builder<Sink>,
}

impl ArchiveWriter {
    /// Creates the archive at `out_path` with the requested filter chain.
    ///
    /// A `level` of `None` selects the codec's default.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] when the output file cannot be created.
    pub fn create(
        out_path: &Path,
        compression: Compression,
        level: Option<u32>,
    ) -> Result<Self, ArchiveError> {
        let file =
            File::create(out_path).map_err(|source| ArchiveError::io(out_path, source))?;
        let mut builder = Builder::new(Sink::new(file, compression, level));
        builder.follow_symlinks(false);
        Ok(Self {
            path: out_path.to_path_buf(),
            builder,
        })
    }

    /// Streams `reader` into the archive at `logical_path`.
    ///
    /// The header is derived from `metadata`: size, mode masked to `0o1777`,
    /// mtime/atime/ctime, uid/gid, and the resolved owner/group names when
    /// the passwd/group databases know them. Exactly `metadata.len()` bytes
    /// are consumed from the reader.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] when reading the payload or writing the
    /// container fails.
    pub fn add_stream<R: Read>(
        &mut self,
        reader: R,
        logical_path: &Path,
        metadata: &fs::Metadata,
    ) -> Result<u64, ArchiveError> {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(metadata.len());
        header.set_mode(metadata.mode() & 0o1777);
        header.set_mtime(metadata.mtime().max(0) as u64);
        header.set_uid(u64::from(metadata.uid()));
        header.set_gid(u64::from(metadata.gid()));
        if let Some(gnu) = header.as_gnu_mut() {
            gnu.set_atime(metadata.atime().max(0) as u64);
            gnu.set_ctime(metadata.ctime().max(0) as u64);
        }
        if let Ok(Some(name)) = id_lookup::lookup_user_name(metadata.uid()) {
            // A name the header cannot carry is dropped; the numeric id stays.
            let _ = header.set_username(&name);
        }
        if let Ok(Some(name)) = id_lookup::lookup_group_name(metadata.gid()) {
            let _ = header.set_groupname(&name);
        }

        let stored = logical_path
            .strip_prefix("/")
            .unwrap_or(logical_path);
        let chunked = BufReader::with_capacity(COPY_BUFFER_LEN, reader.take(metadata.len()));
        self.builder
            .append_data(&mut header, stored, chunked)
            .map_err(|source| ArchiveError::io(&self.path, source))?;
        Ok(metadata.len())
    }

    /// Opens `source` and streams it to `logical_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] when the source cannot be opened or the
    /// stream fails.
    pub fn add_file(&mut self, source: &Path, logical_path: &Path) -> Result<u64, ArchiveError> {
        let file = File::open(source).map_err(|err| ArchiveError::io(source, err))?;
        let metadata = file
            .metadata()
            .map_err(|err| ArchiveError::io(source, err))?;
        self.add_stream(file, logical_path, &metadata)
    }

    /// Returns the path of the archive being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Finalises the container: writes the tar trailer, finishes the
    /// compression codec, and flushes the output file.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`]; the archive must be considered
    /// truncated when this fails.
    pub fn close(self) -> Result<(), ArchiveError> {
        let path = self.path;
        let sink = self
            .builder
            .into_inner()
            .map_err(|source| ArchiveError::io(&path, source))?;
        let mut out = sink
            .finish()
            .map_err(|source| ArchiveError::io(&path, source))?;
        out.flush().map_err(|source| ArchiveError::io(&path, source))
    }
}
