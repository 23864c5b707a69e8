//! Point lookup and streaming iteration over a sorted index file.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::record::Record;

/// Reads one record from a buffered reader positioned at a record boundary.
///
/// Returns `Ok(None)` at end of input. `origin` labels I/O errors.
pub(crate) fn read_record<R: BufRead>(
    reader: &mut R,
    origin: &Path,
) -> Result<Option<Record>, IndexError> {
    let mut line = Vec::new();
    let n = reader
        .read_until(b'\n', &mut line)
        .map_err(|source| IndexError::io(origin, source))?;
    if n == 0 {
        return Ok(None);
    }
    if line.last() != Some(&b'\n') {
        return Err(IndexError::format("record is missing its LF terminator"));
    }
    line.pop();
    Record::parse(&line).map(Some)
}

/// Read-only view of a sorted index file.
///
/// Lookups binary-search byte offsets: each probe seeks into the file, scans
/// forward to the next record boundary, and compares that record's path with
/// the key. Memory use is one record per probe regardless of index size.
pub struct SortedIndex {
    path: PathBuf,
    file: File,
    len: u64,
}

impl SortedIndex {
    /// Opens the sorted index at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Io`] when the file cannot be opened or sized.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let file = File::open(path).map_err(|source| IndexError::io(path, source))?;
        let len = file
            .metadata()
            .map_err(|source| IndexError::io(path, source))?
            .len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
        })
    }

    /// Returns the digest recorded for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Io`] on seek/read failures and
    /// [`IndexError::Format`] when the file contains a malformed record,
    /// which indicates the index was not produced by
    /// [`sort_index`](crate::sort_index).
    pub fn lookup(&mut self, key: &Path) -> Result<Option<String>, IndexError> {
        let key = key.as_os_str().as_bytes();
        if self.len == 0 {
            return Ok(None);
        }

        // The first record has no preceding boundary, so probe it directly.
        match self.first_record()? {
            None => return Ok(None),
            Some(record) => match record.path_bytes().cmp(key) {
                Ordering::Equal => return Ok(Some(record.into_hex())),
                Ordering::Greater => return Ok(None),
                Ordering::Less => {}
            },
        }

        let mut lo = 0_u64;
        let mut hi = self.len;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.record_after(mid)? {
                None => hi = mid,
                Some((record, start)) => match record.path_bytes().cmp(key) {
                    Ordering::Equal => return Ok(Some(record.into_hex())),
                    Ordering::Greater => hi = mid,
                    // The matching record, if any, starts beyond this one;
                    // keep its start reachable as the new lower bound.
                    Ordering::Less => lo = start,
                },
            }
        }
        Ok(None)
    }

    /// Returns the path this index was opened from.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.path
    }

    /// Streams every record in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Io`] when rewinding the file fails.
    pub fn iter(&mut self) -> Result<RecordIter<'_>, IndexError> {
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|source| IndexError::io(&self.path, source))?;
        Ok(RecordIter {
            reader: BufReader::new(&mut self.file),
            origin: self.path.clone(),
        })
    }

    fn first_record(&mut self) -> Result<Option<Record>, IndexError> {
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|source| IndexError::io(&self.path, source))?;
        let mut reader = BufReader::new(&mut self.file);
        read_record(&mut reader, &self.path)
    }

    /// Returns the first record starting strictly after byte `offset`,
    /// together with its start offset.
    fn record_after(&mut self, offset: u64) -> Result<Option<(Record, u64)>, IndexError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|source| IndexError::io(&self.path, source))?;
        let mut reader = BufReader::new(&mut self.file);

        let mut skipped = Vec::new();
        let n = reader
            .read_until(b'\n', &mut skipped)
            .map_err(|source| IndexError::io(&self.path, source))?;
        if n == 0 || skipped.last() != Some(&b'\n') {
            return Ok(None);
        }
        let start = offset + n as u64;

        match read_record(&mut reader, &self.path)? {
            Some(record) => Ok(Some((record, start))),
            None => Ok(None),
        }
    }
}

/// Streaming iterator over a sorted index.
pub struct RecordIter<'a> {
    reader: BufReader<&'a mut File>,
    origin: PathBuf,
}

impl Iterator for RecordIter<'_> {
    type Item = Result<Record, IndexError>;

    fn next(&mut self) -> Option<Self::Item> {
        read_record(&mut self.reader, &self.origin).transpose()
    }
}
