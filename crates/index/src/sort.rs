//! External merge sort over the unsorted append log.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::record::Record;
use crate::search::read_record;

/// Default cap on the bytes held in memory per sorted run (16 MiB).
pub const DEFAULT_MAX_RUN_BYTES: usize = 16 * 1024 * 1024;

/// Tuning knobs for [`sort_index`].
#[derive(Clone, Debug)]
pub struct SortOptions {
    /// Maximum serialized size of one in-memory run.
    pub max_run_bytes: usize,
    /// Directory that receives the anonymous run files.
    pub temp_dir: PathBuf,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            max_run_bytes: DEFAULT_MAX_RUN_BYTES,
            temp_dir: PathBuf::from("/var/tmp"),
        }
    }
}

/// Sorts the append log at `input` into a searchable index at `output`.
///
/// Phase one slices the log into runs of at most
/// [`max_run_bytes`](SortOptions::max_run_bytes) serialized bytes, sorts each
/// run in memory by path bytes, and spills it to an anonymous temp file.
/// Phase two merges the runs through a min-heap holding one head record per
/// run. Run files are unlinked by the OS as soon as they are dropped, on
/// every exit path.
///
/// # Errors
///
/// Returns [`IndexError::Io`] on filesystem failures and
/// [`IndexError::Format`] when the log contains a malformed record.
pub fn sort_index(input: &Path, output: &Path, options: &SortOptions) -> Result<(), IndexError> {
    let in_file = File::open(input).map_err(|source| IndexError::io(input, source))?;
    let mut reader = BufReader::new(in_file);

    let mut runs = Vec::new();
    let mut pending: Vec<Record> = Vec::new();
    let mut pending_bytes = 0_usize;

    while let Some(record) = read_record(&mut reader, input)? {
        pending_bytes += record.encoded_len();
        pending.push(record);
        if pending_bytes >= options.max_run_bytes {
            runs.push(spill_run(&mut pending, &options.temp_dir)?);
            pending_bytes = 0;
        }
    }
    if !pending.is_empty() {
        runs.push(spill_run(&mut pending, &options.temp_dir)?);
    }

    let out_file = File::create(output).map_err(|source| IndexError::io(output, source))?;
    let mut writer = BufWriter::new(out_file);
    merge_runs(runs, &mut writer, &options.temp_dir)?;
    writer
        .flush()
        .map_err(|source| IndexError::io(output, source))
}

fn spill_run(records: &mut Vec<Record>, temp_dir: &Path) -> Result<BufReader<File>, IndexError> {
    quicksort(records);

    let mut file =
        tempfile::tempfile_in(temp_dir).map_err(|source| IndexError::io(temp_dir, source))?;
    {
        let mut writer = BufWriter::new(&mut file);
        for record in records.iter() {
            record
                .write_to(&mut writer)
                .map_err(|source| IndexError::io(temp_dir, source))?;
        }
        writer
            .flush()
            .map_err(|source| IndexError::io(temp_dir, source))?;
    }
    file.seek(SeekFrom::Start(0))
        .map_err(|source| IndexError::io(temp_dir, source))?;

    records.clear();
    Ok(BufReader::new(file))
}

struct HeadRecord {
    record: Record,
    run: usize,
}

impl PartialEq for HeadRecord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeadRecord {}

impl PartialOrd for HeadRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeadRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap pops the smallest path first.
        other
            .record
            .path_bytes()
            .cmp(self.record.path_bytes())
            .then_with(|| other.run.cmp(&self.run))
    }
}

fn merge_runs<W: Write>(
    mut runs: Vec<BufReader<File>>,
    writer: &mut W,
    temp_dir: &Path,
) -> Result<(), IndexError> {
    let mut heap = BinaryHeap::with_capacity(runs.len());
    for (run, reader) in runs.iter_mut().enumerate() {
        if let Some(record) = read_record(reader, temp_dir)? {
            heap.push(HeadRecord { record, run });
        }
    }

    // A path appended twice (overlapping roots, a root listed twice) must
    // appear once in the output; the earliest-appended record wins.
    let mut last_path: Option<Vec<u8>> = None;
    while let Some(HeadRecord { record, run }) = heap.pop() {
        if last_path.as_deref() != Some(record.path_bytes()) {
            record
                .write_to(&mut *writer)
                .map_err(|source| IndexError::io(temp_dir, source))?;
            last_path = Some(record.path_bytes().to_vec());
        }
        if let Some(next) = read_record(&mut runs[run], temp_dir)? {
            heap.push(HeadRecord { record: next, run });
        }
    }
    Ok(())
}

/// In-place quicksort by path bytes with a median-of-three pivot.
fn quicksort(records: &mut [Record]) {
    let len = records.len();
    if len <= 1 {
        return;
    }

    let pivot = median_of_three(records);
    records.swap(pivot, len - 1);

    let mut store = 0;
    for i in 0..len - 1 {
        if records[i].path_bytes() < records[len - 1].path_bytes() {
            records.swap(i, store);
            store += 1;
        }
    }
    records.swap(store, len - 1);

    let (left, right) = records.split_at_mut(store);
    quicksort(left);
    quicksort(&mut right[1..]);
}

fn median_of_three(records: &[Record]) -> usize {
    let low = 0;
    let high = records.len() - 1;
    let mid = low + (high - low) / 2;

    let a = records[low].path_bytes();
    let b = records[mid].path_bytes();
    let c = records[high].path_bytes();

    if (a <= b && b <= c) || (c <= b && b <= a) {
        mid
    } else if (b <= a && a <= c) || (c <= a && a <= b) {
        low
    } else {
        high
    }
}
