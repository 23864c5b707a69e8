#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `ezbak_index` implements the on-disk digest index that links one backup
//! run to the next. During a run every visited file appends a
//! `path NUL hex LF` record to an unsorted log; after the walk the log is
//! externally merge-sorted so later runs can binary-search it straight off
//! disk, without ever materialising the index in memory.
//!
//! # Design
//!
//! - [`AppendLog`] writes the unsorted record log and rejects paths the
//!   record format cannot carry (embedded `NUL` or `LF` bytes).
//! - [`sort_index`] performs the external sort: bounded in-memory runs
//!   (16 MiB by default) sorted with a median-of-three quicksort, then a
//!   k-way merge over the run files driven by a min-heap that holds one head
//!   record per run. Run files are anonymous temp files, so they are
//!   released on every exit path.
//! - [`SortedIndex`] serves point lookups by binary-searching byte offsets:
//!   each probe seeks into the file, scans forward to the next record
//!   boundary, and compares the record's path against the key. Iteration
//!   streams records in sorted order.
//! - [`classify`] turns a fresh digest plus the prior index into the
//!   new/changed/unchanged decision, and [`write_removed_list`] derives the
//!   paths that disappeared since the prior run with a linear merge walk.
//!
//! # Invariants
//!
//! - After sorting, record paths are strictly increasing in lexicographic
//!   byte order; a path never appears twice within one index.
//! - Sorting is stable against arbitrary input sizes: memory is bounded by
//!   the run budget plus one record per run during the merge.
//!
//! # Errors
//!
//! All operations surface [`IndexError`]: `Io` for filesystem failures,
//! `Format` for malformed records or unrepresentable paths.

mod append;
mod change;
mod error;
mod record;
mod removed;
mod search;
mod sort;

pub use append::AppendLog;
pub use change::{classify, FileStatus};
pub use error::IndexError;
pub use record::Record;
pub use removed::write_removed_list;
pub use search::{RecordIter, SortedIndex};
pub use sort::{sort_index, SortOptions, DEFAULT_MAX_RUN_BYTES};
