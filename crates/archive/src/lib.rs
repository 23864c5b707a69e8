#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # Overview
//!
//! `ezbak_archive` is the policy layer between the backup pipeline and the
//! tar container. It owns the logical-path conventions of the archive format
//! (`/files/<absolute-source-path>` for payloads, `/checksums` for the digest
//! index, `/removed` for the removed-list), the compression filter chain, and
//! the header fields recorded for every member.
//!
//! # Design
//!
//! - [`Compression`] names the supported filters (`none | gzip | bzip2 | xz |
//!   lz4`) with an optional integer level; `None` for the level always means
//!   "library default".
//! - [`ArchiveWriter`] wraps [`tar::Builder`] over a finishing compression
//!   sink. Members are streamed in 64 KiB chunks, so memory use is
//!   independent of payload size. [`ArchiveWriter::close`] must run on every
//!   exit path; dropping the writer without closing leaves a truncated
//!   archive, which the orchestrator treats as fatal.
//! - [`extract_one`] scans member headers and copies the first match to a
//!   destination path, which is how the previous run's `/checksums` index is
//!   recovered. [`extract_files`] unpacks every `/files/*` payload for the
//!   restore path.
//!
//! # Errors
//!
//! All operations surface [`ArchiveError`]: `Io` for filesystem and stream
//! failures, `Format` for containers that do not parse, and `MemberNotFound`
//! when a requested logical path is absent.

mod compression;
mod error;
mod id_lookup;
mod reader;
mod writer;

pub use compression::{Compression, CompressionParseError};
pub use error::ArchiveError;
pub use reader::{extract_files, extract_one};
pub use writer::{ArchiveWriter, COPY_BUFFER_LEN};
