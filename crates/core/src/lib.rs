#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # Overview
//!
//! `ezbak_core` is the orchestration layer of the backup tool. It owns the
//! [`Options`] record and its persisted configuration file, the central
//! [`Error`] taxonomy with its exit-code mapping, signal-driven
//! cancellation, and the two top-level operations: [`run_backup`] and
//! [`run_restore`].
//!
//! # Design
//!
//! A backup run is one sequential pass: recover the prior digest index from
//! the previous archive (decrypting it first when a cipher is configured),
//! walk every configured root while digesting and classifying files, stream
//! new and changed payloads into a temp archive, sort the fresh index, derive
//! the removed-list, close the container, and finally encrypt or rename the
//! temp archive into place. Temp files are RAII-owned
//! [`tempfile::NamedTempFile`] handles created under `/var/tmp`, so every
//! exit path, including `SIGINT` cancellation, unlinks them.
//!
//! Prologue failures (loading options, recovering the prior index, creating
//! the temp archive) abort the run. Per-file failures during the walk are
//! logged and skipped; the run continues and still produces a valid partial
//! archive. Failures while closing the container or encrypting the result
//! are fatal again, and the in-progress output is removed.
//!
//! # Errors
//!
//! [`Error`] wraps each subsystem's error type and maps it to a process
//! [`ExitCode`]; the binary prints one diagnostic line and exits non-zero on
//! any fatal error.

mod backup;
mod config;
mod error;
mod exit_code;
mod naming;
mod options;
mod paths;
mod restore;
mod signal;

pub use backup::{run_backup, BackupSummary, NullObserver, RunObserver};
pub use config::{config_path, load_config, store_config};
pub use error::Error;
pub use exit_code::ExitCode;
pub use naming::infer_archive_format;
pub use options::{Operation, Options};
pub use paths::{backup_directory, home_directory};
pub use restore::{run_restore, RestoreRequest};
pub use signal::{install_signal_handler, interrupted};
