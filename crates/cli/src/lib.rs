#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Command-line frontend for the `ezbak` binary.
//!
//! This crate exposes [`run`] as the single entry point so the thin binary
//! shares the parsing, dispatch, and exit-code mapping with tests. Parsing
//! is operation-first (`backup | restore | configure`); persisted
//! configuration provides the defaults and command-line flags override them
//! for the current run.

mod args;
mod observer;
mod runner;

pub use runner::{exit_code_from, run};
