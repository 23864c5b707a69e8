#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `ezbak_walk` provides the filesystem traversal used when building a backup
//! set. The walker enumerates regular files and symbolic links beneath one
//! root directory in depth-first order, descending into each directory before
//! moving to the next sibling. Directories that match the configured
//! exclusion set are skipped together with their entire subtree, and a
//! directory named `lost+found` is never descended regardless of the
//! exclusion set.
//!
//! # Design
//!
//! - [`WalkBuilder`] configures the traversal: the root path, the
//!   [`ExclusionSet`], and an error hook.
//! - [`Walker`] implements [`Iterator`] and yields [`WalkEntry`] values. The
//!   walker sorts directory entries lexicographically before yielding them so
//!   the sequence is stable across platforms; the digest index sort reimposes
//!   global order across roots regardless.
//! - Traversal is error tolerant. A directory that cannot be opened, or an
//!   entry whose metadata cannot be queried, is reported to the error hook
//!   with the originating [`io::Error`](std::io::Error) and the walk resumes
//!   with the next sibling. Only a root that cannot be inspected at all fails
//!   [`WalkBuilder::build`].
//!
//! # Invariants
//!
//! - Yielded paths are absolute and lie beneath the configured root.
//! - Symbolic links are yielded as their own entries and never descended, so
//!   traversal cannot cycle.
//! - No yielded path has a directory component that byte-equals an exclusion
//!   entry, and no `lost+found` directory is ever descended.
//! - The iterator never panics; every recoverable failure is routed to the
//!   error hook.
//!
//! # Examples
//!
//! Collect every file beneath a temporary tree while excluding one
//! subdirectory:
//!
//! ```
//! use ezbak_walk::{ExclusionSet, WalkBuilder};
//! use std::fs;
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let temp = tempfile::tempdir()?;
//! let root = temp.path().join("root");
//! fs::create_dir_all(root.join("keep"))?;
//! fs::create_dir_all(root.join("skip"))?;
//! fs::write(root.join("keep/a.txt"), b"data")?;
//! fs::write(root.join("skip/b.txt"), b"data")?;
//!
//! let exclusions = ExclusionSet::new(vec![root.join("skip")]);
//! let walker = WalkBuilder::new(&root).exclusions(exclusions).build()?;
//! let files: Vec<_> = walker.map(|e| e.into_path()).collect();
//! assert_eq!(files, vec![root.join("keep/a.txt")]);
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

mod entry;
mod error;
mod exclusion;
mod walker;

pub use entry::WalkEntry;
pub use error::{WalkError, WalkErrorKind};
pub use exclusion::ExclusionSet;
pub use walker::{ErrorHook, WalkBuilder, Walker};
