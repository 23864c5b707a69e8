use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::entry::WalkEntry;
use crate::error::WalkError;
use crate::exclusion::{self, ExclusionSet};

/// Callback invoked for every recoverable traversal failure.
///
/// Receives the offending path and the OS error. The walk continues with the
/// next sibling after the hook returns.
pub type ErrorHook = Box<dyn FnMut(&Path, &io::Error)>;

/// Configures a traversal rooted at a single directory or file.
pub struct WalkBuilder {
    root: PathBuf,
    exclusions: ExclusionSet,
    hook: Option<ErrorHook>,
}

impl WalkBuilder {
    /// Creates a builder that will traverse the provided root path.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            exclusions: ExclusionSet::default(),
            hook: None,
        }
    }

    /// Sets the exclusion set consulted before descending into a directory.
    #[must_use]
    pub fn exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Installs the error hook for recoverable failures.
    ///
    /// Without a hook, failures are logged at `warn` level and otherwise
    /// swallowed.
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&Path, &io::Error) + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Builds a [`Walker`] over the configured root.
    ///
    /// # Errors
    ///
    /// Fails only when the root itself cannot be inspected; every later
    /// failure is routed to the error hook instead.
    pub fn build(self) -> Result<Walker, WalkError> {
        let root = absolutize(self.root)?;
        let metadata = fs::symlink_metadata(&root)
            .map_err(|error| WalkError::root_metadata(root.clone(), error))?;

        let mut walker = Walker {
            exclusions: self.exclusions,
            hook: self.hook,
            stack: Vec::new(),
            root_entry: None,
        };

        if metadata.file_type().is_dir() {
            if !exclusion::prunes(&walker.exclusions, &root) {
                walker.push_directory(root, 0);
            }
        } else {
            walker.root_entry = Some(WalkEntry {
                path: root,
                metadata,
                depth: 0,
            });
        }

        Ok(walker)
    }
}

/// Depth-first iterator over the files and symlinks beneath one root.
pub struct Walker {
    exclusions: ExclusionSet,
    hook: Option<ErrorHook>,
    stack: Vec<DirectoryState>,
    root_entry: Option<WalkEntry>,
}

impl Walker {
    fn report(&mut self, path: &Path, error: &io::Error) {
        match self.hook.as_mut() {
            Some(hook) => hook(path, error),
            None => tracing::warn!(path = %path.display(), %error, "skipping unreadable entry"),
        }
    }

    fn push_directory(&mut self, path: PathBuf, depth: usize) {
        match DirectoryState::new(path, depth) {
            Ok(state) => self.stack.push(state),
            Err((path, error)) => self.report(&path, &error),
        }
    }
}

impl Iterator for Walker {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(entry) = self.root_entry.take() {
            return Some(entry);
        }

        loop {
            let (path, depth) = {
                let state = self.stack.last_mut()?;
                match state.next_name() {
                    Some(name) => (state.path.join(name), state.depth + 1),
                    None => {
                        self.stack.pop();
                        continue;
                    }
                }
            };

            let metadata = match fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(error) => {
                    self.report(&path, &error);
                    continue;
                }
            };

            if metadata.file_type().is_dir() {
                if !exclusion::prunes(&self.exclusions, &path) {
                    self.push_directory(path, depth);
                }
                continue;
            }

            return Some(WalkEntry {
                path,
                metadata,
                depth,
            });
        }
    }
}

struct DirectoryState {
    path: PathBuf,
    entries: Vec<OsString>,
    index: usize,
    depth: usize,
}

impl DirectoryState {
    fn new(path: PathBuf, depth: usize) -> Result<Self, (PathBuf, io::Error)> {
        let read_dir = match fs::read_dir(&path) {
            Ok(read_dir) => read_dir,
            Err(error) => return Err((path, error)),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            match entry {
                Ok(entry) => entries.push(entry.file_name()),
                Err(error) => return Err((path, error)),
            }
        }
        entries.sort();

        Ok(Self {
            path,
            entries,
            index: 0,
            depth,
        })
    }

    fn next_name(&mut self) -> Option<OsString> {
        let name = self.entries.get(self.index)?.clone();
        self.index += 1;
        Some(name)
    }
}

fn absolutize(path: PathBuf) -> Result<PathBuf, WalkError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        let cwd = std::env::current_dir()
            .map_err(|error| WalkError::root_metadata(PathBuf::from("."), error))?;
        Ok(cwd.join(path))
    }
}
