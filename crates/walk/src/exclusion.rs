use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Set of absolute directory paths that are pruned from a traversal.
///
/// Membership is tested by byte-exact comparison against the full directory
/// path, matching how exclusion lists are written in the configuration file.
/// A prefix entry therefore prunes exactly the directory it names (and, by
/// virtue of pruning, everything beneath it).
#[derive(Clone, Debug, Default)]
pub struct ExclusionSet {
    paths: Vec<PathBuf>,
}

impl ExclusionSet {
    /// Creates a set from the given directory paths.
    #[must_use]
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Returns `true` when `dir` byte-equals one of the configured entries.
    #[must_use]
    pub fn contains(&self, dir: &Path) -> bool {
        self.paths.iter().any(|p| p.as_os_str() == dir.as_os_str())
    }

    /// Returns `true` when the set holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Returns the configured entries.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// Reports whether a directory must be pruned from the walk.
///
/// `lost+found` directories are pruned unconditionally; everything else is
/// pruned only on an exact exclusion-set match.
#[must_use]
pub(crate) fn prunes(exclusions: &ExclusionSet, dir: &Path) -> bool {
    if dir.file_name() == Some(OsStr::new("lost+found")) {
        return true;
    }
    exclusions.contains(dir)
}
