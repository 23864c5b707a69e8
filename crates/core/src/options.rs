//! The per-run option record.

use std::path::PathBuf;

use ezbak_archive::Compression;
use ezbak_checksums::HashAlgorithm;
use ezbak_crypt::CipherSpec;

/// Top-level operation selected on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    /// Run an incremental backup.
    Backup,
    /// Restore payloads from an archive.
    Restore,
    /// Inspect and persist configuration without running a backup.
    Configure,
}

/// Everything one run needs to know, merged from the persisted
/// configuration file and command-line flags.
///
/// The hash algorithm must match the one the prior archive's index was
/// built with; otherwise every file would classify as changed, so the
/// orchestrator ignores the prior index on a mismatch. `compression_level`
/// of `None` means "library default" (the CLI maps level `0` to `None`
/// before the value gets here).
#[derive(Clone, Debug)]
pub struct Options {
    /// Root directories to back up. Empty means "the home directory".
    pub directories: Vec<PathBuf>,
    /// Directories pruned from the walk, matched byte-exactly.
    pub exclusions: Vec<PathBuf>,
    /// Digest algorithm for the content index.
    pub hash_algorithm: HashAlgorithm,
    /// Cipher for archive encryption; `None` leaves the archive plaintext.
    pub cipher: Option<CipherSpec>,
    /// Compression filter for the tar stream.
    pub compression: Compression,
    /// Compression level; `None` selects the codec default.
    pub compression_level: Option<u32>,
    /// Output directory; `None` resolves to `$HOME/Backups`.
    pub output_directory: Option<PathBuf>,
    /// Most recent archive, used as the incremental baseline.
    pub prev_backup: Option<PathBuf>,
    /// Hash algorithm the prior archive's index was built with.
    pub prev_hash_algorithm: Option<HashAlgorithm>,
    /// Password supplied by flag or config; prompted for when absent.
    pub password: Option<String>,
    /// Per-file progress output.
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            exclusions: Vec::new(),
            hash_algorithm: HashAlgorithm::default(),
            cipher: None,
            compression: Compression::default(),
            compression_level: None,
            output_directory: None,
            prev_backup: None,
            prev_hash_algorithm: None,
            password: None,
            verbose: false,
        }
    }
}

impl Options {
    /// Reports whether the prior archive's index is usable as an
    /// incremental baseline.
    #[must_use]
    pub fn prior_index_usable(&self) -> bool {
        match (&self.prev_backup, self.prev_hash_algorithm) {
            (Some(_), Some(prev_algorithm)) => prev_algorithm == self.hash_algorithm,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prior_index_requires_matching_hash_algorithm() {
        let mut options = Options {
            prev_backup: Some(PathBuf::from("/b/prev.tar")),
            prev_hash_algorithm: Some(HashAlgorithm::Sha256),
            ..Options::default()
        };
        assert!(options.prior_index_usable());

        options.hash_algorithm = HashAlgorithm::Md5;
        assert!(!options.prior_index_usable());

        options.prev_backup = None;
        assert!(!options.prior_index_usable());
    }
}
