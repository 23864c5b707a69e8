//! The incremental backup run.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use ezbak_archive::{extract_one, ArchiveWriter};
use ezbak_checksums::hex_digest_file;
use ezbak_crypt::{
    decrypt_file, encrypt_file, extract_salt, prompt_password, prompt_password_with_verify,
    shred_file, CoreDumpGuard, KeyMaterial, Password,
};
use ezbak_index::{classify, sort_index, AppendLog, FileStatus, SortOptions, SortedIndex};
use ezbak_walk::{ExclusionSet, WalkBuilder};

use crate::config;
use crate::error::Error;
use crate::options::Options;
use crate::paths;
use crate::signal;

const TEMP_DIR: &str = "/var/tmp";

/// Receives progress callbacks during a run.
///
/// All methods default to no-ops, so observers implement only what they
/// render. The CLI uses this to draw byte-count progress bars and per-file
/// lines in verbose mode.
pub trait RunObserver {
    /// A new phase of the run started.
    fn stage(&mut self, _message: &str) {}
    /// A file was classified against the prior index.
    fn file(&mut self, _path: &Path, _status: FileStatus) {}
    /// Payload bytes were processed (ingest, encrypt, or decrypt).
    fn bytes(&mut self, _count: u64) {}
}

/// Observer that renders nothing.
pub struct NullObserver;

impl RunObserver for NullObserver {}

/// Counters describing a finished backup run.
#[derive(Debug)]
pub struct BackupSummary {
    /// Final archive location.
    pub archive_path: PathBuf,
    /// Regular files the walk yielded.
    pub files_seen: u64,
    /// Files streamed into the archive (new or changed).
    pub files_ingested: u64,
    /// Files skipped as unchanged.
    pub files_unchanged: u64,
    /// Paths recorded in the removed-list.
    pub removed: u64,
    /// Recoverable failures that were logged and skipped.
    pub warnings: u64,
}

/// Runs one incremental backup.
///
/// `config_file` names where to persist the updated options after a
/// successful run (`None` skips persistence). On success `options` has
/// `prev_backup` pointing at the new archive.
///
/// # Errors
///
/// Prologue failures (resolving directories, recovering the prior index,
/// creating the temp archive), closing the container, and the final
/// encrypt/rename are fatal. Per-file failures during the walk are logged,
/// counted in [`BackupSummary::warnings`], and skipped.
pub fn run_backup(
    options: &mut Options,
    config_file: Option<&Path>,
    observer: &mut dyn RunObserver,
) -> Result<BackupSummary, Error> {
    let warnings = Arc::new(AtomicU64::new(0));

    if options.directories.is_empty() {
        options.directories = vec![paths::home_directory()?];
    }
    let output_dir = match &options.output_directory {
        Some(dir) => dir.clone(),
        None => paths::backup_directory()?,
    };
    let archive_path = default_archive_name(options, &output_dir);

    // Step 3: recover the prior digest index, decrypting when needed.
    let mut prior = recover_prior_index(options, observer)?;

    // Step 4: fresh archive over a temp file.
    let tar_temp = temp_file("ezbak-tar-")?;
    let mut archive = ArchiveWriter::create(
        tar_temp.path(),
        options.compression,
        options.compression_level,
    )?;

    let append_temp = temp_file("ezbak-hashes-")?;
    let mut append = AppendLog::create(append_temp.path())?;

    // Step 5: walk, digest, classify, ingest.
    observer.stage("adding files");
    info!(archive = %archive_path.display(), "adding files");
    let mut files_seen = 0_u64;
    let mut files_ingested = 0_u64;
    let mut files_unchanged = 0_u64;

    let exclusions = ExclusionSet::new(options.exclusions.clone());
    for root in &options.directories {
        let hook_warnings = Arc::clone(&warnings);
        let walker = WalkBuilder::new(root)
            .exclusions(exclusions.clone())
            .on_error(move |path, error| {
                warn!(path = %path.display(), %error, "skipping unreadable entry");
                hook_warnings.fetch_add(1, Ordering::Relaxed);
            })
            .build();
        let walker = match walker {
            Ok(walker) => walker,
            Err(error) => {
                warn!(root = %root.display(), %error, "skipping unreadable root");
                warnings.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        for entry in walker {
            if signal::interrupted() {
                return Err(Error::Interrupted);
            }
            if !entry.is_file() {
                continue;
            }
            files_seen += 1;

            let hex = match hex_digest_file(options.hash_algorithm, entry.path()) {
                Ok(hex) => hex,
                Err(error) => {
                    warn!(path = %entry.path().display(), %error, "skipping undigestable file");
                    warnings.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            let status = match classify(
                entry.path(),
                &hex,
                prior.as_mut().map(|(_, index)| index),
            ) {
                Ok(status) => status,
                Err(error) => {
                    // An unreadable prior record downgrades the file to a
                    // full re-ingest rather than losing it.
                    warn!(path = %entry.path().display(), %error, "prior index lookup failed");
                    warnings.fetch_add(1, Ordering::Relaxed);
                    FileStatus::New
                }
            };
            observer.file(entry.path(), status);

            if status.needs_ingest() {
                match archive.add_file(entry.path(), &files_member_path(entry.path())) {
                    Ok(bytes) => {
                        files_ingested += 1;
                        observer.bytes(bytes);
                    }
                    Err(error) => {
                        warn!(path = %entry.path().display(), %error, "failed to add file");
                        warnings.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                }
            } else {
                files_unchanged += 1;
                if options.verbose {
                    info!(path = %entry.path().display(), "skipping unchanged");
                }
            }

            if let Err(error) = append.append(entry.path(), &hex) {
                warn!(path = %entry.path().display(), %error, "failed to record digest");
                warnings.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
    append.finish()?;

    // Step 6: sort the fresh index and add it as /checksums.
    observer.stage("adding checksum list");
    let sorted_temp = temp_file("ezbak-sorted-")?;
    let index_member = match sort_index(
        append_temp.path(),
        sorted_temp.path(),
        &SortOptions::default(),
    ) {
        Ok(()) => sorted_temp.path().to_path_buf(),
        Err(error) => {
            // An unsorted index still supports the next run's lookups being
            // rebuilt from scratch; losing sortedness beats losing the run.
            warn!(%error, "failed to sort checksum list, storing unsorted");
            warnings.fetch_add(1, Ordering::Relaxed);
            append_temp.path().to_path_buf()
        }
    };
    if let Err(error) = archive.add_file(&index_member, Path::new("/checksums")) {
        warn!(%error, "failed to add checksum list");
        warnings.fetch_add(1, Ordering::Relaxed);
    }

    // Step 7: derive the removed-list and add it as /removed.
    observer.stage("adding removed list");
    let removed_temp = temp_file("ezbak-removed-")?;
    let removed = match write_removed(prior.as_mut(), &index_member, removed_temp.path()) {
        Ok(count) => count,
        Err(error) => {
            warn!(%error, "failed to derive removed list");
            warnings.fetch_add(1, Ordering::Relaxed);
            0
        }
    };
    if let Err(error) = archive.add_file(removed_temp.path(), Path::new("/removed")) {
        warn!(%error, "failed to add removed list");
        warnings.fetch_add(1, Ordering::Relaxed);
    }

    // Step 8: finalize the container. A truncated archive is useless, so
    // failure here is fatal.
    archive.close()?;
    drop(prior);

    // Step 9: encrypt into place, or rename.
    if let Some(cipher) = options.cipher {
        observer.stage("encrypting archive");
        let _guard = CoreDumpGuard::disable();
        let mut keys = KeyMaterial::new();
        keys.set_cipher(cipher)?;
        keys.gen_salt()?;
        let password = resolve_password(
            options.password.as_deref(),
            &format!("Enter {cipher} encryption password: "),
            Some("Verify encryption password: "),
        )?;
        keys.derive_keys(password.as_bytes())?;
        drop(password);

        let mut on_bytes = |count: u64| observer.bytes(count);
        encrypt_file(tar_temp.path(), &archive_path, &keys, Some(&mut on_bytes))?;
    } else {
        let (_, kept) = tar_temp
            .keep()
            .map_err(|error| Error::io(&archive_path, error.error))?;
        place_file(&kept, &archive_path)?;
    }

    // Step 10: persist the options pointing at the new archive.
    options.prev_backup = Some(archive_path.clone());
    options.prev_hash_algorithm = Some(options.hash_algorithm);
    if let Some(config_file) = config_file {
        if let Err(error) = config::store_config(config_file, options) {
            warn!(%error, "failed to persist configuration");
            warnings.fetch_add(1, Ordering::Relaxed);
        }
    }

    Ok(BackupSummary {
        archive_path,
        files_seen,
        files_ingested,
        files_unchanged,
        removed,
        warnings: warnings.load(Ordering::Relaxed),
    })
}

/// Builds `/files/<absolute-source-path>` without round-tripping through
/// UTF-8.
fn files_member_path(path: &Path) -> PathBuf {
    let mut logical = OsString::from("/files");
    logical.push(path.as_os_str());
    PathBuf::from(logical)
}

fn default_archive_name(options: &Options, output_dir: &Path) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    let mut name = format!("backup-{timestamp}.tar");
    if let Some(extension) = options.compression.extension() {
        name.push('.');
        name.push_str(extension);
    }
    if let Some(cipher) = options.cipher {
        name.push('.');
        name.push_str(cipher.name());
    }
    output_dir.join(name)
}

fn temp_file(prefix: &str) -> Result<NamedTempFile, Error> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempfile_in(TEMP_DIR)
        .map_err(|source| Error::io(Path::new(TEMP_DIR), source))
}

/// Recovers the prior `/checksums` index, decrypting the prior archive
/// first when a cipher is configured. The decrypted temp copy is shredded
/// as soon as the index is out.
fn recover_prior_index(
    options: &Options,
    observer: &mut dyn RunObserver,
) -> Result<Option<(NamedTempFile, SortedIndex)>, Error> {
    if !options.prior_index_usable() {
        if options.prev_backup.is_some() {
            warn!("hash algorithm changed since the previous run, taking a full backup");
        }
        return Ok(None);
    }
    let prev = options
        .prev_backup
        .as_deref()
        .expect("prior_index_usable implies prev_backup");

    let index_temp = temp_file("ezbak-previdx-")?;

    // The archive's own name says how it was written; the current options
    // may have changed compressor or cipher since then.
    let (prior_cipher, prior_compression) = crate::naming::infer_archive_format(prev);

    if let Some(cipher) = prior_cipher {
        observer.stage("decrypting previous archive");
        let plain_temp = temp_file("ezbak-plain-")?;
        {
            let _guard = CoreDumpGuard::disable();
            let mut keys = KeyMaterial::new();
            keys.set_cipher(cipher)?;
            extract_salt(prev, &mut keys)?;
            let password = resolve_password(
                options.password.as_deref(),
                &format!("Enter {cipher} decryption password: "),
                None,
            )?;
            keys.derive_keys(password.as_bytes())?;
            drop(password);

            let mut on_bytes = |count: u64| observer.bytes(count);
            decrypt_file(prev, plain_temp.path(), &keys, Some(&mut on_bytes))?;
        }

        // Decrypt and extract use two distinct paths. The plaintext copy is
        // shredded whether or not the index member comes out of it; plain
        // tempfile cleanup would unlink the decrypted prior backup without
        // overwriting it first.
        let extracted = extract_one(
            plain_temp.path(),
            prior_compression,
            Path::new("/checksums"),
            index_temp.path(),
        );
        let (file, plain_path) = plain_temp
            .keep()
            .map_err(|error| Error::io(prev, error.error))?;
        drop(file);
        shred_file(&plain_path)?;
        extracted?;
    } else {
        extract_one(
            prev,
            prior_compression,
            Path::new("/checksums"),
            index_temp.path(),
        )?;
    }

    let index = SortedIndex::open(index_temp.path())?;
    debug!(prev = %prev.display(), "loaded prior checksum index");
    Ok(Some((index_temp, index)))
}

fn write_removed(
    prior: Option<&mut (NamedTempFile, SortedIndex)>,
    current_index: &Path,
    out_path: &Path,
) -> Result<u64, Error> {
    let Some((_, prior_index)) = prior else {
        // First run: nothing can have been removed, store an empty list.
        File::create(out_path).map_err(|source| Error::io(out_path, source))?;
        return Ok(0);
    };

    let mut current = SortedIndex::open(current_index)?;
    let mut out = std::io::BufWriter::new(
        File::create(out_path).map_err(|source| Error::io(out_path, source))?,
    );
    let removed = ezbak_index::write_removed_list(prior_index, &mut current, &mut out)?;
    std::io::Write::flush(&mut out).map_err(|source| Error::io(out_path, source))?;
    Ok(removed)
}

fn resolve_password(
    provided: Option<&str>,
    prompt: &str,
    verify_prompt: Option<&str>,
) -> Result<Password, Error> {
    match provided {
        Some(provided) => Ok(Password::from_string(provided.to_string())?),
        None => match verify_prompt {
            Some(verify) => Ok(prompt_password_with_verify(prompt, verify)?),
            None => Ok(prompt_password(prompt)?),
        },
    }
}

/// Moves `from` to `to`, falling back to copy-and-delete when the rename
/// crosses filesystems.
fn place_file(from: &Path, to: &Path) -> Result<(), Error> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    if let Err(source) = fs::copy(from, to) {
        let _ = fs::remove_file(from);
        let _ = fs::remove_file(to);
        return Err(Error::io(to, source));
    }
    if let Err(error) = fs::remove_file(from) {
        warn!(path = %from.display(), %error, "failed to remove staged archive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::ffi::OsStringExt;

    use ezbak_archive::Compression;
    use ezbak_checksums::HashAlgorithm;
    use ezbak_crypt::CipherSpec;

    fn options_for(tree: &Path, out: &Path) -> Options {
        Options {
            directories: vec![tree.to_path_buf()],
            output_directory: Some(out.to_path_buf()),
            hash_algorithm: HashAlgorithm::Sha256,
            compression: Compression::None,
            ..Options::default()
        }
    }

    #[test]
    fn first_run_ingests_every_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tree = temp.path().join("tree");
        let out = temp.path().join("out");
        fs::create_dir_all(&tree).expect("tree");
        fs::create_dir_all(&out).expect("out");
        fs::write(tree.join("a.txt"), b"hello\n").expect("write");
        fs::write(tree.join("b.txt"), b"world").expect("write");

        let mut options = options_for(&tree, &out);
        let summary = run_backup(&mut options, None, &mut NullObserver).expect("backup");

        assert_eq!(summary.files_seen, 2);
        assert_eq!(summary.files_ingested, 2);
        assert_eq!(summary.files_unchanged, 0);
        assert_eq!(summary.removed, 0);
        assert!(summary.archive_path.exists());
        assert_eq!(options.prev_backup.as_deref(), Some(&*summary.archive_path));
    }

    #[test]
    fn unchanged_tree_ingests_nothing_on_second_run() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tree = temp.path().join("tree");
        let out = temp.path().join("out");
        fs::create_dir_all(&tree).expect("tree");
        fs::create_dir_all(&out).expect("out");
        fs::write(tree.join("a.txt"), b"hello\n").expect("write");

        let mut options = options_for(&tree, &out);
        let first = run_backup(&mut options, None, &mut NullObserver).expect("first");
        assert_eq!(first.files_ingested, 1);

        let second = run_backup(&mut options, None, &mut NullObserver).expect("second");
        assert_eq!(second.files_seen, 1);
        assert_eq!(second.files_ingested, 0);
        assert_eq!(second.files_unchanged, 1);
        assert_eq!(second.removed, 0);
    }

    #[test]
    fn deleted_files_land_in_the_removed_list() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tree = temp.path().join("tree");
        let out = temp.path().join("out");
        fs::create_dir_all(&tree).expect("tree");
        fs::create_dir_all(&out).expect("out");
        fs::write(tree.join("a.txt"), b"hello\n").expect("write");

        let mut options = options_for(&tree, &out);
        run_backup(&mut options, None, &mut NullObserver).expect("first");

        fs::remove_file(tree.join("a.txt")).expect("remove");
        fs::write(tree.join("b.txt"), b"world").expect("write");
        let second = run_backup(&mut options, None, &mut NullObserver).expect("second");

        assert_eq!(second.files_ingested, 1);
        assert_eq!(second.removed, 1);

        let extracted = temp.path().join("removed");
        extract_one(
            &second.archive_path,
            Compression::None,
            Path::new("/removed"),
            &extracted,
        )
        .expect("extract removed");
        let mut expected = tree.join("a.txt").into_os_string().into_vec();
        expected.push(b'\n');
        assert_eq!(fs::read(&extracted).expect("read"), expected);
    }

    /// Grabs an open handle to the decrypted prior-archive temp while the
    /// run streams through it. The handle keeps the inode readable after
    /// the unlink, so the test can check what the bytes looked like when
    /// the file was released.
    #[derive(Default)]
    struct PlainTempGrabber {
        grabbed: Vec<(PathBuf, File)>,
    }

    impl RunObserver for PlainTempGrabber {
        fn bytes(&mut self, _count: u64) {
            if !self.grabbed.is_empty() {
                return;
            }
            let Ok(entries) = fs::read_dir(TEMP_DIR) else {
                return;
            };
            for entry in entries.flatten() {
                if !entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("ezbak-plain-")
                {
                    continue;
                }
                if let Ok(file) = File::open(entry.path()) {
                    self.grabbed.push((entry.path(), file));
                }
            }
        }
    }

    #[test]
    fn failed_prior_extraction_still_shreds_the_decrypted_temp() {
        use std::io::Read;

        let temp = tempfile::tempdir().expect("tempdir");
        let tree = temp.path().join("tree");
        let out = temp.path().join("out");
        fs::create_dir_all(&tree).expect("tree");
        fs::create_dir_all(&out).expect("out");
        fs::write(tree.join("a.txt"), b"hello\n").expect("write");

        // A prior archive that decrypts fine but is not a tar stream, so
        // pulling /checksums out of it fails after decryption succeeded.
        let plaintext: Vec<u8> = b"this is not a tar archive ".repeat(100);
        let garbage = temp.path().join("garbage");
        fs::write(&garbage, &plaintext).expect("write garbage");
        let fake_prev = out.join("backup-1.tar.aes-256-cbc");
        let mut keys = KeyMaterial::new();
        keys.set_cipher(CipherSpec::Aes256Cbc).expect("cipher");
        keys.gen_salt().expect("salt");
        keys.derive_keys(b"swordfish").expect("derive");
        encrypt_file(&garbage, &fake_prev, &keys, None).expect("encrypt");
        drop(keys);

        let mut options = Options {
            cipher: Some(CipherSpec::Aes256Cbc),
            password: Some("swordfish".to_string()),
            prev_backup: Some(fake_prev),
            prev_hash_algorithm: Some(HashAlgorithm::Sha256),
            ..options_for(&tree, &out)
        };

        let mut grabber = PlainTempGrabber::default();
        let result = run_backup(&mut options, None, &mut grabber);
        assert!(
            result.is_err(),
            "a prior archive without a readable /checksums must fail the run"
        );

        assert!(
            !grabber.grabbed.is_empty(),
            "the decrypted temp must have been observed during the run"
        );
        assert!(
            grabber.grabbed.iter().any(|(path, _)| !path.exists()),
            "the decrypted temp must be unlinked"
        );
        for (path, mut file) in grabber.grabbed {
            let mut contents = Vec::new();
            file.read_to_end(&mut contents).expect("read held handle");
            assert_ne!(
                contents, plaintext,
                "the decrypted temp at {} must be overwritten before release",
                path.display()
            );
        }
    }

    #[test]
    fn files_member_path_prefixes_without_lossy_conversion() {
        assert_eq!(
            files_member_path(Path::new("/tmp/t/a.txt")),
            PathBuf::from("/files/tmp/t/a.txt")
        );
    }

    #[test]
    fn archive_name_carries_compression_and_cipher_extensions() {
        let mut options = Options {
            compression: Compression::Bzip2,
            cipher: Some(CipherSpec::Aes256Cbc),
            ..Options::default()
        };
        let name = default_archive_name(&options, Path::new("/b"));
        let name = name.to_string_lossy();
        assert!(name.starts_with("/b/backup-"));
        assert!(name.ends_with(".tar.bz2.aes-256-cbc"));

        options.cipher = None;
        options.compression = Compression::None;
        let name = default_archive_name(&options, Path::new("/b"));
        assert!(name.to_string_lossy().ends_with(".tar"));
    }
}
