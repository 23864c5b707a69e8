//! The restore path: unpack an archive's payloads into a directory.

use std::path::{Path, PathBuf};

use tracing::info;

use ezbak_archive::{extract_files, Compression};
use ezbak_crypt::{
    decrypt_file, extract_salt, prompt_password, shred_file, CipherSpec, CoreDumpGuard,
    KeyMaterial, Password,
};

use crate::backup::RunObserver;
use crate::error::Error;
use crate::paths;

/// What to restore and where to put it.
#[derive(Clone, Debug)]
pub struct RestoreRequest {
    /// Archive to read.
    pub archive: PathBuf,
    /// Directory that receives the tree. Created when absent.
    pub output_directory: PathBuf,
    /// Cipher the archive was encrypted with, `None` for plaintext.
    pub cipher: Option<CipherSpec>,
    /// Compression filter of the tar stream.
    pub compression: Compression,
    /// Password; prompted for when absent and a cipher is set.
    pub password: Option<String>,
}

/// Restores every `/files/*` payload into the output directory, preserving
/// mode and mtime, and returns the number of files written.
///
/// Encrypted archives are decrypted to a temp copy first; the plaintext
/// copy is shredded once extraction finishes, success or not.
///
/// # Errors
///
/// Fatal on any failure: a partially restored tree is reported rather than
/// silently completed.
pub fn run_restore(
    request: &RestoreRequest,
    observer: &mut dyn RunObserver,
) -> Result<u64, Error> {
    paths::ensure_directory(&request.output_directory)?;

    let restored = if let Some(cipher) = request.cipher {
        observer.stage("decrypting archive");
        let plain_temp = tempfile::Builder::new()
            .prefix("ezbak-restore-")
            .tempfile_in("/var/tmp")
            .map_err(|source| Error::io(Path::new("/var/tmp"), source))?;
        {
            let _guard = CoreDumpGuard::disable();
            let mut keys = KeyMaterial::new();
            keys.set_cipher(cipher)?;
            extract_salt(&request.archive, &mut keys)?;
            let password = match request.password.as_deref() {
                Some(provided) => Password::from_string(provided.to_string())?,
                None => prompt_password(&format!("Enter {cipher} decryption password: "))?,
            };
            keys.derive_keys(password.as_bytes())?;
            drop(password);

            let mut on_bytes = |count: u64| observer.bytes(count);
            decrypt_file(
                &request.archive,
                plain_temp.path(),
                &keys,
                Some(&mut on_bytes),
            )?;
        }

        observer.stage("extracting files");
        let result = extract_files(
            plain_temp.path(),
            request.compression,
            &request.output_directory,
        );
        let (file, plain_path) = plain_temp
            .keep()
            .map_err(|error| Error::io(&request.archive, error.error))?;
        drop(file);
        shred_file(&plain_path)?;
        result?
    } else {
        observer.stage("extracting files");
        extract_files(
            &request.archive,
            request.compression,
            &request.output_directory,
        )?
    };

    info!(
        restored,
        output = %request.output_directory.display(),
        "restore finished"
    );
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{run_backup, NullObserver};
    use crate::options::Options;
    use ezbak_checksums::HashAlgorithm;
    use std::fs;

    #[test]
    fn restore_round_trips_an_unencrypted_backup() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tree = temp.path().join("tree");
        let out = temp.path().join("out");
        fs::create_dir_all(tree.join("nested")).expect("tree");
        fs::create_dir_all(&out).expect("out");
        fs::write(tree.join("a.txt"), b"hello\n").expect("write");
        fs::write(tree.join("nested/b.txt"), b"world").expect("write");

        let mut options = Options {
            directories: vec![tree.clone()],
            output_directory: Some(out.clone()),
            hash_algorithm: HashAlgorithm::Sha256,
            compression: Compression::Gzip,
            ..Options::default()
        };
        let summary = run_backup(&mut options, None, &mut NullObserver).expect("backup");

        let dest = temp.path().join("restored");
        let request = RestoreRequest {
            archive: summary.archive_path,
            output_directory: dest.clone(),
            cipher: None,
            compression: Compression::Gzip,
            password: None,
        };
        let restored = run_restore(&request, &mut NullObserver).expect("restore");
        assert_eq!(restored, 2);

        // Members are stored under /files/<absolute path>, so the restored
        // tree mirrors the source's absolute layout below the destination.
        let mirrored = dest.join(tree.strip_prefix("/").expect("absolute"));
        assert_eq!(fs::read(mirrored.join("a.txt")).expect("read"), b"hello\n");
        assert_eq!(
            fs::read(mirrored.join("nested/b.txt")).expect("read"),
            b"world"
        );
    }

    #[test]
    fn restore_round_trips_an_encrypted_backup() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tree = temp.path().join("tree");
        let out = temp.path().join("out");
        fs::create_dir_all(&tree).expect("tree");
        fs::create_dir_all(&out).expect("out");
        fs::write(tree.join("secret.txt"), b"classified").expect("write");

        let mut options = Options {
            directories: vec![tree.clone()],
            output_directory: Some(out.clone()),
            hash_algorithm: HashAlgorithm::Sha256,
            compression: Compression::None,
            cipher: Some(CipherSpec::Aes256Cbc),
            password: Some("swordfish".to_string()),
            ..Options::default()
        };
        let summary = run_backup(&mut options, None, &mut NullObserver).expect("backup");

        // The archive on disk must carry the salt framing.
        let header = fs::read(&summary.archive_path).expect("read");
        assert_eq!(&header[..8], b"Salted__");

        let dest = temp.path().join("restored");
        let request = RestoreRequest {
            archive: summary.archive_path.clone(),
            output_directory: dest.clone(),
            cipher: Some(CipherSpec::Aes256Cbc),
            compression: Compression::None,
            password: Some("swordfish".to_string()),
        };
        let restored = run_restore(&request, &mut NullObserver).expect("restore");
        assert_eq!(restored, 1);

        let mirrored = dest.join(tree.strip_prefix("/").expect("absolute"));
        assert_eq!(
            fs::read(mirrored.join("secret.txt")).expect("read"),
            b"classified"
        );

        // A wrong password must not restore anything.
        let wrong = RestoreRequest {
            output_directory: temp.path().join("wrong"),
            password: Some("Swordfish".to_string()),
            ..request
        };
        assert!(run_restore(&wrong, &mut NullObserver).is_err());
    }
}
