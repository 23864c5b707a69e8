//! Home and output directory resolution.

#[allow(unsafe_code)]
mod passwd {
    use std::ffi::CStr;
    use std::mem::MaybeUninit;
    use std::path::PathBuf;
    use std::ptr;

    /// Home directory of the current user per the passwd database.
    pub(super) fn home_from_passwd() -> Option<PathBuf> {
        // SAFETY: getuid has no preconditions.
        let uid = unsafe { libc::getuid() };

        let mut buffer = vec![0_u8; 1024];
        loop {
            let mut pwd = MaybeUninit::<libc::passwd>::zeroed();
            let mut result: *mut libc::passwd = ptr::null_mut();
            // SAFETY: all pointers are valid for the duration of the call;
            // `pwd` is written by getpwuid_r and `buffer` backs its strings.
            let errno = unsafe {
                libc::getpwuid_r(
                    uid,
                    pwd.as_mut_ptr(),
                    buffer.as_mut_ptr().cast::<libc::c_char>(),
                    buffer.len(),
                    &mut result,
                )
            };

            if errno == 0 {
                if result.is_null() {
                    return None;
                }
                // SAFETY: `result` is non-null, so `pwd` was initialized and
                // `pw_dir` points at a NUL-terminated string in `buffer`.
                let dir = unsafe { CStr::from_ptr(pwd.assume_init().pw_dir) };
                return Some(PathBuf::from(dir.to_string_lossy().into_owned()));
            }
            if errno == libc::ERANGE {
                buffer.resize(buffer.len().saturating_mul(2), 0);
                continue;
            }
            return None;
        }
    }
}

use std::fs;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Returns the current user's home directory.
///
/// `$HOME` wins; without it the passwd database is consulted.
///
/// # Errors
///
/// [`Error::Config`] when neither source knows a home directory.
pub fn home_directory() -> Result<PathBuf, Error> {
    if let Some(home) = std::env::var_os("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    passwd::home_from_passwd()
        .ok_or_else(|| Error::config("cannot determine the home directory"))
}

/// Returns `$HOME/Backups`, creating it with mode `0755` when absent.
///
/// # Errors
///
/// [`Error::Io`] when the directory cannot be created.
pub fn backup_directory() -> Result<PathBuf, Error> {
    let dir = home_directory()?.join("Backups");
    ensure_directory(&dir)?;
    Ok(dir)
}

/// Creates `dir` with mode `0755` when it does not exist yet.
///
/// # Errors
///
/// [`Error::Io`] when creation fails.
pub fn ensure_directory(dir: &Path) -> Result<(), Error> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(dir)
        .map_err(|source| Error::io(dir, source))
}
