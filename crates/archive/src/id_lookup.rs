#![allow(unsafe_code)]

//! UID/GID to name resolution for archive headers.
//!
//! Member headers record the owner and group names alongside the numeric ids
//! so a restore on another host can map ownership by name. Lookups go through
//! the reentrant passwd/group interfaces with an ERANGE retry loop.

use std::ffi::CStr;
use std::io;
use std::mem::MaybeUninit;
use std::ptr;

/// Looks up the username for a UID.
///
/// Returns `Ok(None)` when the UID has no passwd entry.
pub(crate) fn lookup_user_name(uid: u32) -> Result<Option<String>, io::Error> {
    let mut buffer = vec![0_u8; 1024];
    loop {
        let mut pwd = MaybeUninit::<libc::passwd>::zeroed();
        let mut result: *mut libc::passwd = ptr::null_mut();
        // SAFETY: all pointers are valid for the duration of the call; `pwd`
        // is written by getpwuid_r and `buffer` is the scratch space backing
        // the returned strings.
        let errno = unsafe {
            libc::getpwuid_r(
                uid as libc::uid_t,
                pwd.as_mut_ptr(),
                buffer.as_mut_ptr().cast::<libc::c_char>(),
                buffer.len(),
                &mut result,
            )
        };

        if errno == 0 {
            if result.is_null() {
                return Ok(None);
            }
            // SAFETY: `result` is non-null, so `pwd` was initialized and
            // `pw_name` points at a NUL-terminated string inside `buffer`.
            let name = unsafe { CStr::from_ptr(pwd.assume_init().pw_name) };
            return Ok(Some(name.to_string_lossy().into_owned()));
        }

        if errno == libc::ERANGE {
            buffer.resize(buffer.len().saturating_mul(2), 0);
            continue;
        }

        return Err(io::Error::from_raw_os_error(errno));
    }
}

/// Looks up the group name for a GID.
///
/// Returns `Ok(None)` when the GID has no group entry.
pub(crate) fn lookup_group_name(gid: u32) -> Result<Option<String>, io::Error> {
    let mut buffer = vec![0_u8; 1024];
    loop {
        let mut grp = MaybeUninit::<libc::group>::zeroed();
        let mut result: *mut libc::group = ptr::null_mut();
        // SAFETY: all pointers are valid for the duration of the call; `grp`
        // is written by getgrgid_r and `buffer` is the scratch space backing
        // the returned strings.
        let errno = unsafe {
            libc::getgrgid_r(
                gid as libc::gid_t,
                grp.as_mut_ptr(),
                buffer.as_mut_ptr().cast::<libc::c_char>(),
                buffer.len(),
                &mut result,
            )
        };

        if errno == 0 {
            if result.is_null() {
                return Ok(None);
            }
            // SAFETY: `result` is non-null, so `grp` was initialized and
            // `gr_name` points at a NUL-terminated string inside `buffer`.
            let name = unsafe { CStr::from_ptr(grp.assume_init().gr_name) };
            return Ok(Some(name.to_string_lossy().into_owned()));
        }

        if errno == libc::ERANGE {
            buffer.resize(buffer.len().saturating_mul(2), 0);
            continue;
        }

        return Err(io::Error::from_raw_os_error(errno));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_user_resolves_to_a_name() {
        // SAFETY: getuid has no preconditions.
        let uid = unsafe { libc::getuid() };
        let name = lookup_user_name(uid).expect("lookup");
        assert!(name.is_some(), "running user should have a passwd entry");
    }

    #[test]
    fn unknown_uid_resolves_to_none() {
        // Close to uid_t max; no real system allocates it.
        assert_eq!(lookup_user_name(u32::MAX - 3).expect("lookup"), None);
    }
}
