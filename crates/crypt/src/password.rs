//! Prompted passwords in a scrub-on-drop buffer.

use std::io::Write;

use crate::error::CryptError;
use crate::rng;

/// Fixed size of the password holding buffer.
pub const PASSWORD_BUFFER_LEN: usize = 1024;

/// A password held in a fixed-size buffer that is overwritten with random
/// bytes on drop.
///
/// The scrub covers `len + 5 + rand % 11` bytes rather than exactly `len`,
/// so an attacker reading freed memory learns neither the password nor its
/// length from where the random bytes stop.
pub struct Password {
    buffer: Box<[u8; PASSWORD_BUFFER_LEN]>,
    len: usize,
}

impl Password {
    /// Moves prompt output into the guarded buffer, scrubbing the source
    /// allocation before it is freed.
    ///
    /// # Errors
    ///
    /// [`CryptError::Primitive`] when the password exceeds
    /// [`PASSWORD_BUFFER_LEN`].
    pub fn from_string(source: String) -> Result<Self, CryptError> {
        let mut source = source.into_bytes();
        if source.len() > PASSWORD_BUFFER_LEN {
            let _ = rng::fill_random(&mut source);
            return Err(CryptError::primitive("password is too long"));
        }

        let mut buffer = Box::new([0_u8; PASSWORD_BUFFER_LEN]);
        buffer[..source.len()].copy_from_slice(&source);
        let len = source.len();

        if rng::fill_random(&mut source).is_err() {
            tracing::warn!("failed to scrub intermediate password buffer");
        }
        Ok(Self { buffer, len })
    }

    /// Returns the password bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Reports whether the password is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Password {
    fn scrub(&mut self) {
        let tail = rng::random_byte().map_or(0, |b| usize::from(b % 11));
        let scrub_len = (self.len + 5 + tail).min(PASSWORD_BUFFER_LEN);
        if rng::fill_random(&mut self.buffer[..scrub_len]).is_err() {
            tracing::warn!("failed to scrub password buffer before release");
        }
        self.len = 0;
    }
}

impl Drop for Password {
    fn drop(&mut self) {
        self.scrub();
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password").field("len", &"[REDACTED]").finish()
    }
}

/// Prompts once with echo suppressed.
///
/// # Errors
///
/// [`CryptError::Primitive`] when the terminal cannot be read.
pub fn prompt_password(prompt: &str) -> Result<Password, CryptError> {
    let entered = rpassword::prompt_password(prompt)
        .map_err(|error| CryptError::primitive(format!("password prompt failed: {error}")))?;
    Password::from_string(entered)
}

/// Prompts with echo suppressed and re-prompts until the verification entry
/// matches byte for byte.
///
/// # Errors
///
/// [`CryptError::Primitive`] when the terminal cannot be read.
pub fn prompt_password_with_verify(
    prompt: &str,
    verify_prompt: &str,
) -> Result<Password, CryptError> {
    loop {
        let first = prompt_password(prompt)?;
        let second = prompt_password(verify_prompt)?;
        if first.as_bytes() == second.as_bytes() {
            return Ok(first);
        }
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "Passwords do not match");
    }
}
