//! Password-derived key material with checked state transitions.

use openssl::hash::MessageDigest;
use openssl::pkcs5::KeyIvPair;

use crate::cipher::CipherSpec;
use crate::error::CryptError;
use crate::pipe::SALT_LEN;
use crate::rng;

/// Derived key and IV for one encrypt or decrypt operation.
///
/// The handle walks a fixed state machine; transitions out of order return
/// [`CryptError::State`]:
///
/// ```text
/// NEW -> set_cipher -> CIPHER_SET -> gen_salt | set_salt -> SALTED
///     -> derive_keys -> READY -> (encrypt/decrypt via accessors)
/// ```
///
/// Key and IV buffers are overwritten with CSPRNG bytes when the handle is
/// dropped, so derived secrets do not survive in freed heap memory.
pub struct KeyMaterial {
    cipher: Option<CipherSpec>,
    salt: Option<[u8; SALT_LEN]>,
    key: Vec<u8>,
    iv: Vec<u8>,
    keys_set: bool,
}

impl KeyMaterial {
    /// Creates an empty handle in the `NEW` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cipher: None,
            salt: None,
            key: Vec::new(),
            iv: Vec::new(),
            keys_set: false,
        }
    }

    /// Selects the cipher. Must be the first transition.
    ///
    /// # Errors
    ///
    /// [`CryptError::State`] when a cipher was already set.
    pub fn set_cipher(&mut self, cipher: CipherSpec) -> Result<(), CryptError> {
        if self.cipher.is_some() {
            return Err(CryptError::state("cipher is already set"));
        }
        self.cipher = Some(cipher);
        Ok(())
    }

    /// Generates a fresh random salt. Requires the cipher to be set.
    ///
    /// # Errors
    ///
    /// [`CryptError::State`] out of order; [`CryptError::Primitive`] when
    /// the CSPRNG (and its fallback) fail.
    pub fn gen_salt(&mut self) -> Result<(), CryptError> {
        if self.cipher.is_none() {
            return Err(CryptError::state("gen_salt requires set_cipher first"));
        }
        if self.keys_set {
            return Err(CryptError::state("salt cannot change after derive_keys"));
        }
        let mut salt = [0_u8; SALT_LEN];
        rng::fill_random(&mut salt)?;
        self.salt = Some(salt);
        Ok(())
    }

    /// Installs a salt extracted from an existing artifact.
    ///
    /// # Errors
    ///
    /// [`CryptError::State`] out of order.
    pub fn set_salt(&mut self, salt: [u8; SALT_LEN]) -> Result<(), CryptError> {
        if self.cipher.is_none() {
            return Err(CryptError::state("set_salt requires set_cipher first"));
        }
        if self.keys_set {
            return Err(CryptError::state("salt cannot change after derive_keys"));
        }
        self.salt = Some(salt);
        Ok(())
    }

    /// Derives the key and IV from `password` with the default KDF digest
    /// (sha256) and a single iteration, matching `openssl enc`'s modern
    /// default.
    ///
    /// # Errors
    ///
    /// See [`derive_keys_with`](Self::derive_keys_with).
    pub fn derive_keys(&mut self, password: &[u8]) -> Result<(), CryptError> {
        self.derive_keys_with(password, MessageDigest::sha256(), 1)
    }

    /// Derives the key and IV using the legacy `EVP_BytesToKey` construction
    /// with an explicit digest and iteration count.
    ///
    /// # Errors
    ///
    /// [`CryptError::State`] when the cipher or salt is missing or keys were
    /// already derived; [`CryptError::Primitive`] when the KDF fails.
    pub fn derive_keys_with(
        &mut self,
        password: &[u8],
        digest: MessageDigest,
        iterations: i32,
    ) -> Result<(), CryptError> {
        let Some(cipher) = self.cipher else {
            return Err(CryptError::state("derive_keys requires set_cipher first"));
        };
        let Some(salt) = self.salt else {
            return Err(CryptError::state(
                "derive_keys requires gen_salt or set_salt first",
            ));
        };
        if self.keys_set {
            return Err(CryptError::state("keys were already derived"));
        }

        let KeyIvPair { key, iv } = openssl::pkcs5::bytes_to_key(
            cipher.cipher(),
            digest,
            password,
            Some(&salt),
            iterations,
        )?;

        self.key = key;
        self.iv = iv.unwrap_or_default();
        self.keys_set = true;
        Ok(())
    }

    /// Reports whether the handle is ready for encrypt/decrypt.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.keys_set
    }

    /// Returns the selected cipher.
    ///
    /// # Errors
    ///
    /// [`CryptError::State`] before [`set_cipher`](Self::set_cipher).
    pub fn cipher(&self) -> Result<CipherSpec, CryptError> {
        self.cipher
            .ok_or_else(|| CryptError::state("cipher is not set"))
    }

    /// Returns the salt.
    ///
    /// # Errors
    ///
    /// [`CryptError::State`] before a salt exists.
    pub fn salt(&self) -> Result<&[u8; SALT_LEN], CryptError> {
        self.salt
            .as_ref()
            .ok_or_else(|| CryptError::state("salt is not set"))
    }

    /// Returns the derived key bytes.
    ///
    /// # Errors
    ///
    /// [`CryptError::State`] before [`derive_keys`](Self::derive_keys).
    pub fn key(&self) -> Result<&[u8], CryptError> {
        if !self.keys_set {
            return Err(CryptError::state("keys are not derived"));
        }
        Ok(&self.key)
    }

    /// Returns the derived IV bytes (empty for IV-less modes).
    ///
    /// # Errors
    ///
    /// [`CryptError::State`] before [`derive_keys`](Self::derive_keys).
    pub fn iv(&self) -> Result<&[u8], CryptError> {
        if !self.keys_set {
            return Err(CryptError::state("keys are not derived"));
        }
        Ok(&self.iv)
    }
}

impl Default for KeyMaterial {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        if !self.keys_set {
            return;
        }
        // A scrub failure leaves secrets in memory but cannot be surfaced
        // from drop; log and move on.
        if rng::fill_random(&mut self.key).is_err() || rng::fill_random(&mut self.iv).is_err() {
            tracing::warn!("failed to scrub key material before release");
        }
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("cipher", &self.cipher)
            .field("salted", &self.salt.is_some())
            .field("ready", &self.keys_set)
            .finish()
    }
}
