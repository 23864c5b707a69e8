#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `ezbak_crypt` wraps a finished archive in password-derived symmetric
//! encryption using the same on-disk framing as the `openssl enc` command
//! line utility:
//!
//! ```text
//! bytes 0..8    ASCII "Salted__"
//! bytes 8..16   8-byte random salt
//! bytes 16..    ciphertext
//! ```
//!
//! Interoperability is the point: an archive produced here decrypts with
//! `openssl enc -d -aes-256-cbc -md sha256 ...` and vice versa, which is why
//! key derivation uses the legacy `EVP_BytesToKey` construction rather than
//! a modern KDF. Changing the KDF requires changing the header format.
//!
//! # Design
//!
//! - [`KeyMaterial`] is a runtime-checked state machine: cipher first, then a
//!   salt (generated or extracted), then key derivation. Calls out of order
//!   fail with [`CryptError::State`] instead of silently encrypting with
//!   uninitialized keys. Key and IV buffers are scrubbed with CSPRNG bytes
//!   on drop.
//! - [`encrypt_file`] and [`decrypt_file`] stream through
//!   [`openssl::symm::Crypter`] in 64 KiB chunks; a failed run removes its
//!   partial output.
//! - [`Password`] holds prompt input in a fixed 1 KiB buffer and overwrites
//!   `len + 5 + rand % 11` bytes with random data on drop, so heap residue
//!   reveals neither the password nor its length.
//! - [`CoreDumpGuard`] zeroes `RLIMIT_CORE` while passwords or derived keys
//!   are in memory and restores the saved limit afterwards; the guard is
//!   reference counted, so nesting password-bearing sections is safe.
//! - [`fill_random`] uses the OpenSSL CSPRNG and falls back to
//!   `/dev/urandom`; when both fail the operation aborts rather than
//!   degrading to a non-cryptographic generator.
//!
//! # Errors
//!
//! [`CryptError::Format`] covers bad framing (wrong magic, truncated salt),
//! [`CryptError::State`] covers API misuse, [`CryptError::Primitive`] covers
//! failures inside OpenSSL, and [`CryptError::Io`] carries filesystem
//! errors.

mod cipher;
mod error;
mod keys;
mod password;
mod pipe;
mod rlimit;
mod rng;

pub use cipher::{CipherSpec, CipherParseError};
pub use error::CryptError;
pub use keys::KeyMaterial;
pub use password::{Password, prompt_password, prompt_password_with_verify, PASSWORD_BUFFER_LEN};
pub use pipe::{decrypt_file, encrypt_file, extract_salt, SALT_LEN, SALT_MAGIC};
pub use rlimit::CoreDumpGuard;
pub use rng::{fill_random, random_byte, shred_file};
