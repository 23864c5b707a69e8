#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `ezbak_checksums` computes the per-file content digests that drive change
//! detection between backup runs. A digest is a lowercase hexadecimal string
//! of fixed width for the chosen algorithm; comparing the fresh digest of a
//! file against the digest recorded in the previous archive's index decides
//! whether the file is re-ingested or skipped.
//!
//! # Design
//!
//! Hashing goes through OpenSSL's EVP message-digest interface via
//! [`openssl::hash::Hasher`], the same backend the encryption pipeline uses,
//! so the digest named in the configuration file is resolved exactly once in
//! [`HashAlgorithm`]. Files are digested in bounded 64 KiB reads; memory use
//! is independent of file size.
//!
//! # Errors
//!
//! Read failures surface as [`DigestError::Io`] with the offending path;
//! failures inside the hashing primitive surface as [`DigestError::Crypto`].
//!
//! # Examples
//!
//! ```
//! use ezbak_checksums::{hex_digest_bytes, HashAlgorithm};
//!
//! let hex = hex_digest_bytes(HashAlgorithm::Sha256, b"hello\n").unwrap();
//! assert_eq!(
//!     hex,
//!     "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
//! );
//! assert_eq!(hex.len(), HashAlgorithm::Sha256.hex_width());
//! ```

mod algorithm;
mod digest;
mod error;

pub use algorithm::{HashAlgorithm, HashAlgorithmParseError};
pub use digest::{hex_digest_bytes, hex_digest_file, hex_digest_reader, DIGEST_BUFFER_LEN};
pub use error::DigestError;
