// src/encryptor/mod.rs

//! High-level packing facade.
//!
//! Core API: `encrypt_then_sign(&request, source, listener)?` to wrap the
//! file key for every recipient, emit the signed header, and stream the
//! AEAD-encrypted payload.

pub(crate) mod encrypt;
pub(crate) mod header;
pub(crate) mod stream;

pub use encrypt::encrypt_then_sign;

use crate::config::CryptoConfig;
use crate::crypto::keys::{PrivateKey, PublicKey};
use std::path::Path;

/// Inputs for one `encrypt_then_sign` invocation.
pub struct EncryptRequest<'a> {
    /// Algorithm suite written into the header.
    pub crypto_cfg: &'a CryptoConfig,
    /// Fixed ASCII tag identifying the application's pack format; checked on
    /// decode.
    pub package_magic: &'a str,
    /// Recipient public keys; each gets its own wrapped copy of the file
    /// key. Must be non-empty.
    pub enc_pub_keys: &'a [PublicKey],
    /// Host private key signing Header₁.
    pub sign_sec_key: &'a PrivateKey,
    /// Designated target path for the eventual plaintext.
    pub target_path: &'a str,
    /// Opaque application tag.
    pub intention: &'a str,
    /// Opaque payload version tokens.
    pub payload_version: &'a str,
    pub payload_version_parent: &'a str,
    /// Ciphertext destination file; `None` sends bytes to the listener only.
    pub destination: Option<&'a Path>,
    /// Whether an existing destination may be replaced.
    pub overwrite: bool,
}
