// src/decryptor/mod.rs

//! High-level unpacking facade.
//!
//! Core API: `check_sign_then_decrypt(&request, source, listener)?` to
//! parse and verify the signed header, unwrap the file key, and stream the
//! authenticated plaintext.

pub(crate) mod decrypt;
pub(crate) mod read;
pub(crate) mod stream;

pub use decrypt::check_sign_then_decrypt;

use crate::config::CryptoConfig;
use crate::crypto::keys::{PrivateKey, PublicKey};
use std::path::Path;

/// Inputs for one `check_sign_then_decrypt` invocation.
pub struct DecryptRequest<'a> {
    /// Algorithm suite the header must declare; any divergence is fatal.
    pub expected_cfg: &'a CryptoConfig,
    /// Fixed ASCII tag the header must carry.
    pub package_magic: &'a str,
    /// Trusted host public keys; the one matching the header's host
    /// fingerprint verifies the signature.
    pub sign_pub_keys: &'a [PublicKey],
    /// Recipient private key; its public fingerprint must appear in the
    /// header's recipient list.
    pub dec_sec_key: &'a PrivateKey,
    /// Accept the reduced single-recipient header layout emitted by early
    /// producers. Off by default: unknown layouts are rejected.
    pub accept_legacy_header: bool,
    /// Plaintext destination file; `None` sends bytes to the listener only.
    pub destination: Option<&'a Path>,
    /// Whether an existing destination may be replaced.
    pub overwrite: bool,
}
