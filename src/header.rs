//! # Pack Header
//!
//! [`PackHeader`] is the decoded view of Header₁ handed to listeners and
//! returned by both operations. It is built empty, populated by the header
//! assembler (encrypt) or parser (decrypt), and marked valid only once the
//! whole operation succeeded.

use crate::config::CryptoConfig;
use std::fmt;

/// Decoded header metadata for one pack stream.
#[derive(Debug, Clone)]
pub struct PackHeader {
    /// Suggested output filename hint.
    pub target_path: String,
    /// Plaintext size if known. On the wire an unknown size is the integer
    /// `0`, so a decoded `0` maps to `None` (empty and unknown are
    /// indistinguishable there).
    pub content_size: Option<u64>,
    /// Creation time, seconds since the Unix epoch.
    pub creation_time: u64,
    /// Opaque application tag.
    pub intention: String,
    /// Opaque payload version token.
    pub payload_version: String,
    /// Version token of this payload's parent.
    pub payload_version_parent: String,
    /// Algorithm identifiers, verbatim.
    pub crypto_cfg: CryptoConfig,
    /// Fingerprint of the public key that verifies the header signature.
    pub host_key_fingerprint: Vec<u8>,
    /// Fingerprints of the recipient public keys, in wrapping order.
    pub recipient_fingerprints: Vec<Vec<u8>>,
    /// Which recipient entry unwrapped the file key (decrypt only).
    pub used_recipient_index: Option<usize>,
    valid: bool,
}

impl PackHeader {
    pub(crate) fn new(crypto_cfg: CryptoConfig) -> Self {
        Self {
            target_path: String::new(),
            content_size: None,
            creation_time: 0,
            intention: String::new(),
            payload_version: String::new(),
            payload_version_parent: String::new(),
            crypto_cfg,
            host_key_fingerprint: Vec::new(),
            recipient_fingerprints: Vec::new(),
            used_recipient_index: None,
            valid: false,
        }
    }

    /// True only after signature verification and algorithm checks succeeded
    /// (decrypt) or after the stream was fully emitted (encrypt).
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn set_valid(&mut self) {
        self.valid = true;
    }
}

impl fmt::Display for PackHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PackHeader[target {}, size {}, created {}, version {} (parent {}), host {}, {} recipient(s), valid {}]",
            self.target_path,
            self.content_size
                .map_or_else(|| "unknown".to_string(), |s| s.to_string()),
            self.creation_time,
            self.payload_version,
            self.payload_version_parent,
            hex::encode(&self.host_key_fingerprint),
            self.recipient_fingerprints.len(),
            self.valid,
        )
    }
}
