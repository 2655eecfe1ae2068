//! # Crypto Configuration
//!
//! The immutable algorithm set for one pack stream. Identifiers are carried
//! verbatim in the header and compared verbatim on decode; the crypto facade
//! maps them to concrete primitives.

use crate::der::oid::Oid;
use crate::error::CipherpackError;
use serde::{Deserialize, Serialize};

/// Algorithm identifiers for one pack stream.
///
/// All fields are opaque tokens from the producer's point of view: they are
/// written into Header₁ exactly as given and must match the receiver's
/// expected configuration byte-for-byte. [`CryptoConfig::default`] yields the
/// standard suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// Public-key type, e.g. `"RSA"`.
    pub pk_type: String,
    /// Hash used for public-key fingerprints, e.g. `"SHA-256"`.
    pub pk_fingerprt_hash_algo: String,
    /// Public-key encryption padding, e.g. `"OAEP"`.
    pub pk_enc_padding_algo: String,
    /// Hash used inside the encryption padding, e.g. `"SHA-256"`.
    pub pk_enc_hash_algo: String,
    /// Header signature algorithm, e.g. `"EMSA1(SHA-256)"`.
    pub pk_sign_algo: String,
    /// Symmetric AEAD cipher, e.g. `"ChaCha20Poly1305"`. Carried on the wire
    /// as its registered OID.
    pub sym_enc_mac_algo: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            pk_type: "RSA".to_string(),
            pk_fingerprt_hash_algo: "SHA-256".to_string(),
            pk_enc_padding_algo: "OAEP".to_string(),
            pk_enc_hash_algo: "SHA-256".to_string(),
            pk_sign_algo: "EMSA1(SHA-256)".to_string(),
            sym_enc_mac_algo: "ChaCha20Poly1305".to_string(),
        }
    }
}

impl CryptoConfig {
    /// The OID written into Header₁ for the configured AEAD.
    pub fn sym_enc_mac_oid(&self) -> Result<Oid, CipherpackError> {
        Oid::for_name(&self.sym_enc_mac_algo).ok_or_else(|| {
            CipherpackError::Crypto(format!(
                "no OID registered for cipher algo {}",
                self.sym_enc_mac_algo
            ))
        })
    }

    /// The padding combination string used by the legacy header's
    /// AlgorithmIdentifier, e.g. `"RSA/OAEP"`.
    pub fn pk_padding_combo(&self) -> String {
        format!("{}/{}", self.pk_type, self.pk_enc_padding_algo)
    }

    /// Reject configurations with empty identifiers before any work is done.
    pub fn validate(&self) -> Result<(), CipherpackError> {
        let fields = [
            ("pk_type", &self.pk_type),
            ("pk_fingerprt_hash_algo", &self.pk_fingerprt_hash_algo),
            ("pk_enc_padding_algo", &self.pk_enc_padding_algo),
            ("pk_enc_hash_algo", &self.pk_enc_hash_algo),
            ("pk_sign_algo", &self.pk_sign_algo),
            ("sym_enc_mac_algo", &self.sym_enc_mac_algo),
        ];
        for (name, value) in fields {
            if value.is_empty() {
                return Err(CipherpackError::Crypto(format!(
                    "crypto config field {name} is empty"
                )));
            }
        }
        self.sym_enc_mac_oid().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_suite() {
        let cfg = CryptoConfig::default();
        assert_eq!(cfg.pk_type, "RSA");
        assert_eq!(cfg.pk_sign_algo, "EMSA1(SHA-256)");
        assert_eq!(cfg.pk_padding_combo(), "RSA/OAEP");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_field_rejected() {
        let cfg = CryptoConfig {
            pk_sign_algo: String::new(),
            ..CryptoConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_cipher_rejected() {
        let cfg = CryptoConfig {
            sym_enc_mac_algo: "ROT13".to_string(),
            ..CryptoConfig::default()
        };
        assert!(cfg.sym_enc_mac_oid().is_err());
    }
}
