//! RSA key wrappers and public-key fingerprints.
//!
//! The core consumes already-loaded keys; PEM/DER file loading and
//! passphrase handling live with the caller. Fingerprints are the configured
//! hash over the key's SubjectPublicKeyInfo DER, which is what binds header
//! recipients and the signing host to concrete keypairs.

use crate::error::CipherpackError;
use rsa::pkcs8::EncodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256, Sha512};

/// A loaded public key (recipient or signing host).
#[derive(Debug, Clone, PartialEq)]
pub struct PublicKey {
    inner: RsaPublicKey,
}

/// A loaded private key (recipient decryption key or host signing key).
///
/// The wrapped `RsaPrivateKey` zeroizes its material on drop.
#[derive(Debug, Clone)]
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl PublicKey {
    pub fn new(inner: RsaPublicKey) -> Self {
        Self { inner }
    }

    pub fn as_rsa(&self) -> &RsaPublicKey {
        &self.inner
    }

    /// Fingerprint of this key under the configured hash algorithm.
    pub fn fingerprint(&self, hash_algo: &str) -> Result<Vec<u8>, CipherpackError> {
        let spki = self
            .inner
            .to_public_key_der()
            .map_err(|e| CipherpackError::Crypto(format!("public key DER export failed: {e}")))?;
        match hash_algo {
            "SHA-256" => Ok(Sha256::digest(spki.as_bytes()).to_vec()),
            "SHA-512" => Ok(Sha512::digest(spki.as_bytes()).to_vec()),
            other => Err(CipherpackError::Crypto(format!(
                "unsupported fingerprint hash {other}"
            ))),
        }
    }
}

impl From<RsaPublicKey> for PublicKey {
    fn from(inner: RsaPublicKey) -> Self {
        Self::new(inner)
    }
}

impl PrivateKey {
    pub fn new(inner: RsaPrivateKey) -> Self {
        Self { inner }
    }

    pub fn as_rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(RsaPublicKey::from(&self.inner))
    }
}

impl From<RsaPrivateKey> for PrivateKey {
    fn from(inner: RsaPrivateKey) -> Self {
        Self::new(inner)
    }
}

/// Generate a fresh RSA keypair. Mainly useful for tests and tooling; real
/// deployments load existing keys.
pub fn generate_keypair(bits: usize) -> Result<(PublicKey, PrivateKey), CipherpackError> {
    let mut rng = rsa::rand_core::OsRng;
    let private = RsaPrivateKey::new(&mut rng, bits)
        .map_err(|e| CipherpackError::Crypto(format!("RSA keygen failed: {e}")))?;
    let public = RsaPublicKey::from(&private);
    Ok((PublicKey::new(public), PrivateKey::new(private)))
}
