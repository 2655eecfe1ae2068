//! RSA operations for the header: file-key wrapping with OAEP and the
//! Header₁ signature.
//!
//! `unwrap_file_key_or_random` deliberately never reports whether the
//! padding check succeeded: it always yields a key-sized buffer, selecting
//! between the recovered plaintext and a random fallback with byte-wise
//! conditional moves. The AEAD tag is what authenticates the key.

use crate::aliases::FileKey32;
use crate::config::CryptoConfig;
use crate::consts::FILE_KEY_SIZE;
use crate::crypto::keys::{PrivateKey, PublicKey};
use crate::crypto::rng::SecureRandomExt;
use crate::error::CipherpackError;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::Oaep;
use secure_gate::{RevealSecret, RevealSecretMut};
use sha2::{Sha256, Sha512};
use subtle::{Choice, ConditionallySelectable};
use zeroize::Zeroizing;

fn oaep_padding(cfg: &CryptoConfig) -> Result<Oaep, CipherpackError> {
    if cfg.pk_enc_padding_algo != "OAEP" {
        return Err(CipherpackError::Crypto(format!(
            "unsupported encryption padding {}",
            cfg.pk_enc_padding_algo
        )));
    }
    match cfg.pk_enc_hash_algo.as_str() {
        "SHA-256" => Ok(Oaep::new::<Sha256>()),
        "SHA-512" => Ok(Oaep::new::<Sha512>()),
        other => Err(CipherpackError::Crypto(format!(
            "unsupported OAEP hash {other}"
        ))),
    }
}

/// Encrypt the file key for one recipient.
pub fn wrap_file_key(
    recipient: &PublicKey,
    cfg: &CryptoConfig,
    file_key: &FileKey32,
) -> Result<Vec<u8>, CipherpackError> {
    let mut rng = rsa::rand_core::OsRng;
    recipient
        .as_rsa()
        .encrypt(&mut rng, oaep_padding(cfg)?, file_key.expose_secret())
        .map_err(|e| CipherpackError::Crypto(format!("file-key wrap failed: {e}")))
}

/// Recover the file key, or a random stand-in of the same size.
///
/// Whether the wrapped key decrypted cleanly is not observable from this
/// function's behavior; a wrong key or tampered ciphertext surfaces later as
/// an AEAD tag failure.
pub fn unwrap_file_key_or_random(
    dec_key: &PrivateKey,
    cfg: &CryptoConfig,
    wrapped: &[u8],
) -> Result<FileKey32, CipherpackError> {
    let padding = oaep_padding(cfg)?;
    let mut out = FileKey32::random();

    let recovered = dec_key
        .as_rsa()
        .decrypt(padding, wrapped)
        .map(Zeroizing::new);

    let mut plain = Zeroizing::new([0u8; FILE_KEY_SIZE]);
    let ok = match &recovered {
        Ok(p) if p.len() == FILE_KEY_SIZE => {
            plain.copy_from_slice(p);
            Choice::from(1)
        }
        _ => Choice::from(0),
    };

    let buf = out.expose_secret_mut();
    for i in 0..FILE_KEY_SIZE {
        buf[i] = u8::conditional_select(&buf[i], &plain[i], ok);
    }
    Ok(out)
}

/// Sign the exact Header₁ bytes with the host's private key.
pub fn sign_header(
    sign_key: &PrivateKey,
    cfg: &CryptoConfig,
    header1: &[u8],
) -> Result<Vec<u8>, CipherpackError> {
    match cfg.pk_sign_algo.as_str() {
        "EMSA1(SHA-256)" => {
            let signer = SigningKey::<Sha256>::new(sign_key.as_rsa().clone());
            let sig = signer
                .try_sign(header1)
                .map_err(|e| CipherpackError::Crypto(format!("header signing failed: {e}")))?;
            Ok(sig.to_vec())
        }
        "EMSA1(SHA-512)" => {
            let signer = SigningKey::<Sha512>::new(sign_key.as_rsa().clone());
            let sig = signer
                .try_sign(header1)
                .map_err(|e| CipherpackError::Crypto(format!("header signing failed: {e}")))?;
            Ok(sig.to_vec())
        }
        other => Err(CipherpackError::Crypto(format!(
            "unsupported signature algo {other}"
        ))),
    }
}

/// Check a Header₁ signature against a candidate host public key.
pub fn verify_header(
    host_key: &PublicKey,
    cfg: &CryptoConfig,
    header1: &[u8],
    signature: &[u8],
) -> Result<bool, CipherpackError> {
    let signature = match Signature::try_from(signature) {
        Ok(sig) => sig,
        // A malformed signature blob is just an invalid signature.
        Err(_) => return Ok(false),
    };
    match cfg.pk_sign_algo.as_str() {
        "EMSA1(SHA-256)" => {
            let verifier = VerifyingKey::<Sha256>::new(host_key.as_rsa().clone());
            Ok(verifier.verify(header1, &signature).is_ok())
        }
        "EMSA1(SHA-512)" => {
            let verifier = VerifyingKey::<Sha512>::new(host_key.as_rsa().clone());
            Ok(verifier.verify(header1, &signature).is_ok())
        }
        other => Err(CipherpackError::Crypto(format!(
            "unsupported signature algo {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::generate_keypair;

    fn fixture() -> (PublicKey, PrivateKey, CryptoConfig) {
        let (public, private) = generate_keypair(1024).unwrap();
        (public, private, CryptoConfig::default())
    }

    #[test]
    fn wrap_unwrap_roundtrip() {
        let (public, private, cfg) = fixture();
        let file_key = FileKey32::random();

        let wrapped = wrap_file_key(&public, &cfg, &file_key).unwrap();
        assert_eq!(wrapped.len(), 128); // 1024-bit modulus

        let recovered = unwrap_file_key_or_random(&private, &cfg, &wrapped).unwrap();
        assert_eq!(recovered.expose_secret(), file_key.expose_secret());
    }

    #[test]
    fn unwrap_with_wrong_key_yields_random() {
        let (public, _, cfg) = fixture();
        let (_, other_private, _) = fixture();
        let file_key = FileKey32::random();

        let wrapped = wrap_file_key(&public, &cfg, &file_key).unwrap();
        let recovered = unwrap_file_key_or_random(&other_private, &cfg, &wrapped).unwrap();
        assert_ne!(recovered.expose_secret(), file_key.expose_secret());

        // A second unwrap must not reproduce the first stand-in.
        let recovered2 = unwrap_file_key_or_random(&other_private, &cfg, &wrapped).unwrap();
        assert_ne!(recovered.expose_secret(), recovered2.expose_secret());
    }

    #[test]
    fn sign_verify_roundtrip() {
        let (public, private, cfg) = fixture();
        let msg = b"header bytes";

        let sig = sign_header(&private, &cfg, msg).unwrap();
        assert!(verify_header(&public, &cfg, msg, &sig).unwrap());
        assert!(!verify_header(&public, &cfg, b"other bytes", &sig).unwrap());

        let mut bad = sig.clone();
        bad[0] ^= 0x01;
        assert!(!verify_header(&public, &cfg, msg, &bad).unwrap());
        assert!(!verify_header(&public, &cfg, msg, b"short").unwrap());
    }

    #[test]
    fn unknown_sign_algo_rejected() {
        let (_, private, _) = fixture();
        let cfg = CryptoConfig {
            pk_sign_algo: "EMSA4(SHA-3)".to_string(),
            ..CryptoConfig::default()
        };
        assert!(sign_header(&private, &cfg, b"msg").is_err());
    }
}
