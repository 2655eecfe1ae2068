//! Streaming ChaCha20-Poly1305 (RFC 8439) with update/finish semantics.
//!
//! The payload is one AEAD message of unbounded size, so the one-shot
//! `encrypt`/`decrypt` API is not usable here; this module composes the
//! `chacha20` stream cipher and the `poly1305` MAC the same way the combined
//! cipher does, but feeds them chunk by chunk. Associated data is fixed at
//! construction time (the header binds it before any payload byte exists).
//!
//! Encrypt: `update` transforms chunks in place, `finish` appends the
//! 16-byte tag to the final chunk. Decrypt: a 16-byte window is held back
//! across `update` calls so emitted plaintext can never contain tag bytes;
//! `finish` verifies the tag in constant time.

use crate::aliases::{FileKey32, MacKey32};
use crate::consts::{CHACHA_NONCE_SIZE, TAG_SIZE};
use crate::error::CipherpackError;
use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20::ChaCha20;
use poly1305::universal_hash::{KeyInit, UniversalHash};
use poly1305::{Block, Poly1305};
use secure_gate::{RevealSecret, RevealSecretMut};
use subtle::ConstantTimeEq;

/// Incremental Poly1305 over a byte stream: buffers to 16-byte blocks so
/// arbitrary chunk sizes still MAC as one contiguous message.
struct MacStream {
    mac: Poly1305,
    residue: [u8; TAG_SIZE],
    residue_len: usize,
}

impl MacStream {
    fn new(key: &MacKey32) -> Self {
        Self {
            mac: Poly1305::new(key.expose_secret().into()),
            residue: [0u8; TAG_SIZE],
            residue_len: 0,
        }
    }

    fn absorb(&mut self, mut data: &[u8]) {
        if self.residue_len > 0 {
            let want = TAG_SIZE - self.residue_len;
            let take = want.min(data.len());
            self.residue[self.residue_len..self.residue_len + take]
                .copy_from_slice(&data[..take]);
            self.residue_len += take;
            data = &data[take..];
            if self.residue_len == TAG_SIZE {
                self.mac.update(&[Block::clone_from_slice(&self.residue)]);
                self.residue_len = 0;
            } else {
                return;
            }
        }
        let full = data.len() - data.len() % TAG_SIZE;
        for block in data[..full].chunks_exact(TAG_SIZE) {
            self.mac.update(&[Block::clone_from_slice(block)]);
        }
        let rest = &data[full..];
        self.residue[..rest.len()].copy_from_slice(rest);
        self.residue_len = rest.len();
    }

    /// Zero-pad the pending partial block, per the RFC's pad16().
    fn pad_to_block(&mut self) {
        if self.residue_len > 0 {
            self.residue[self.residue_len..].fill(0);
            self.mac.update(&[Block::clone_from_slice(&self.residue)]);
            self.residue_len = 0;
        }
    }

    fn finalize(mut self, ad_len: u64, ct_len: u64) -> [u8; TAG_SIZE] {
        self.pad_to_block();
        let mut lengths = [0u8; TAG_SIZE];
        lengths[..8].copy_from_slice(&ad_len.to_le_bytes());
        lengths[8..].copy_from_slice(&ct_len.to_le_bytes());
        self.mac.update(&[Block::clone_from_slice(&lengths)]);
        self.mac.finalize().into()
    }
}

/// Shared setup: derive the one-time Poly1305 key from keystream block 0,
/// leave the cipher positioned at block 1, absorb the associated data.
fn init(key: &FileKey32, nonce: &[u8; CHACHA_NONCE_SIZE], ad: &[u8]) -> (ChaCha20, MacStream) {
    let mut cipher = ChaCha20::new(key.expose_secret().into(), nonce.into());
    let mut mac_key = MacKey32::new([0u8; 32]);
    cipher.apply_keystream(mac_key.expose_secret_mut());
    cipher.seek(64u64);

    let mut mac = MacStream::new(&mac_key);
    mac.absorb(ad);
    mac.pad_to_block();
    (cipher, mac)
}

/// Streaming AEAD encryptor.
pub struct AeadEncryptor {
    cipher: ChaCha20,
    mac: MacStream,
    ad_len: u64,
    ct_len: u64,
}

impl AeadEncryptor {
    pub fn new(key: &FileKey32, nonce: &[u8; CHACHA_NONCE_SIZE], ad: &[u8]) -> Self {
        let (cipher, mac) = init(key, nonce, ad);
        Self {
            cipher,
            mac,
            ad_len: ad.len() as u64,
            ct_len: 0,
        }
    }

    /// Encrypt one non-final chunk in place.
    pub fn update(&mut self, chunk: &mut [u8]) {
        self.cipher.apply_keystream(chunk);
        self.mac.absorb(chunk);
        self.ct_len += chunk.len() as u64;
    }

    /// Encrypt the final chunk in place and append the authentication tag.
    pub fn finish(mut self, chunk: &mut Vec<u8>) {
        self.cipher.apply_keystream(chunk);
        self.mac.absorb(chunk);
        self.ct_len += chunk.len() as u64;
        let tag = self.mac.finalize(self.ad_len, self.ct_len);
        chunk.extend_from_slice(&tag);
    }
}

/// Streaming AEAD decryptor.
pub struct AeadDecryptor {
    cipher: ChaCha20,
    mac: MacStream,
    ad_len: u64,
    ct_len: u64,
    // Trailing window of undecrypted input; holds the tag once EOF is known.
    holdback: Vec<u8>,
}

impl AeadDecryptor {
    pub fn new(key: &FileKey32, nonce: &[u8; CHACHA_NONCE_SIZE], ad: &[u8]) -> Self {
        let (cipher, mac) = init(key, nonce, ad);
        Self {
            cipher,
            mac,
            ad_len: ad.len() as u64,
            ct_len: 0,
            holdback: Vec::with_capacity(TAG_SIZE),
        }
    }

    /// Decrypt one non-final chunk. The buffer is rewritten with the
    /// plaintext produced so far; its length may differ from the input by up
    /// to the tag size because of the holdback window.
    pub fn update(&mut self, chunk: &mut Vec<u8>) {
        if !self.holdback.is_empty() {
            let mut combined = std::mem::take(&mut self.holdback);
            combined.append(chunk);
            *chunk = combined;
        }
        if chunk.len() <= TAG_SIZE {
            self.holdback = std::mem::take(chunk);
            return;
        }
        let keep = chunk.len() - TAG_SIZE;
        self.holdback.extend_from_slice(&chunk[keep..]);
        chunk.truncate(keep);
        self.mac.absorb(chunk);
        self.cipher.apply_keystream(chunk);
        self.ct_len += keep as u64;
    }

    /// Decrypt the final chunk and verify the tag, which is the trailing 16
    /// bytes of the stream. A stream shorter than one tag fails.
    pub fn finish(mut self, chunk: &mut Vec<u8>) -> Result<(), CipherpackError> {
        self.update(chunk);
        if self.holdback.len() != TAG_SIZE {
            return Err(CipherpackError::AuthFailure);
        }
        let expected = self.mac.finalize(self.ad_len, self.ct_len);
        if bool::from(expected.ct_eq(&self.holdback)) {
            Ok(())
        } else {
            Err(CipherpackError::AuthFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 8439 §2.8.2 test vector.
    const KEY: &str = "808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9f";
    const NONCE: &str = "070000004041424344454647";
    const AAD: &str = "50515253c0c1c2c3c4c5c6c7";
    const PLAINTEXT: &[u8] = b"Ladies and Gentlemen of the class of '99: \
If I could offer you only one tip for the future, sunscreen would be it.";
    const CIPHERTEXT: &str = "d31a8d34648e60db7b86afbc53ef7ec2a4aded51296e08fea9e2b5a736ee62d6\
3dbea45e8ca9671282fafb69da92728b1a71de0a9e060b2905d6a5b67ecd3b36\
92ddbd7f2d778b8c9803aee328091b58fab324e4fad675945585808b4831d7bc\
3ff4def08e4b7a9de576d26586cec64b6116";
    const TAG: &str = "1ae10b594f09e26a7e902ecbd0600691";

    fn vector() -> (FileKey32, [u8; 12], Vec<u8>, Vec<u8>) {
        let mut key = [0u8; 32];
        key.copy_from_slice(&hex::decode(KEY).unwrap());
        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&hex::decode(NONCE).unwrap());
        let aad = hex::decode(AAD).unwrap();
        let mut expected = hex::decode(CIPHERTEXT).unwrap();
        expected.extend_from_slice(&hex::decode(TAG).unwrap());
        (FileKey32::new(key), nonce, aad, expected)
    }

    fn encrypt_chunked(chunk_size: usize) -> Vec<u8> {
        let (key, nonce, aad, _) = vector();
        let mut enc = AeadEncryptor::new(&key, &nonce, &aad);
        let mut out = Vec::new();
        let chunks: Vec<&[u8]> = PLAINTEXT.chunks(chunk_size).collect();
        let (last, body) = chunks.split_last().unwrap();
        for chunk in body {
            let mut buf = chunk.to_vec();
            enc.update(&mut buf);
            out.extend_from_slice(&buf);
        }
        let mut buf = last.to_vec();
        enc.finish(&mut buf);
        out.extend_from_slice(&buf);
        out
    }

    #[test]
    fn rfc8439_vector_one_shot() {
        let (key, nonce, aad, expected) = vector();
        let enc = AeadEncryptor::new(&key, &nonce, &aad);
        let mut buf = PLAINTEXT.to_vec();
        enc.finish(&mut buf);
        assert_eq!(hex::encode(&buf), hex::encode(&expected));
    }

    #[test]
    fn rfc8439_vector_chunked() {
        let (_, _, _, expected) = vector();
        for chunk_size in [1, 7, 16, 33, 64, 113] {
            assert_eq!(
                encrypt_chunked(chunk_size),
                expected,
                "chunk size {chunk_size}"
            );
        }
    }

    #[test]
    fn decrypt_chunked_roundtrip() {
        let (key, nonce, aad, ciphertext) = vector();
        for chunk_size in [1, 5, 16, 30, 200] {
            let mut dec = AeadDecryptor::new(&key, &nonce, &aad);
            let mut out = Vec::new();
            let chunks: Vec<&[u8]> = ciphertext.chunks(chunk_size).collect();
            let (last, body) = chunks.split_last().unwrap();
            for chunk in body {
                let mut buf = chunk.to_vec();
                dec.update(&mut buf);
                out.extend_from_slice(&buf);
            }
            let mut buf = last.to_vec();
            dec.finish(&mut buf).unwrap();
            out.extend_from_slice(&buf);
            assert_eq!(out, PLAINTEXT, "chunk size {chunk_size}");
        }
    }

    #[test]
    fn empty_message_roundtrip() {
        let key = FileKey32::new([7u8; 32]);
        let nonce = [9u8; 12];

        let enc = AeadEncryptor::new(&key, &nonce, b"ad");
        let mut buf = Vec::new();
        enc.finish(&mut buf);
        assert_eq!(buf.len(), TAG_SIZE);

        let dec = AeadDecryptor::new(&key, &nonce, b"ad");
        let mut out = buf.clone();
        dec.finish(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let (key, nonce, aad, mut ciphertext) = vector();
        let mid = ciphertext.len() / 2;
        ciphertext[mid] ^= 0x01;

        let dec = AeadDecryptor::new(&key, &nonce, &aad);
        let mut buf = ciphertext;
        assert!(matches!(
            dec.finish(&mut buf),
            Err(CipherpackError::AuthFailure)
        ));
    }

    #[test]
    fn wrong_associated_data_fails() {
        let (key, nonce, _, ciphertext) = vector();
        let dec = AeadDecryptor::new(&key, &nonce, b"different ad");
        let mut buf = ciphertext;
        assert!(dec.finish(&mut buf).is_err());
    }

    #[test]
    fn truncated_stream_fails() {
        let key = FileKey32::new([1u8; 32]);
        let nonce = [2u8; 12];
        let dec = AeadDecryptor::new(&key, &nonce, b"");
        let mut buf = vec![0u8; TAG_SIZE - 1];
        assert!(matches!(
            dec.finish(&mut buf),
            Err(CipherpackError::AuthFailure)
        ));
    }
}
