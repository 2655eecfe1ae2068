//! tests/common.rs
//! Shared fixtures: RSA test keys (generated once per test binary), a
//! recording listener, and pack/unpack helpers.

// Shared across multiple test binaries; not every binary uses every item.
#![allow(dead_code)]

use cipherpack::{
    check_sign_then_decrypt, encrypt_then_sign, generate_keypair, ByteInStreamReader,
    CipherpackError, CipherpackListener, CryptoConfig, DecryptRequest, EncryptRequest,
    PackHeader, PrivateKey, PublicKey,
};
use std::io::Cursor;
use std::sync::OnceLock;

/// Application tag used by every test pack.
pub const TEST_MAGIC: &str = "CIPHERPACK_TEST";

/// Small keys keep the suite fast; size does not change the header logic.
pub const TEST_KEY_BITS: usize = 1024;

pub struct TestKeys {
    pub host_pub: PublicKey,
    pub host_sec: PrivateKey,
    pub recipients: Vec<(PublicKey, PrivateKey)>,
    pub outsider_pub: PublicKey,
    pub outsider_sec: PrivateKey,
}

static KEYS: OnceLock<TestKeys> = OnceLock::new();

/// Generated once per test binary; RSA keygen dominates test time otherwise.
pub fn test_keys() -> &'static TestKeys {
    KEYS.get_or_init(|| {
        let (host_pub, host_sec) = generate_keypair(TEST_KEY_BITS).unwrap();
        let recipients = (0..3)
            .map(|_| generate_keypair(TEST_KEY_BITS).unwrap())
            .collect();
        let (outsider_pub, outsider_sec) = generate_keypair(TEST_KEY_BITS).unwrap();
        TestKeys {
            host_pub,
            host_sec,
            recipients,
            outsider_pub,
            outsider_sec,
        }
    })
}

/// Every listener callback, in dispatch order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SendContent { decrypt: bool },
    Header { decrypt: bool, verified: bool },
    Progress { decrypt: bool, content_size: u64, bytes_processed: u64 },
    Content { decrypt: bool, is_header: bool, len: usize, is_final: bool },
    Error { decrypt: bool },
    End { decrypt: bool, success: bool },
}

#[derive(Default)]
pub struct RecordingListener {
    pub events: Vec<Event>,
    pub want_content: bool,
    /// Return false from `content_processed` after this many payload chunks.
    pub abort_after_chunks: Option<usize>,
    /// Concatenation of every span passed to `content_processed`.
    pub captured: Vec<u8>,
    pub last_error: Option<String>,
    payload_chunks: usize,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capturing() -> Self {
        Self {
            want_content: true,
            ..Self::default()
        }
    }

    pub fn header_events(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Header { .. }))
            .count()
    }

    pub fn progress_events(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Progress { .. }))
            .count()
    }
}

impl CipherpackListener for RecordingListener {
    fn notify_error(&mut self, decrypt_mode: bool, msg: &str) {
        self.last_error = Some(msg.to_string());
        self.events.push(Event::Error {
            decrypt: decrypt_mode,
        });
    }

    fn notify_header(&mut self, decrypt_mode: bool, _header: &PackHeader, verified: bool) {
        self.events.push(Event::Header {
            decrypt: decrypt_mode,
            verified,
        });
    }

    fn notify_progress(&mut self, decrypt_mode: bool, content_size: u64, bytes_processed: u64) {
        self.events.push(Event::Progress {
            decrypt: decrypt_mode,
            content_size,
            bytes_processed,
        });
    }

    fn notify_end(&mut self, decrypt_mode: bool, _header: &PackHeader, success: bool) {
        self.events.push(Event::End {
            decrypt: decrypt_mode,
            success,
        });
    }

    fn send_content(&mut self, decrypt_mode: bool) -> bool {
        self.events.push(Event::SendContent {
            decrypt: decrypt_mode,
        });
        self.want_content
    }

    fn content_processed(
        &mut self,
        decrypt_mode: bool,
        is_header: bool,
        data: &[u8],
        is_final: bool,
    ) -> bool {
        self.events.push(Event::Content {
            decrypt: decrypt_mode,
            is_header,
            len: data.len(),
            is_final,
        });
        self.captured.extend_from_slice(data);
        if !is_header {
            self.payload_chunks += 1;
            if let Some(limit) = self.abort_after_chunks {
                if self.payload_chunks > limit {
                    return false;
                }
            }
        }
        true
    }
}

/// Encrypt `plaintext` for `recipients`, returning the complete pack bytes
/// captured through the listener (no destination file).
#[allow(dead_code)]
pub fn encrypt_to_vec(
    recipients: &[PublicKey],
    host_sec: &PrivateKey,
    plaintext: &[u8],
) -> Vec<u8> {
    let cfg = CryptoConfig::default();
    let req = EncryptRequest {
        crypto_cfg: &cfg,
        package_magic: TEST_MAGIC,
        enc_pub_keys: recipients,
        sign_sec_key: host_sec,
        target_path: "data.bin",
        intention: "test",
        payload_version: "1",
        payload_version_parent: "0",
        destination: None,
        overwrite: false,
    };
    let mut source = ByteInStreamReader::new("mem", Cursor::new(plaintext.to_vec()))
        .with_content_size(plaintext.len() as u64);
    let mut listener = RecordingListener::capturing();
    encrypt_then_sign(&req, &mut source, &mut listener).unwrap();
    listener.captured
}

/// Decrypt a pack captured in memory, returning the header and plaintext.
#[allow(dead_code)]
pub fn decrypt_to_vec(
    sign_pub_keys: &[PublicKey],
    dec_sec_key: &PrivateKey,
    pack: &[u8],
) -> Result<(PackHeader, Vec<u8>), CipherpackError> {
    let cfg = CryptoConfig::default();
    let req = DecryptRequest {
        expected_cfg: &cfg,
        package_magic: TEST_MAGIC,
        sign_pub_keys,
        dec_sec_key,
        accept_legacy_header: false,
        destination: None,
        overwrite: false,
    };
    let mut source = ByteInStreamReader::new("mem", Cursor::new(pack.to_vec()));
    let mut listener = RecordingListener::capturing();
    let header = check_sign_then_decrypt(&req, &mut source, &mut listener)?;
    Ok((header, listener.captured))
}

/// Total byte length of Header₁ + Header₂ at the front of a pack.
#[allow(dead_code)]
pub fn headers_len(pack: &[u8]) -> usize {
    let (_, len1, hdr1) = cipherpack::der::peek_header(pack).unwrap();
    let h1_total = len1 + hdr1;
    let (_, len2, hdr2) = cipherpack::der::peek_header(&pack[h1_total..]).unwrap();
    h1_total + len2 + hdr2
}
