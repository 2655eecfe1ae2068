// src/lib.rs

//! # cipherpack
//!
//! Secure packaging format and streaming codec: a payload of arbitrary size
//! is bundled with a self-describing cryptographic envelope so that only
//! holders of a designated recipient private key can decrypt it, and any
//! receiver can verify the envelope was produced by a designated signing
//! host.
//!
//! The per-stream symmetric file key is wrapped with RSA-OAEP for each
//! recipient public key. The wrapped keys, nonce and pack metadata form DER
//! Header₁; Header₂ is the host's signature over the exact Header₁ bytes;
//! the payload follows as one ChaCha20-Poly1305 stream whose associated
//! data is the wrapped-key list, tying every payload byte to the declared
//! recipients.
//!
//! ## Stream layout
//!
//! ```text
//! DER Header 1 {
//!     OctetString  package_magic
//!     OctetString  header1_size            // 4 bytes, little-endian u32
//!     OctetString  target_path
//!     Integer      content_size            // 0 when unknown
//!     Integer      creation_timestamp_sec
//!     OctetString  intention
//!     OctetString  payload_version
//!     OctetString  payload_version_parent
//!     OctetString  pk_type                 // "RSA"
//!     OctetString  pk_fingerprt_hash_algo  // "SHA-256"
//!     OctetString  pk_enc_padding_algo     // "OAEP"
//!     OctetString  pk_enc_hash_algo        // "SHA-256"
//!     OctetString  pk_sign_algo            // "EMSA1(SHA-256)"
//!     ObjectId     sym_enc_mac_oid         // ChaCha20Poly1305
//!     OctetString  nonce
//!     OctetString  fingerprt_host
//!     Integer      encrypted_fkey_count
//!     OctetString  fingerprt_term_1
//!     OctetString  encrypted_fkey_term_1
//!     ...
//! }
//! DER Header 2 {
//!     OctetString  header_sign_host        // signature over Header 1
//! }
//! encrypted payload + 16-byte tag
//! ```
//!
//! `header1_size` equals the total encoded length of the Header₁ SEQUENCE
//! including its tag and length prefix, so a receiver can snoop the first
//! two fields and then pull the exact header from a non-seekable stream.

pub mod aliases;
pub mod config;
pub mod consts;
pub mod crypto;
pub mod decryptor;
pub mod der;
pub mod encryptor;
pub mod error;
pub mod header;
pub mod io;
pub mod listener;

// High-level API — this is what most users import
pub use config::CryptoConfig;
pub use crypto::keys::{generate_keypair, PrivateKey, PublicKey};
pub use decryptor::{check_sign_then_decrypt, DecryptRequest};
pub use encryptor::{encrypt_then_sign, EncryptRequest};
pub use error::CipherpackError;
pub use header::PackHeader;
pub use io::{ByteInStream, ByteInStreamFeed, ByteInStreamFile, ByteInStreamReader};
pub use listener::{CipherpackListener, NoopListener};
