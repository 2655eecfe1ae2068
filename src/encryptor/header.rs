//! Two-pass Header₁ assembly and the Header₂ signature.
//!
//! `header1_size` is a field of Header₁ yet equals the full encoded length
//! of Header₁ itself, so the SEQUENCE is encoded twice: pass 1 with a zeroed
//! 4-byte size field to measure, pass 2 with the measured length written
//! into the same fixed-width field. The codec is canonical and the field
//! width never changes, so both passes agree everywhere else.

use crate::aliases::FileKey32;
use crate::consts::{CHACHA_NONCE_SIZE, HEADER1_SIZE_FIELD_LEN};
use crate::crypto::rng::random_vec;
use crate::crypto::wrap;
use crate::der::{self, oid::Oid};
use crate::error::CipherpackError;
use crate::header::PackHeader;
use tracing::debug;

use super::EncryptRequest;

/// Everything the payload pipeline needs once the header is final.
pub(crate) struct BuiltHeaders {
    pub header1: Vec<u8>,
    pub header2: Vec<u8>,
    pub nonce: [u8; CHACHA_NONCE_SIZE],
    /// Wrapped file keys in recipient order; their concatenation is the
    /// AEAD associated data.
    pub wrapped_keys: Vec<Vec<u8>>,
}

struct Header1Fields<'a> {
    req: &'a EncryptRequest<'a>,
    content_size: u64,
    creation_time: u64,
    sym_oid: Oid,
    nonce: &'a [u8],
    host_fingerprint: &'a [u8],
    recipients: &'a [(Vec<u8>, Vec<u8>)],
}

fn encode_header1(fields: &Header1Fields<'_>, size_field: &[u8; HEADER1_SIZE_FIELD_LEN]) -> Vec<u8> {
    let req = fields.req;
    let cfg = req.crypto_cfg;
    der::encode_sequence(|s| {
        s.octet_string(req.package_magic.as_bytes());
        s.octet_string(size_field);
        s.octet_string(req.target_path.as_bytes());
        s.integer(fields.content_size);
        s.integer(fields.creation_time);
        s.octet_string(req.intention.as_bytes());
        s.octet_string(req.payload_version.as_bytes());
        s.octet_string(req.payload_version_parent.as_bytes());
        s.octet_string(cfg.pk_type.as_bytes());
        s.octet_string(cfg.pk_fingerprt_hash_algo.as_bytes());
        s.octet_string(cfg.pk_enc_padding_algo.as_bytes());
        s.octet_string(cfg.pk_enc_hash_algo.as_bytes());
        s.octet_string(cfg.pk_sign_algo.as_bytes());
        s.oid(&fields.sym_oid);
        s.octet_string(fields.nonce);
        s.octet_string(fields.host_fingerprint);
        s.integer(fields.recipients.len() as u64);
        for (fingerprint, wrapped) in fields.recipients {
            s.octet_string(fingerprint);
            s.octet_string(wrapped);
        }
    })
}

/// Wrap the file key for every recipient, emit both headers, and fill the
/// header metadata handed to the listener.
pub(crate) fn build_headers(
    req: &EncryptRequest<'_>,
    content_size: Option<u64>,
    creation_time: u64,
    file_key: &FileKey32,
    header: &mut PackHeader,
) -> Result<BuiltHeaders, CipherpackError> {
    let cfg = req.crypto_cfg;
    let sym_oid = cfg.sym_enc_mac_oid()?;

    let host_fingerprint = req
        .sign_sec_key
        .public_key()
        .fingerprint(&cfg.pk_fingerprt_hash_algo)?;

    let mut recipients = Vec::with_capacity(req.enc_pub_keys.len());
    for key in req.enc_pub_keys {
        let fingerprint = key.fingerprint(&cfg.pk_fingerprt_hash_algo)?;
        let wrapped = wrap::wrap_file_key(key, cfg, file_key)?;
        recipients.push((fingerprint, wrapped));
    }

    let nonce_vec = random_vec(CHACHA_NONCE_SIZE);
    let mut nonce = [0u8; CHACHA_NONCE_SIZE];
    nonce.copy_from_slice(&nonce_vec);

    let fields = Header1Fields {
        req,
        content_size: content_size.unwrap_or(0),
        creation_time,
        sym_oid,
        nonce: &nonce,
        host_fingerprint: &host_fingerprint,
        recipients: &recipients,
    };

    // Pass 1: measure with a zeroed size field.
    let mut size_field = [0u8; HEADER1_SIZE_FIELD_LEN];
    let pass1 = encode_header1(&fields, &size_field);
    let header1_size = pass1.len() as u32;
    size_field.copy_from_slice(&header1_size.to_le_bytes());

    // Pass 2: identical layout, real size.
    let header1 = encode_header1(&fields, &size_field);
    if header1.len() != pass1.len() {
        return Err(CipherpackError::Header(
            "header size changed between encoding passes".to_string(),
        ));
    }
    debug!(header1_size, "header1 encoded");

    let signature = wrap::sign_header(req.sign_sec_key, cfg, &header1)?;
    let header2 = der::encode_sequence(|s| {
        s.octet_string(&signature);
    });
    debug!(
        signature_len = signature.len(),
        header2_size = header2.len(),
        "header1 signed"
    );

    header.target_path = req.target_path.to_string();
    header.content_size = content_size;
    header.creation_time = creation_time;
    header.intention = req.intention.to_string();
    header.payload_version = req.payload_version.to_string();
    header.payload_version_parent = req.payload_version_parent.to_string();
    header.host_key_fingerprint = host_fingerprint;
    header.recipient_fingerprints = recipients.iter().map(|(fp, _)| fp.clone()).collect();

    Ok(BuiltHeaders {
        header1,
        header2,
        nonce,
        wrapped_keys: recipients.into_iter().map(|(_, wrapped)| wrapped).collect(),
    })
}
