//! Header reading and strict parsing.
//!
//! The source cannot rewind, so the peek phase keeps every byte it pulls:
//! outer SEQUENCE framing, `package_magic` and the 4-byte `header1_size`
//! are parsed incrementally, then the remainder of Header₁ is read into the
//! same buffer and the whole thing is re-parsed strictly. Those exact bytes
//! are the signature input.

use crate::config::CryptoConfig;
use crate::consts::{HEADER1_SIZE_FIELD_LEN, MAX_HEADER1_SIZE, MAX_MAGIC_SIZE};
use crate::der::oid::Oid;
use crate::der::{DecodeError, DerDecoder, TAG_OCTET_STRING, TAG_SEQUENCE};
use crate::error::CipherpackError;
use crate::io::ByteInStream;
use tracing::debug;

/// Sanity cap on the declared wrapped-key count.
const MAX_RECIPIENTS: u64 = 65_536;

pub(crate) struct RecipientEntry {
    /// Absent in the legacy single-recipient layout.
    pub fingerprint: Option<Vec<u8>>,
    pub wrapped_key: Vec<u8>,
}

/// Fully parsed Header₁ plus the exact bytes it was parsed from.
pub(crate) struct ParsedHeader1 {
    pub raw: Vec<u8>,
    pub target_path: String,
    pub content_size: Option<u64>,
    pub creation_time: u64,
    pub intention: String,
    pub payload_version: String,
    pub payload_version_parent: String,
    pub crypto_cfg: CryptoConfig,
    pub sym_oid: Oid,
    pub nonce: Vec<u8>,
    /// Absent in the legacy layout, which names no host key.
    pub host_fingerprint: Option<Vec<u8>>,
    pub recipients: Vec<RecipientEntry>,
}

fn read_exact_stream(
    source: &mut dyn ByteInStream,
    buf: &mut [u8],
) -> Result<(), CipherpackError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..])?;
        if n == 0 {
            return Err(DecodeError::Truncated.into());
        }
        filled += n;
    }
    Ok(())
}

/// Read one DER tag + definite length from the stream, appending the raw
/// bytes to `raw`. Applies the same canonicality rules as the buffer
/// decoder.
fn read_tlv_prefix(
    source: &mut dyn ByteInStream,
    raw: &mut Vec<u8>,
) -> Result<(u8, usize), CipherpackError> {
    let mut two = [0u8; 2];
    read_exact_stream(source, &mut two)?;
    raw.extend_from_slice(&two);
    let (tag, first) = (two[0], two[1]);

    if first < 0x80 {
        return Ok((tag, first as usize));
    }
    if first == 0x80 {
        return Err(DecodeError::NonCanonical("indefinite length").into());
    }
    let n = (first & 0x7f) as usize;
    if n > 4 {
        return Err(DecodeError::LengthOverflow.into());
    }
    let mut len_bytes = [0u8; 4];
    read_exact_stream(source, &mut len_bytes[..n])?;
    raw.extend_from_slice(&len_bytes[..n]);
    let bytes = &len_bytes[..n];
    if bytes[0] == 0 {
        return Err(DecodeError::NonCanonical("length not minimal").into());
    }
    let mut len = 0usize;
    for &b in bytes {
        len = (len << 8) | b as usize;
    }
    if len < 0x80 {
        return Err(DecodeError::NonCanonical("length not minimal").into());
    }
    Ok((tag, len))
}

fn expect_tag(found: u8, expected: u8) -> Result<(), CipherpackError> {
    if found == expected {
        Ok(())
    } else {
        Err(DecodeError::TagMismatch { expected, found }.into())
    }
}

/// Peek-parse `package_magic` and `header1_size`, then read the rest of
/// Header₁. Returns the complete raw Header₁ bytes (the signature input).
pub(crate) fn read_header1(
    source: &mut dyn ByteInStream,
    expected_magic: &str,
) -> Result<Vec<u8>, CipherpackError> {
    let mut raw = Vec::new();

    let (tag, _) = read_tlv_prefix(source, &mut raw)?;
    expect_tag(tag, TAG_SEQUENCE)?;

    let (tag, magic_len) = read_tlv_prefix(source, &mut raw)?;
    expect_tag(tag, TAG_OCTET_STRING)?;
    if magic_len > MAX_MAGIC_SIZE {
        return Err(CipherpackError::Header(format!(
            "package magic of {magic_len} bytes exceeds the {MAX_MAGIC_SIZE}-byte limit"
        )));
    }
    let start = raw.len();
    raw.resize(start + magic_len, 0);
    read_exact_stream(source, &mut raw[start..])?;
    if &raw[start..] != expected_magic.as_bytes() {
        return Err(CipherpackError::Header(format!(
            "expected package magic {expected_magic}, got {}",
            String::from_utf8_lossy(&raw[start..])
        )));
    }

    let (tag, size_len) = read_tlv_prefix(source, &mut raw)?;
    expect_tag(tag, TAG_OCTET_STRING)?;
    if size_len != HEADER1_SIZE_FIELD_LEN {
        return Err(CipherpackError::Header(format!(
            "expected {HEADER1_SIZE_FIELD_LEN}-byte header1_size element, got {size_len}"
        )));
    }
    let start = raw.len();
    raw.resize(start + HEADER1_SIZE_FIELD_LEN, 0);
    read_exact_stream(source, &mut raw[start..])?;
    let header1_size = u32::from_le_bytes(raw[start..].try_into().expect("4 bytes"));
    debug!(header1_size, "header1 size snooped");

    if header1_size > MAX_HEADER1_SIZE || (header1_size as usize) <= raw.len() {
        return Err(CipherpackError::Header(format!(
            "implausible header1_size {header1_size}"
        )));
    }

    let start = raw.len();
    raw.resize(header1_size as usize, 0);
    read_exact_stream(source, &mut raw[start..])?;
    Ok(raw)
}

/// Parse Header₂ and extract the host signature. The payload follows
/// immediately, so exactly the SEQUENCE bytes are consumed.
pub(crate) fn read_header2(
    source: &mut dyn ByteInStream,
) -> Result<Vec<u8>, CipherpackError> {
    let mut raw = Vec::new();
    let (tag, len) = read_tlv_prefix(source, &mut raw)?;
    expect_tag(tag, TAG_SEQUENCE)?;
    if len > MAX_HEADER1_SIZE as usize {
        return Err(CipherpackError::Header(format!(
            "implausible header2 size {len}"
        )));
    }
    let mut contents = vec![0u8; len];
    read_exact_stream(source, &mut contents)?;

    let mut dec = DerDecoder::new(&contents);
    let signature = dec.octet_string()?.to_vec();
    dec.finish()?;
    if signature.is_empty() {
        return Err(CipherpackError::Header("empty header signature".to_string()));
    }
    Ok(signature)
}

fn utf8_field(bytes: &[u8], what: &str) -> Result<String, CipherpackError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| CipherpackError::Header(format!("{what} is not valid UTF-8")))
}

/// Strict parse of the full Header₁ layout.
pub(crate) fn parse_header1(
    h1: &[u8],
    expected_magic: &str,
) -> Result<ParsedHeader1, CipherpackError> {
    let mut top = DerDecoder::new(h1);
    let mut seq = top.sequence()?;
    top.finish()?;

    let magic = seq.octet_string()?;
    if magic != expected_magic.as_bytes() {
        return Err(CipherpackError::Header(format!(
            "expected package magic {expected_magic}, got {}",
            String::from_utf8_lossy(magic)
        )));
    }
    check_embedded_size(seq.octet_string()?, h1.len())?;

    let target_path = utf8_field(seq.octet_string()?, "target_path")?;
    let content_size = match seq.integer()? {
        0 => None,
        n => Some(n),
    };
    let creation_time = seq.integer()?;
    let intention = utf8_field(seq.octet_string()?, "intention")?;
    let payload_version = utf8_field(seq.octet_string()?, "payload_version")?;
    let payload_version_parent = utf8_field(seq.octet_string()?, "payload_version_parent")?;

    let pk_type = utf8_field(seq.octet_string()?, "pk_type")?;
    let pk_fingerprt_hash_algo = utf8_field(seq.octet_string()?, "pk_fingerprt_hash_algo")?;
    let pk_enc_padding_algo = utf8_field(seq.octet_string()?, "pk_enc_padding_algo")?;
    let pk_enc_hash_algo = utf8_field(seq.octet_string()?, "pk_enc_hash_algo")?;
    let pk_sign_algo = utf8_field(seq.octet_string()?, "pk_sign_algo")?;
    let sym_oid = seq.oid()?;

    let nonce = seq.octet_string()?.to_vec();
    let host_fingerprint = seq.octet_string()?.to_vec();
    if host_fingerprint.is_empty() {
        return Err(CipherpackError::Header("empty host fingerprint".to_string()));
    }

    let count = seq.integer()?;
    if count == 0 {
        return Err(CipherpackError::Header("header names no recipients".to_string()));
    }
    if count > MAX_RECIPIENTS {
        return Err(CipherpackError::Header(format!(
            "implausible recipient count {count}"
        )));
    }
    let mut recipients = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let fingerprint = seq.octet_string()?.to_vec();
        let wrapped_key = seq.octet_string()?.to_vec();
        recipients.push(RecipientEntry {
            fingerprint: Some(fingerprint),
            wrapped_key,
        });
    }
    seq.finish()?;

    let sym_enc_mac_algo = sym_oid
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| sym_oid.to_string());

    Ok(ParsedHeader1 {
        raw: h1.to_vec(),
        target_path,
        content_size,
        creation_time,
        intention,
        payload_version,
        payload_version_parent,
        crypto_cfg: CryptoConfig {
            pk_type,
            pk_fingerprt_hash_algo,
            pk_enc_padding_algo,
            pk_enc_hash_algo,
            pk_sign_algo,
            sym_enc_mac_algo,
        },
        sym_oid,
        nonce,
        host_fingerprint: Some(host_fingerprint),
        recipients,
    })
}

/// Parse the reduced header layout of early producers: single wrapped key,
/// no fingerprints, and the padding carried as an AlgorithmIdentifier whose
/// parameters embed the padding hash.
pub(crate) fn parse_header1_legacy(
    h1: &[u8],
    expected_magic: &str,
) -> Result<ParsedHeader1, CipherpackError> {
    let mut top = DerDecoder::new(h1);
    let mut seq = top.sequence()?;
    top.finish()?;

    let magic = seq.octet_string()?;
    if magic != expected_magic.as_bytes() {
        return Err(CipherpackError::Header(format!(
            "expected package magic {expected_magic}, got {}",
            String::from_utf8_lossy(magic)
        )));
    }
    check_embedded_size(seq.octet_string()?, h1.len())?;

    let target_path = utf8_field(seq.octet_string()?, "target_path")?;
    let payload_version = seq.integer()?.to_string();
    let payload_version_parent = seq.integer()?.to_string();
    let pk_sign_algo = utf8_field(seq.octet_string()?, "pk_sign_algo")?;
    let pk_alg_id = seq.algorithm_identifier()?;
    let sym_oid = seq.oid()?;
    let wrapped_key = seq.octet_string()?.to_vec();
    let nonce = seq.octet_string()?.to_vec();
    seq.finish()?;

    // The padding combination is named by the AlgorithmIdentifier's OID,
    // e.g. "RSA/OAEP"; its parameters hold the padding hash identifier.
    let combo = pk_alg_id.oid.name().ok_or_else(|| {
        CipherpackError::AlgorithmMismatch(format!(
            "unknown encryption padding OID {}",
            pk_alg_id.oid
        ))
    })?;
    let (pk_type, pk_enc_padding_algo) = combo.split_once('/').ok_or_else(|| {
        CipherpackError::AlgorithmMismatch(format!(
            "{combo} is not an encryption/padding combination"
        ))
    })?;

    let mut params = DerDecoder::new(&pk_alg_id.parameters);
    let hash_id = params.algorithm_identifier()?;
    params.finish()?;
    let pk_enc_hash_algo = hash_id.oid.name().ok_or_else(|| {
        CipherpackError::AlgorithmMismatch(format!(
            "unknown padding hash OID {}",
            hash_id.oid
        ))
    })?;
    if !hash_id.parameters.is_empty() {
        return Err(CipherpackError::AlgorithmMismatch(format!(
            "unexpected {pk_enc_hash_algo} parameters in padding identifier"
        )));
    }

    let sym_enc_mac_algo = sym_oid
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| sym_oid.to_string());

    Ok(ParsedHeader1 {
        raw: h1.to_vec(),
        target_path,
        content_size: None,
        creation_time: 0,
        intention: String::new(),
        payload_version,
        payload_version_parent,
        crypto_cfg: CryptoConfig {
            pk_type: pk_type.to_string(),
            // the legacy layout binds no fingerprints
            pk_fingerprt_hash_algo: String::new(),
            pk_enc_padding_algo: pk_enc_padding_algo.to_string(),
            pk_enc_hash_algo: pk_enc_hash_algo.to_string(),
            pk_sign_algo,
            sym_enc_mac_algo,
        },
        sym_oid,
        nonce,
        host_fingerprint: None,
        recipients: vec![RecipientEntry {
            fingerprint: None,
            wrapped_key,
        }],
    })
}

fn check_embedded_size(size_bytes: &[u8], actual: usize) -> Result<(), CipherpackError> {
    if size_bytes.len() != HEADER1_SIZE_FIELD_LEN {
        return Err(CipherpackError::Header(format!(
            "expected {HEADER1_SIZE_FIELD_LEN}-byte header1_size element, got {}",
            size_bytes.len()
        )));
    }
    let embedded = u32::from_le_bytes(size_bytes.try_into().expect("4 bytes"));
    if embedded as usize != actual {
        return Err(CipherpackError::Header(format!(
            "header1_size {embedded} disagrees with actual header length {actual}"
        )));
    }
    Ok(())
}

/// Cross-check every header algorithm identifier against the expected
/// configuration. Any divergence is fatal.
pub(crate) fn validate_algorithms(
    parsed: &ParsedHeader1,
    expected: &CryptoConfig,
) -> Result<(), CipherpackError> {
    let cfg = &parsed.crypto_cfg;
    let mut checks = vec![
        ("pk_type", &cfg.pk_type, &expected.pk_type),
        (
            "pk_enc_padding_algo",
            &cfg.pk_enc_padding_algo,
            &expected.pk_enc_padding_algo,
        ),
        (
            "pk_enc_hash_algo",
            &cfg.pk_enc_hash_algo,
            &expected.pk_enc_hash_algo,
        ),
        ("pk_sign_algo", &cfg.pk_sign_algo, &expected.pk_sign_algo),
    ];
    if parsed.host_fingerprint.is_some() {
        checks.push((
            "pk_fingerprt_hash_algo",
            &cfg.pk_fingerprt_hash_algo,
            &expected.pk_fingerprt_hash_algo,
        ));
    }
    for (name, got, want) in checks {
        if got != want {
            return Err(CipherpackError::AlgorithmMismatch(format!(
                "{name}: expected {want}, got {got}"
            )));
        }
    }

    let expected_oid = expected.sym_enc_mac_oid()?;
    if parsed.sym_oid != expected_oid {
        return Err(CipherpackError::AlgorithmMismatch(format!(
            "cipher: expected {} ({expected_oid}), got {}",
            expected.sym_enc_mac_algo, parsed.sym_oid
        )));
    }
    Ok(())
}
