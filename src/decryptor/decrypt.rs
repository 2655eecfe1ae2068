//! src/decryptor/decrypt.rs
//! The `check_sign_then_decrypt` orchestrator.

use crate::crypto::aead::AeadDecryptor;
use crate::crypto::keys::PublicKey;
use crate::crypto::wrap;
use crate::error::CipherpackError;
use crate::header::PackHeader;
use crate::io::{ByteInStream, DestinationSink};
use crate::listener::CipherpackListener;
use tracing::debug;

use super::read::{
    parse_header1, parse_header1_legacy, read_header1, read_header2, validate_algorithms,
    ParsedHeader1,
};
use super::stream::decrypt_payload;
use super::DecryptRequest;

/// Check the cipherpack signature of the source, then decrypt the payload.
///
/// Header₁ is parsed strictly, its signature verified against the trusted
/// host key named by the header's host fingerprint, and every algorithm
/// identifier cross-checked against the expected configuration, all before
/// the file key is unwrapped or any payload byte is emitted.
///
/// On success the returned [`PackHeader`] reports `is_valid()` and names the
/// recipient entry that unwrapped the file key. Every failure is also
/// reported through `notify_error` followed by `notify_end(success=false)`,
/// with any partial destination file removed.
pub fn check_sign_then_decrypt(
    req: &DecryptRequest<'_>,
    source: &mut dyn ByteInStream,
    listener: &mut dyn CipherpackListener,
) -> Result<PackHeader, CipherpackError> {
    let mut header = PackHeader::new(req.expected_cfg.clone());
    match decrypt_impl(req, source, listener, &mut header) {
        Ok(()) => {
            header.set_valid();
            listener.notify_end(true, &header, true);
            Ok(header)
        }
        Err(e) => {
            listener.notify_error(true, &e.to_string());
            listener.notify_end(true, &header, false);
            Err(e)
        }
    }
}

fn decrypt_impl(
    req: &DecryptRequest<'_>,
    source: &mut dyn ByteInStream,
    listener: &mut dyn CipherpackListener,
    header: &mut PackHeader,
) -> Result<(), CipherpackError> {
    req.expected_cfg.validate()?;
    if req.sign_pub_keys.is_empty() {
        return Err(CipherpackError::Crypto(
            "at least one trusted host public key is required".to_string(),
        ));
    }
    if req.package_magic.is_empty() {
        return Err(CipherpackError::Header("empty package magic".to_string()));
    }

    let mut sink = DestinationSink::create(req.destination, req.overwrite)?;
    match decrypt_to_sink(req, source, listener, header, &mut sink) {
        Ok(()) => sink.commit(),
        Err(e) => {
            sink.discard();
            Err(e)
        }
    }
}

/// Pick the trusted host key and verify the Header₁ signature with it.
fn verify_host_signature(
    req: &DecryptRequest<'_>,
    parsed: &ParsedHeader1,
    signature: &[u8],
) -> Result<(), CipherpackError> {
    match &parsed.host_fingerprint {
        Some(host_fp) => {
            let mut host_key: Option<&PublicKey> = None;
            for key in req.sign_pub_keys {
                if key.fingerprint(&req.expected_cfg.pk_fingerprt_hash_algo)? == *host_fp {
                    host_key = Some(key);
                    break;
                }
            }
            let host_key = host_key.ok_or_else(|| {
                CipherpackError::SignatureMismatch(format!(
                    "no trusted host key matches fingerprint {}",
                    hex::encode(host_fp)
                ))
            })?;
            if !wrap::verify_header(host_key, req.expected_cfg, &parsed.raw, signature)? {
                return Err(CipherpackError::SignatureMismatch(format!(
                    "header signature of {} bytes did not verify",
                    parsed.raw.len()
                )));
            }
            Ok(())
        }
        // The legacy layout names no host key; try each trusted key.
        None => {
            for key in req.sign_pub_keys {
                if wrap::verify_header(key, req.expected_cfg, &parsed.raw, signature)? {
                    return Ok(());
                }
            }
            Err(CipherpackError::SignatureMismatch(
                "header signature did not verify under any trusted host key".to_string(),
            ))
        }
    }
}

fn decrypt_to_sink(
    req: &DecryptRequest<'_>,
    source: &mut dyn ByteInStream,
    listener: &mut dyn CipherpackListener,
    header: &mut PackHeader,
    sink: &mut DestinationSink,
) -> Result<(), CipherpackError> {
    let h1 = read_header1(source, req.package_magic)?;
    let parsed = match parse_header1(&h1, req.package_magic) {
        Ok(parsed) => parsed,
        Err(e) if req.accept_legacy_header => {
            debug!("full header parse failed ({e}), trying legacy layout");
            parse_header1_legacy(&h1, req.package_magic)?
        }
        Err(e) => return Err(e),
    };
    let signature = read_header2(source)?;
    debug!(
        source = source.id(),
        header1_size = parsed.raw.len(),
        signature_len = signature.len(),
        recipients = parsed.recipients.len(),
        "headers read"
    );

    verify_host_signature(req, &parsed, &signature)?;
    validate_algorithms(&parsed, req.expected_cfg)?;

    header.target_path = parsed.target_path.clone();
    header.content_size = parsed.content_size;
    header.creation_time = parsed.creation_time;
    header.intention = parsed.intention.clone();
    header.payload_version = parsed.payload_version.clone();
    header.payload_version_parent = parsed.payload_version_parent.clone();
    header.crypto_cfg = parsed.crypto_cfg.clone();
    header.host_key_fingerprint = parsed.host_fingerprint.clone().unwrap_or_default();
    header.recipient_fingerprints = parsed
        .recipients
        .iter()
        .filter_map(|r| r.fingerprint.clone())
        .collect();

    let send_content = listener.send_content(true);
    listener.notify_header(true, header, true);

    let dec_fp = req
        .dec_sec_key
        .public_key()
        .fingerprint(&req.expected_cfg.pk_fingerprt_hash_algo)?;
    let index = parsed
        .recipients
        .iter()
        .position(|r| match &r.fingerprint {
            Some(fp) => *fp == dec_fp,
            None => true,
        })
        .ok_or_else(|| {
            CipherpackError::NoRecipientMatch(format!(
                "decryption key fingerprint {} is not listed in the header",
                hex::encode(&dec_fp)
            ))
        })?;
    header.used_recipient_index = Some(index);

    let file_key = wrap::unwrap_file_key_or_random(
        req.dec_sec_key,
        req.expected_cfg,
        &parsed.recipients[index].wrapped_key,
    )?;
    let nonce: [u8; crate::consts::CHACHA_NONCE_SIZE] =
        parsed.nonce.as_slice().try_into().map_err(|_| {
            CipherpackError::Header(format!(
                "nonce of {} bytes does not fit the configured cipher",
                parsed.nonce.len()
            ))
        })?;

    let ad: Vec<u8> = parsed
        .recipients
        .iter()
        .flat_map(|r| r.wrapped_key.iter().copied())
        .collect();
    let aead = AeadDecryptor::new(&file_key, &nonce, &ad);

    let plaintext_bytes = decrypt_payload(
        source,
        sink,
        listener,
        aead,
        send_content,
        parsed.content_size.unwrap_or(0),
    )?;
    debug!(
        ciphertext_bytes = source.bytes_read(),
        plaintext_bytes, "payload decrypted"
    );

    if source.error() {
        return Err(CipherpackError::Io(std::io::Error::other(
            "source stream reported failure",
        )));
    }
    Ok(())
}
