//! src/encryptor/encrypt.rs
//! The `encrypt_then_sign` orchestrator.

use crate::aliases::FileKey32;
use crate::crypto::aead::AeadEncryptor;
use crate::crypto::rng::SecureRandomExt;
use crate::error::CipherpackError;
use crate::header::PackHeader;
use crate::io::{ByteInStream, DestinationSink};
use crate::listener::CipherpackListener;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use super::header::build_headers;
use super::stream::encrypt_payload;
use super::EncryptRequest;

/// Encrypt then sign the source, producing a cipherpack stream.
///
/// The file key is wrapped for every recipient public key; Header₁ carries
/// the wrapped keys and is signed with the host key into Header₂; the
/// payload follows as one AEAD stream bound to the wrapped-key list.
///
/// On success the returned [`PackHeader`] reports `is_valid()`. Every
/// failure is also reported through `notify_error` followed by
/// `notify_end(success=false)`, with any partial destination file removed.
pub fn encrypt_then_sign(
    req: &EncryptRequest<'_>,
    source: &mut dyn ByteInStream,
    listener: &mut dyn CipherpackListener,
) -> Result<PackHeader, CipherpackError> {
    let mut header = PackHeader::new(req.crypto_cfg.clone());
    match encrypt_impl(req, source, listener, &mut header) {
        Ok(()) => {
            header.set_valid();
            listener.notify_end(false, &header, true);
            Ok(header)
        }
        Err(e) => {
            listener.notify_error(false, &e.to_string());
            listener.notify_end(false, &header, false);
            Err(e)
        }
    }
}

fn encrypt_impl(
    req: &EncryptRequest<'_>,
    source: &mut dyn ByteInStream,
    listener: &mut dyn CipherpackListener,
    header: &mut PackHeader,
) -> Result<(), CipherpackError> {
    req.crypto_cfg.validate()?;
    if req.enc_pub_keys.is_empty() {
        return Err(CipherpackError::Crypto(
            "at least one recipient public key is required".to_string(),
        ));
    }
    if req.package_magic.is_empty() {
        return Err(CipherpackError::Header("empty package magic".to_string()));
    }

    // Destination checks come before any cryptographic work.
    let mut sink = DestinationSink::create(req.destination, req.overwrite)?;
    match encrypt_to_sink(req, source, listener, header, &mut sink) {
        Ok(()) => sink.commit(),
        Err(e) => {
            sink.discard();
            Err(e)
        }
    }
}

fn encrypt_to_sink(
    req: &EncryptRequest<'_>,
    source: &mut dyn ByteInStream,
    listener: &mut dyn CipherpackListener,
    header: &mut PackHeader,
    sink: &mut DestinationSink,
) -> Result<(), CipherpackError> {
    let creation_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| CipherpackError::Crypto(format!("system clock error: {e}")))?
        .as_secs();
    let content_size = source.content_size();

    let file_key = FileKey32::random();
    let built = build_headers(req, content_size, creation_time, &file_key, header)?;

    let send_content = listener.send_content(false);

    sink.write_all(&built.header1)?;
    sink.write_all(&built.header2)?;
    debug!(
        source = source.id(),
        header_bytes = built.header1.len() + built.header2.len(),
        recipients = built.wrapped_keys.len(),
        "headers emitted"
    );

    if send_content {
        let mut header_bytes =
            Vec::with_capacity(built.header1.len() + built.header2.len());
        header_bytes.extend_from_slice(&built.header1);
        header_bytes.extend_from_slice(&built.header2);
        if !listener.content_processed(false, true, &header_bytes, false) {
            return Err(CipherpackError::ListenerAbort);
        }
    }
    listener.notify_header(false, header, true);

    let ad: Vec<u8> = built.wrapped_keys.concat();
    let aead = AeadEncryptor::new(&file_key, &built.nonce, &ad);

    let ciphertext_bytes = encrypt_payload(
        source,
        sink,
        listener,
        aead,
        send_content,
        content_size.unwrap_or(0),
    )?;
    debug!(
        plaintext_bytes = source.bytes_read(),
        ciphertext_bytes, "payload encrypted"
    );

    if source.error() {
        return Err(CipherpackError::Io(std::io::Error::other(
            "source stream reported failure",
        )));
    }
    Ok(())
}
