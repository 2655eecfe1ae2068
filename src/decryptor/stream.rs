//! Streaming payload decryption: chunked AEAD update/finish with tag
//! verification on the final chunk.

use crate::consts::BUFFER_SIZE;
use crate::crypto::aead::AeadDecryptor;
use crate::error::CipherpackError;
use crate::io::{for_each_chunk, ByteInStream, DestinationSink};
use crate::listener::CipherpackListener;
use tracing::trace;

/// Run the chunk loop. Returns the number of plaintext bytes emitted.
pub(crate) fn decrypt_payload(
    source: &mut dyn ByteInStream,
    sink: &mut DestinationSink,
    listener: &mut dyn CipherpackListener,
    aead: AeadDecryptor,
    send_content: bool,
    content_size: u64,
) -> Result<u64, CipherpackError> {
    let mut aead = Some(aead);
    let mut bytes_processed = 0u64;

    for_each_chunk(source, BUFFER_SIZE, |chunk, is_final| {
        if is_final {
            let aead = aead.take().expect("final chunk is delivered once");
            aead.finish(chunk)?;
        } else {
            let aead = aead.as_mut().expect("update precedes the final chunk");
            aead.update(chunk);
        }
        sink.write_all(chunk)?;
        bytes_processed += chunk.len() as u64;
        trace!(len = chunk.len(), is_final, bytes_processed, "payload chunk decrypted");

        if send_content && !listener.content_processed(true, false, chunk, is_final) {
            return Err(CipherpackError::ListenerAbort);
        }
        listener.notify_progress(true, content_size, bytes_processed);
        Ok(())
    })?;

    Ok(bytes_processed)
}
