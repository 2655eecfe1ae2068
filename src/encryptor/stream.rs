//! Streaming payload encryption: chunked AEAD update/finish over the
//! source, emitting ciphertext to the sink and listener in order.

use crate::consts::BUFFER_SIZE;
use crate::crypto::aead::AeadEncryptor;
use crate::error::CipherpackError;
use crate::io::{for_each_chunk, ByteInStream, DestinationSink};
use crate::listener::CipherpackListener;
use tracing::trace;

/// Run the chunk loop. Returns the number of ciphertext bytes emitted
/// (including the trailing tag).
pub(crate) fn encrypt_payload(
    source: &mut dyn ByteInStream,
    sink: &mut DestinationSink,
    listener: &mut dyn CipherpackListener,
    aead: AeadEncryptor,
    send_content: bool,
    content_size: u64,
) -> Result<u64, CipherpackError> {
    let mut aead = Some(aead);
    let mut bytes_processed = 0u64;

    for_each_chunk(source, BUFFER_SIZE, |chunk, is_final| {
        if is_final {
            let aead = aead.take().expect("final chunk is delivered once");
            aead.finish(chunk);
        } else {
            let aead = aead.as_mut().expect("update precedes the final chunk");
            aead.update(chunk);
        }
        sink.write_all(chunk)?;
        bytes_processed += chunk.len() as u64;
        trace!(len = chunk.len(), is_final, bytes_processed, "payload chunk encrypted");

        if send_content && !listener.content_processed(false, false, chunk, is_final) {
            return Err(CipherpackError::ListenerAbort);
        }
        listener.notify_progress(false, content_size, bytes_processed);
        Ok(())
    })?;

    Ok(bytes_processed)
}
