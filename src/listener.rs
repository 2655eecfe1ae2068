//! # Listener Protocol
//!
//! The orchestrator reports progress, header metadata and (optionally) every
//! produced byte through this trait. All callbacks for one invocation are
//! dispatched from the calling thread, in order; `notify_end` is always the
//! last callback and fires exactly once.

use crate::header::PackHeader;

/// Receiver for packer/unpacker events.
///
/// All methods have no-op defaults so implementors override only what they
/// need. `decrypt_mode` is `false` for `encrypt_then_sign` and `true` for
/// `check_sign_then_decrypt`.
pub trait CipherpackListener {
    /// A fatal error, reported once before `notify_end(success=false)`.
    fn notify_error(&mut self, decrypt_mode: bool, msg: &str) {
        let _ = (decrypt_mode, msg);
    }

    /// The header became authoritative: assembled and signed (encrypt) or
    /// parsed, signature-verified and algorithm-checked (decrypt). Fires at
    /// most once, before any payload byte.
    fn notify_header(&mut self, decrypt_mode: bool, header: &PackHeader, verified: bool) {
        let _ = (decrypt_mode, header, verified);
    }

    /// Called after each processed payload chunk. `content_size` is 0 when
    /// unknown.
    fn notify_progress(&mut self, decrypt_mode: bool, content_size: u64, bytes_processed: u64) {
        let _ = (decrypt_mode, content_size, bytes_processed);
    }

    /// Terminal callback, fired exactly once per invocation.
    fn notify_end(&mut self, decrypt_mode: bool, header: &PackHeader, success: bool) {
        let _ = (decrypt_mode, header, success);
    }

    /// Queried once before streaming; return true to receive the produced
    /// bytes via `content_processed`.
    fn send_content(&mut self, decrypt_mode: bool) -> bool {
        let _ = decrypt_mode;
        false
    }

    /// One call per emitted span when `send_content` returned true:
    /// header bytes (`is_header`) and then payload chunks in order.
    /// Returning false aborts the operation.
    fn content_processed(
        &mut self,
        decrypt_mode: bool,
        is_header: bool,
        data: &[u8],
        is_final: bool,
    ) -> bool {
        let _ = (decrypt_mode, is_header, data, is_final);
        true
    }
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl CipherpackListener for NoopListener {}
