//! # Error Types
//!
//! This module defines the error types used throughout the library.
//! All operations return [`Result<T, CipherpackError>`](CipherpackError).

use crate::der::DecodeError;
use thiserror::Error;

/// The error type for all cipherpack operations.
///
/// Every failure is fatal for the current call; there is no retry. The
/// orchestrators additionally report failures through
/// [`notify_error`](crate::CipherpackListener::notify_error) and remove any
/// partial destination file before returning.
#[derive(Error, Debug)]
pub enum CipherpackError {
    /// I/O error on the source or the destination.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed DER framing in the header.
    #[error("Header decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Structurally valid DER that violates the header contract: wrong
    /// magic, bad `header1_size`, missing fields, malformed nonce.
    #[error("Header error: {0}")]
    Header(String),

    /// An algorithm identifier in the header disagrees with the expected
    /// crypto configuration.
    #[error("Algorithm mismatch: {0}")]
    AlgorithmMismatch(String),

    /// Header signature verification failed, or no trusted host key matched
    /// the header's host fingerprint.
    #[error("Signature mismatch: {0}")]
    SignatureMismatch(String),

    /// The decryption key's fingerprint is not among the header's recipients.
    #[error("No matching recipient: {0}")]
    NoRecipientMatch(String),

    /// The payload authentication tag did not verify.
    #[error("Payload authentication failed")]
    AuthFailure,

    /// An underlying primitive refused its input (wrong key size, padding
    /// error, RNG failure).
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// A listener callback requested termination.
    #[error("Aborted by listener")]
    ListenerAbort,

    /// The destination file exists and overwriting is disallowed.
    #[error("Not overwriting existing output file: {0}")]
    Overwrite(String),
}

impl From<&'static str> for CipherpackError {
    fn from(msg: &'static str) -> Self {
        CipherpackError::Crypto(msg.to_string())
    }
}
