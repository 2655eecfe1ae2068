// src/aliases.rs

//! Global secure type aliases.
//!
//! Fixed-size secrets are wrapped from birth and auto-zeroed on drop.

use secure_gate::fixed_alias;

fixed_alias!(pub FileKey32, 32); // per-stream symmetric AEAD key
fixed_alias!(pub MacKey32, 32); // one-time Poly1305 key derived from the keystream

// Re-exported so callers get randomness from the same `aliases::*` import.
pub use crate::crypto::rng::SecureRandomExt;
