// src/crypto/rng.rs
//! Secure randomness for fixed-size secrets and nonces.
//!
//! Adds `T::random()` to every `fixed_alias!` type via a thread-local
//! `OsRng`, plus a helper for variable-length public random material.

use rand::{rngs::OsRng, TryRngCore};
use secure_gate::Fixed;
use std::cell::RefCell;

/// Extension trait — gives `.random()` to all fixed-size secret types.
pub trait SecureRandomExt {
    /// Generate a cryptographically secure random instance of this type.
    fn random() -> Self;
}

thread_local! {
    static RNG: RefCell<OsRng> = const { RefCell::new(OsRng) };
}

/// Blanket impl — every `Fixed<[u8; N]>` alias gets `.random()`.
impl<const N: usize> SecureRandomExt for Fixed<[u8; N]> {
    #[inline]
    fn random() -> Self {
        RNG.with(|rng_cell| {
            let mut rng = rng_cell.borrow_mut();
            let mut bytes = [0u8; N];
            let _ = rng.try_fill_bytes(&mut bytes);
            Fixed::new(bytes)
        })
    }
}

/// Random bytes for non-secret material (nonces).
pub fn random_vec(len: usize) -> Vec<u8> {
    RNG.with(|rng_cell| {
        let mut rng = rng_cell.borrow_mut();
        let mut bytes = vec![0u8; len];
        let _ = rng.try_fill_bytes(&mut bytes);
        bytes
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aliases::FileKey32;
    use secure_gate::RevealSecret;

    #[test]
    fn random_keys_differ() {
        let a = FileKey32::random();
        let b = FileKey32::random();
        assert_ne!(a.expose_secret(), b.expose_secret());
    }

    #[test]
    fn random_vec_len() {
        assert_eq!(random_vec(12).len(), 12);
        assert_ne!(random_vec(12), random_vec(12));
    }
}
