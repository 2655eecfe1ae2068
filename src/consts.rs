//! Global constants for the cipherpack stream format.
//!
//! Includes buffer sizing, AEAD geometry, and header framing widths.

/// Chunk size for the streaming payload pipeline (16 KiB).
pub const BUFFER_SIZE: usize = 16 * 1024;

/// Symmetric file-key length in bytes (ChaCha20 maximum key length).
pub const FILE_KEY_SIZE: usize = 32;

/// ChaCha20-Poly1305 nonce length in bytes.
pub const CHACHA_NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

/// Width of the `header1_size` field: a 4-byte little-endian u32 carried as
/// a fixed-size OctetString so both header passes encode to the same length.
pub const HEADER1_SIZE_FIELD_LEN: usize = 4;

/// Upper bound accepted for `header1_size` when parsing. Generous enough for
/// thousands of wrapped keys, small enough to reject garbage before
/// allocating.
pub const MAX_HEADER1_SIZE: u32 = 8 * 1024 * 1024;

/// Upper bound accepted for the `package_magic` OctetString during the peek
/// parse, before the full header is in memory.
pub const MAX_MAGIC_SIZE: usize = 64;
