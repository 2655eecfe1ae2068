//! # DER Codec
//!
//! Encode/decode for the header grammar: SEQUENCEs of OctetStrings,
//! non-negative Integers, ObjectIdentifiers and AlgorithmIdentifiers.
//!
//! This is DER, not BER: definite lengths only, minimal length encoding,
//! minimal integers. The decoder rejects anything else as [`NonCanonical`],
//! which is what makes the two-pass header emission byte-stable.
//!
//! [`NonCanonical`]: DecodeError::NonCanonical

pub mod oid;

use oid::Oid;
use thiserror::Error;

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;

/// Decode failure kinds for the header grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended before the announced structure was complete.
    #[error("truncated DER input")]
    Truncated,

    /// A different tag than the grammar expects at this position.
    #[error("tag mismatch: expected 0x{expected:02x}, got 0x{found:02x}")]
    TagMismatch { expected: u8, found: u8 },

    /// A length field that cannot be represented or trusted.
    #[error("DER length field overflow")]
    LengthOverflow,

    /// Valid BER that is not valid DER (indefinite or non-minimal lengths,
    /// padded or negative integers, trailing bytes).
    #[error("non-canonical DER encoding: {0}")]
    NonCanonical(&'static str),
}

/// An `AlgorithmIdentifier` as used by the legacy header variant:
/// `SEQUENCE { algorithm OBJECT IDENTIFIER, parameters ANY OPTIONAL }`.
///
/// `parameters` holds the raw DER of the optional parameters field; empty
/// means absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    pub oid: Oid,
    pub parameters: Vec<u8>,
}

impl AlgorithmIdentifier {
    pub fn new(oid: Oid, parameters: Vec<u8>) -> Self {
        Self { oid, parameters }
    }

    /// Identifier with no parameters.
    pub fn bare(oid: Oid) -> Self {
        Self {
            oid,
            parameters: Vec::new(),
        }
    }

    /// The complete DER encoding of this identifier, for embedding as the
    /// parameters of another identifier.
    pub fn to_der(&self) -> Vec<u8> {
        let mut enc = DerEncoder::new();
        enc.algorithm_identifier(self);
        enc.into_vec()
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Canonical DER encoder. Encoding is infallible; lengths are derived from
/// the data, so two encodings of equal-width inputs are byte-identical.
#[derive(Default)]
pub struct DerEncoder {
    out: Vec<u8>,
}

impl DerEncoder {
    pub fn new() -> Self {
        Self { out: Vec::new() }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.out
    }

    pub fn octet_string(&mut self, bytes: &[u8]) -> &mut Self {
        self.tlv(TAG_OCTET_STRING, bytes);
        self
    }

    /// Non-negative integer, minimally encoded.
    pub fn integer(&mut self, value: u64) -> &mut Self {
        let be = value.to_be_bytes();
        let skip = be.iter().take_while(|&&b| b == 0).count().min(7);
        let mut contents = Vec::with_capacity(9);
        if be[skip] & 0x80 != 0 {
            // High bit would read as a sign bit; prepend a zero octet.
            contents.push(0x00);
        }
        contents.extend_from_slice(&be[skip..]);
        self.tlv(TAG_INTEGER, &contents);
        self
    }

    pub fn oid(&mut self, oid: &Oid) -> &mut Self {
        self.tlv(TAG_OID, &oid.der_contents());
        self
    }

    pub fn algorithm_identifier(&mut self, alg: &AlgorithmIdentifier) -> &mut Self {
        self.sequence(|s| {
            s.oid(&alg.oid);
            s.raw(&alg.parameters);
        })
    }

    /// Append pre-encoded DER verbatim (used for AlgorithmIdentifier
    /// parameters).
    pub fn raw(&mut self, der: &[u8]) -> &mut Self {
        self.out.extend_from_slice(der);
        self
    }

    /// Encode a SEQUENCE whose contents are produced by `build`.
    pub fn sequence(&mut self, build: impl FnOnce(&mut DerEncoder)) -> &mut Self {
        let mut inner = DerEncoder::new();
        build(&mut inner);
        self.tlv(TAG_SEQUENCE, &inner.out);
        self
    }

    fn tlv(&mut self, tag: u8, contents: &[u8]) {
        self.out.push(tag);
        self.write_length(contents.len());
        self.out.extend_from_slice(contents);
    }

    fn write_length(&mut self, len: usize) {
        if len < 0x80 {
            self.out.push(len as u8);
            return;
        }
        let be = (len as u64).to_be_bytes();
        let skip = be.iter().take_while(|&&b| b == 0).count();
        self.out.push(0x80 | (8 - skip) as u8);
        self.out.extend_from_slice(&be[skip..]);
    }
}

/// Encode a single top-level SEQUENCE.
pub fn encode_sequence(build: impl FnOnce(&mut DerEncoder)) -> Vec<u8> {
    let mut enc = DerEncoder::new();
    enc.sequence(build);
    enc.into_vec()
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Strict DER decoder over a borrowed buffer.
#[derive(Debug)]
pub struct DerDecoder<'a> {
    input: &'a [u8],
}

impl<'a> DerDecoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Enter a SEQUENCE, returning a decoder over its contents.
    pub fn sequence(&mut self) -> Result<DerDecoder<'a>, DecodeError> {
        let contents = self.read_tlv(TAG_SEQUENCE)?;
        Ok(DerDecoder::new(contents))
    }

    pub fn octet_string(&mut self) -> Result<&'a [u8], DecodeError> {
        self.read_tlv(TAG_OCTET_STRING)
    }

    /// Non-negative integer fitting a u64.
    pub fn integer(&mut self) -> Result<u64, DecodeError> {
        let contents = self.read_tlv(TAG_INTEGER)?;
        match contents {
            [] => Err(DecodeError::NonCanonical("empty integer")),
            [first, ..] if *first & 0x80 != 0 => {
                Err(DecodeError::NonCanonical("negative integer"))
            }
            [0x00, second, ..] if *second & 0x80 == 0 => {
                Err(DecodeError::NonCanonical("padded integer"))
            }
            _ => {
                let digits = if contents[0] == 0x00 {
                    &contents[1..]
                } else {
                    contents
                };
                if digits.len() > 8 {
                    return Err(DecodeError::LengthOverflow);
                }
                let mut value = 0u64;
                for &b in digits {
                    value = (value << 8) | u64::from(b);
                }
                Ok(value)
            }
        }
    }

    pub fn oid(&mut self) -> Result<Oid, DecodeError> {
        let contents = self.read_tlv(TAG_OID)?;
        Oid::from_der_contents(contents)
    }

    pub fn algorithm_identifier(&mut self) -> Result<AlgorithmIdentifier, DecodeError> {
        let mut seq = self.sequence()?;
        let oid = seq.oid()?;
        let parameters = seq.input.to_vec();
        Ok(AlgorithmIdentifier { oid, parameters })
    }

    /// Reject trailing bytes once a structure should be exhausted.
    pub fn finish(&self) -> Result<(), DecodeError> {
        if self.input.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::NonCanonical("trailing bytes"))
        }
    }

    fn read_tlv(&mut self, expected: u8) -> Result<&'a [u8], DecodeError> {
        let (tag, len, header_len) = peek_header(self.input)?;
        if tag != expected {
            return Err(DecodeError::TagMismatch {
                expected,
                found: tag,
            });
        }
        let total = header_len
            .checked_add(len)
            .ok_or(DecodeError::LengthOverflow)?;
        if self.input.len() < total {
            return Err(DecodeError::Truncated);
        }
        let contents = &self.input[header_len..total];
        self.input = &self.input[total..];
        Ok(contents)
    }
}

/// Parse a tag + definite length from the front of `input` without consuming
/// it. Returns `(tag, content_len, header_len)`.
pub fn peek_header(input: &[u8]) -> Result<(u8, usize, usize), DecodeError> {
    if input.len() < 2 {
        return Err(DecodeError::Truncated);
    }
    let tag = input[0];
    let first = input[1];
    if first < 0x80 {
        return Ok((tag, first as usize, 2));
    }
    if first == 0x80 {
        return Err(DecodeError::NonCanonical("indefinite length"));
    }
    let n = (first & 0x7f) as usize;
    if n > 4 {
        return Err(DecodeError::LengthOverflow);
    }
    if input.len() < 2 + n {
        return Err(DecodeError::Truncated);
    }
    let bytes = &input[2..2 + n];
    if bytes[0] == 0 {
        return Err(DecodeError::NonCanonical("length not minimal"));
    }
    let mut len = 0usize;
    for &b in bytes {
        len = (len << 8) | b as usize;
    }
    if len < 0x80 {
        return Err(DecodeError::NonCanonical("length not minimal"));
    }
    Ok((tag, len, 2 + n))
}
