// src/io/mod.rs

//! Byte-stream abstraction over the pack source and destination.
//!
//! Sources are pull streams: plain readers (files, memory) via
//! [`ByteInStreamReader`], or a producer-fed ringbuffer via
//! [`ByteInStreamFeed`]. The pipeline consumes them chunkwise through
//! [`for_each_chunk`], which knows which chunk is final.

pub(crate) mod feed;
pub(crate) mod sink;

pub use feed::ByteInStreamFeed;
pub use sink::DestinationSink;

use crate::error::CipherpackError;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A pull byte stream with optional known content size.
///
/// `read` returns `Ok(0)` only at end of data; transport failures surface as
/// `Err` and are sticky.
pub trait ByteInStream {
    /// Identifier for diagnostics.
    fn id(&self) -> &str;

    fn has_content_size(&self) -> bool {
        self.content_size().is_some()
    }

    /// Total plaintext/ciphertext size if known up front.
    fn content_size(&self) -> Option<u64>;

    /// Bytes handed out so far.
    fn bytes_read(&self) -> u64;

    /// True once the stream is drained and no more data can arrive.
    fn end_of_data(&self) -> bool;

    /// True once the stream has failed (sticky).
    fn error(&self) -> bool;

    /// Pull up to `buf.len()` bytes. Blocking streams may wait.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// Fill a whole chunk unless the stream ends first.
fn read_chunk(
    source: &mut dyn ByteInStream,
    chunk_size: usize,
) -> Result<Vec<u8>, CipherpackError> {
    let mut buf = vec![0u8; chunk_size];
    let mut filled = 0;
    while filled < chunk_size {
        let n = source.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}

/// Drive `consume` with `(chunk, is_final)` until the source is exhausted.
///
/// One chunk of lookahead makes `is_final` exact: the consumer sees the last
/// chunk flagged even when the source length is a multiple of `chunk_size`.
/// An empty source yields a single empty final chunk. Returns the total
/// number of source bytes consumed.
pub fn for_each_chunk<F>(
    source: &mut dyn ByteInStream,
    chunk_size: usize,
    mut consume: F,
) -> Result<u64, CipherpackError>
where
    F: FnMut(&mut Vec<u8>, bool) -> Result<(), CipherpackError>,
{
    let mut total = 0u64;
    let mut current = read_chunk(source, chunk_size)?;
    loop {
        let next = read_chunk(source, chunk_size)?;
        let is_final = next.is_empty();
        total += current.len() as u64;
        consume(&mut current, is_final)?;
        if is_final {
            return Ok(total);
        }
        current = next;
    }
}

/// [`ByteInStream`] over any [`Read`] impl, with an optional declared
/// content size.
pub struct ByteInStreamReader<R> {
    id: String,
    inner: R,
    content_size: Option<u64>,
    bytes_read: u64,
    eof: bool,
    failed: bool,
}

impl<R: Read> ByteInStreamReader<R> {
    pub fn new(id: impl Into<String>, inner: R) -> Self {
        Self {
            id: id.into(),
            inner,
            content_size: None,
            bytes_read: 0,
            eof: false,
            failed: false,
        }
    }

    pub fn with_content_size(mut self, size: u64) -> Self {
        self.content_size = Some(size);
        self
    }
}

/// File-backed source stream.
pub type ByteInStreamFile = ByteInStreamReader<BufReader<File>>;

impl ByteInStreamFile {
    /// Open a file source; the file length becomes the content size.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(ByteInStreamReader::new(path.display().to_string(), BufReader::new(file))
            .with_content_size(size))
    }
}

impl<R: Read> ByteInStream for ByteInStreamReader<R> {
    fn id(&self) -> &str {
        &self.id
    }

    fn content_size(&self) -> Option<u64> {
        self.content_size
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn end_of_data(&self) -> bool {
        self.eof
    }

    fn error(&self) -> bool {
        self.failed
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.inner.read(buf) {
            Ok(0) => {
                self.eof = true;
                Ok(0)
            }
            Ok(n) => {
                self.bytes_read += n as u64;
                Ok(n)
            }
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn chunking_flags_exact_final() {
        // 40 bytes in 16-byte chunks: 16, 16, 8(final)
        let data = vec![0x5au8; 40];
        let mut src = ByteInStreamReader::new("mem", Cursor::new(data));
        let mut seen = Vec::new();
        let total = for_each_chunk(&mut src, 16, |chunk, is_final| {
            seen.push((chunk.len(), is_final));
            Ok(())
        })
        .unwrap();
        assert_eq!(total, 40);
        assert_eq!(seen, vec![(16, false), (16, false), (8, true)]);
    }

    #[test]
    fn chunk_multiple_of_size_still_flags_final() {
        let data = vec![1u8; 32];
        let mut src = ByteInStreamReader::new("mem", Cursor::new(data));
        let mut seen = Vec::new();
        for_each_chunk(&mut src, 16, |chunk, is_final| {
            seen.push((chunk.len(), is_final));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![(16, false), (16, true)]);
    }

    #[test]
    fn empty_source_yields_one_final_chunk() {
        let mut src = ByteInStreamReader::new("mem", Cursor::new(Vec::new()));
        let mut seen = Vec::new();
        let total = for_each_chunk(&mut src, 16, |chunk, is_final| {
            seen.push((chunk.len(), is_final));
            Ok(())
        })
        .unwrap();
        assert_eq!(total, 0);
        assert_eq!(seen, vec![(0, true)]);
        assert!(src.end_of_data());
    }

    #[test]
    fn consumer_error_stops_iteration() {
        let data = vec![0u8; 64];
        let mut src = ByteInStreamReader::new("mem", Cursor::new(data));
        let mut calls = 0;
        let result = for_each_chunk(&mut src, 16, |_, _| {
            calls += 1;
            Err(CipherpackError::ListenerAbort)
        });
        assert!(matches!(result, Err(CipherpackError::ListenerAbort)));
        assert_eq!(calls, 1);
    }
}
