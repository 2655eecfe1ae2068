//! Producer-fed source stream backed by a bounded ringbuffer.
//!
//! One producer thread feeds bytes with [`write`](ByteInStreamFeed::write)
//! while the pipeline reads; the ringbuffer is the only synchronization
//! point. EOF and errors are sticky: after `set_eof(1)` the reader drains
//! the buffer and then sees end-of-data, after `set_eof(-1)` it drains and
//! then sees a failure. [`interrupt`](ByteInStreamFeed::interrupt) unblocks
//! both sides and is idempotent.

use super::ByteInStream;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Default ringbuffer capacity in bytes.
const FEED_CAPACITY: usize = 64 * 1024;

struct FeedState {
    buf: VecDeque<u8>,
    eof: Option<i32>,
    interrupted: bool,
    content_size: Option<u64>,
    bytes_read: u64,
}

struct FeedShared {
    state: Mutex<FeedState>,
    readable: Condvar,
    writable: Condvar,
    capacity: usize,
}

/// Ringbuffer-backed byte stream fed by an external producer.
///
/// Cloning yields another handle to the same ringbuffer, so a producer
/// thread can keep a handle while the pipeline consumes the original.
#[derive(Clone)]
pub struct ByteInStreamFeed {
    shared: Arc<FeedShared>,
    id: String,
    /// Max wait per blocking `write`/`read`; zero waits indefinitely.
    timeout: Duration,
}

impl ByteInStreamFeed {
    /// Create a feed stream. `timeout` bounds each blocking `write` and
    /// `read`; `Duration::ZERO` waits indefinitely.
    pub fn new(id: impl Into<String>, timeout: Duration) -> Self {
        Self::with_capacity(id, timeout, FEED_CAPACITY)
    }

    pub fn with_capacity(id: impl Into<String>, timeout: Duration, capacity: usize) -> Self {
        assert!(capacity > 0, "feed capacity must be non-zero");
        Self {
            shared: Arc::new(FeedShared {
                state: Mutex::new(FeedState {
                    buf: VecDeque::with_capacity(capacity),
                    eof: None,
                    interrupted: false,
                    content_size: None,
                    bytes_read: 0,
                }),
                readable: Condvar::new(),
                writable: Condvar::new(),
                capacity,
            }),
            id: id.into(),
            timeout,
        }
    }

    /// Blocking write into the ringbuffer.
    ///
    /// Waits up to the constructor timeout for space whenever the buffer is
    /// full; fails on timeout, on interrupt, and after EOF has been set.
    pub fn write(&self, mut data: &[u8]) -> io::Result<()> {
        let shared = &*self.shared;
        let mut state = shared.state.lock().expect("feed mutex poisoned");
        while !data.is_empty() {
            if state.interrupted {
                return Err(io::Error::other("feed interrupted"));
            }
            if state.eof.is_some() {
                return Err(io::Error::other("write after set_eof"));
            }
            let free = shared.capacity - state.buf.len();
            if free == 0 {
                state = if self.timeout.is_zero() {
                    shared.writable.wait(state).expect("feed mutex poisoned")
                } else {
                    let (guard, result) = shared
                        .writable
                        .wait_timeout(state, self.timeout)
                        .expect("feed mutex poisoned");
                    if result.timed_out() && guard.buf.len() == shared.capacity {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "feed write timed out",
                        ));
                    }
                    guard
                };
                continue;
            }
            let take = free.min(data.len());
            state.buf.extend(&data[..take]);
            data = &data[take..];
            shared.readable.notify_one();
        }
        Ok(())
    }

    /// Declare the total content size, informational only.
    pub fn set_content_size(&self, size: u64) {
        let mut state = self.shared.state.lock().expect("feed mutex poisoned");
        state.content_size = Some(size);
    }

    /// Mark end of data: `1` for success, `-1` for producer failure.
    ///
    /// Sticky; the first call wins. Unblocks a waiting reader.
    pub fn set_eof(&self, result: i32) {
        let mut state = self.shared.state.lock().expect("feed mutex poisoned");
        if state.eof.is_none() {
            state.eof = Some(result);
        }
        self.shared.readable.notify_all();
        self.shared.writable.notify_all();
    }

    /// Unblock a blocked reader or writer. Idempotent.
    pub fn interrupt(&self) {
        let mut state = self.shared.state.lock().expect("feed mutex poisoned");
        state.interrupted = true;
        self.shared.readable.notify_all();
        self.shared.writable.notify_all();
    }
}

impl ByteInStream for ByteInStreamFeed {
    fn id(&self) -> &str {
        &self.id
    }

    fn content_size(&self) -> Option<u64> {
        self.shared
            .state
            .lock()
            .expect("feed mutex poisoned")
            .content_size
    }

    fn bytes_read(&self) -> u64 {
        self.shared
            .state
            .lock()
            .expect("feed mutex poisoned")
            .bytes_read
    }

    fn end_of_data(&self) -> bool {
        let state = self.shared.state.lock().expect("feed mutex poisoned");
        state.buf.is_empty() && matches!(state.eof, Some(r) if r >= 0)
    }

    fn error(&self) -> bool {
        let state = self.shared.state.lock().expect("feed mutex poisoned");
        state.interrupted || matches!(state.eof, Some(r) if r < 0)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let shared = &*self.shared;
        let mut state = shared.state.lock().expect("feed mutex poisoned");
        loop {
            if !state.buf.is_empty() {
                let n = buf.len().min(state.buf.len());
                for (dst, src) in buf.iter_mut().zip(state.buf.drain(..n)) {
                    *dst = src;
                }
                state.bytes_read += n as u64;
                shared.writable.notify_one();
                return Ok(n);
            }
            if state.interrupted {
                return Err(io::Error::other("feed interrupted"));
            }
            match state.eof {
                Some(r) if r >= 0 => return Ok(0),
                Some(_) => return Err(io::Error::other("feed producer reported failure")),
                None => {}
            }
            state = if self.timeout.is_zero() {
                shared.readable.wait(state).expect("feed mutex poisoned")
            } else {
                let (guard, result) = shared
                    .readable
                    .wait_timeout(state, self.timeout)
                    .expect("feed mutex poisoned");
                if result.timed_out()
                    && guard.buf.is_empty()
                    && guard.eof.is_none()
                    && !guard.interrupted
                {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "feed read timed out"));
                }
                guard
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn write_then_drain_then_eof() {
        let mut feed = ByteInStreamFeed::with_capacity("feed", Duration::ZERO, 8);
        feed.write(b"abc").unwrap();
        feed.set_eof(1);

        let mut buf = [0u8; 16];
        assert_eq!(feed.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert!(!feed.error());
        assert_eq!(feed.read(&mut buf).unwrap(), 0);
        assert!(feed.end_of_data());
        assert_eq!(feed.bytes_read(), 3);
    }

    #[test]
    fn writer_blocks_until_reader_drains() {
        let feed = ByteInStreamFeed::with_capacity("feed", Duration::ZERO, 4);
        let producer = feed.clone();
        let handle = thread::spawn(move || {
            producer.write(b"0123456789").unwrap();
            producer.set_eof(1);
        });

        let mut reader = feed;
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        handle.join().unwrap();
        assert_eq!(out, b"0123456789");
    }

    #[test]
    fn eof_failure_is_reported_after_drain() {
        let mut feed = ByteInStreamFeed::new("feed", Duration::ZERO);
        feed.write(b"xy").unwrap();
        feed.set_eof(-1);
        // sticky: a later success report must not override the failure
        feed.set_eof(1);

        let mut buf = [0u8; 8];
        assert_eq!(feed.read(&mut buf).unwrap(), 2);
        assert!(feed.read(&mut buf).is_err());
        assert!(feed.error());
    }

    #[test]
    fn interrupt_unblocks_reader_and_is_idempotent() {
        let feed = ByteInStreamFeed::new("feed", Duration::ZERO);
        let interrupter = feed.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            interrupter.interrupt();
            interrupter.interrupt();
        });

        let mut reader = feed;
        let mut buf = [0u8; 8];
        assert!(reader.read(&mut buf).is_err());
        assert!(reader.error());
        handle.join().unwrap();

        reader.interrupt();
        assert!(reader.read(&mut buf).is_err());
    }

    #[test]
    fn read_timeout() {
        let mut feed = ByteInStreamFeed::new("feed", Duration::from_millis(20));
        let mut buf = [0u8; 4];
        let err = feed.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn content_size_roundtrip() {
        let feed = ByteInStreamFeed::new("feed", Duration::ZERO);
        assert!(!feed.has_content_size());
        feed.set_content_size(42);
        assert_eq!(feed.content_size(), Some(42));
    }
}
