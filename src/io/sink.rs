//! Destination handling with atomic failure semantics.
//!
//! When a destination path is configured the sink owns the file handle for
//! the whole call; any failure path must call [`discard`] so no partial
//! output survives. Without a path the sink is a no-op and bytes reach the
//! caller only through the listener.
//!
//! [`discard`]: DestinationSink::discard

use crate::error::CipherpackError;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct DestinationSink {
    out: Option<(BufWriter<File>, PathBuf)>,
}

impl DestinationSink {
    /// Open the destination, honoring `overwrite` before anything else: an
    /// existing file fails the call (or is removed) before any key material
    /// is touched.
    pub fn create(path: Option<&Path>, overwrite: bool) -> Result<Self, CipherpackError> {
        let Some(path) = path else {
            return Ok(Self { out: None });
        };
        if path.exists() {
            if !overwrite {
                return Err(CipherpackError::Overwrite(path.display().to_string()));
            }
            fs::remove_file(path)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            out: Some((BufWriter::new(file), path.to_path_buf())),
        })
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<(), CipherpackError> {
        if let Some((writer, _)) = &mut self.out {
            writer.write_all(data)?;
        }
        Ok(())
    }

    /// Flush and keep the destination file.
    pub fn commit(mut self) -> Result<(), CipherpackError> {
        if let Some((mut writer, _)) = self.out.take() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Drop the handle and delete whatever was written.
    pub fn discard(&mut self) {
        if let Some((writer, path)) = self.out.take() {
            drop(writer);
            let _ = fs::remove_file(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn refuses_existing_without_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, b"old").unwrap();

        let err = DestinationSink::create(Some(&path), false).unwrap_err();
        assert!(matches!(err, CipherpackError::Overwrite(_)));
        assert_eq!(fs::read(&path).unwrap(), b"old");
    }

    #[test]
    fn overwrite_replaces_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, b"old").unwrap();

        let mut sink = DestinationSink::create(Some(&path), true).unwrap();
        sink.write_all(b"new contents").unwrap();
        sink.commit().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new contents");
    }

    #[test]
    fn discard_removes_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut sink = DestinationSink::create(Some(&path), false).unwrap();
        sink.write_all(b"partial").unwrap();
        sink.discard();
        assert!(!path.exists());
    }

    #[test]
    fn no_destination_is_a_noop() {
        let mut sink = DestinationSink::create(None, false).unwrap();
        sink.write_all(b"bytes").unwrap();
        sink.commit().unwrap();
    }
}
