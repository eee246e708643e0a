//! File handle
//!
//! A [`FileHandle`] owns exactly one open backend file and translates the
//! backend's `std::io` sentinels into typed errors carrying the virtual
//! path. It is the "native handle" layer everything above builds on: no
//! buffering, no retries, one backend call per operation.

use crate::backend::BackendFile;
use crate::error::{PackError, PackResult};
use std::io;
use tracing::warn;

/// How a file is opened. Modes are mutually exclusive and fixed for the
/// lifetime of the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read from the search path
    Read,
    /// Write to the write directory, truncating
    Write,
    /// Write to the write directory, starting at the end
    Append,
}

/// One open file in the virtual file system.
///
/// The handle is either open (exactly one backend resource, exclusively
/// owned) or closed. Dropping an open handle closes it best-effort; a
/// failure during that implicit close is logged, never propagated.
pub struct FileHandle {
    inner: Option<Box<dyn BackendFile>>,
    name: String,
    mode: OpenMode,
}

impl FileHandle {
    pub(crate) fn new(inner: Box<dyn BackendFile>, name: String, mode: OpenMode) -> Self {
        Self {
            inner: Some(inner),
            name,
            mode,
        }
    }

    /// Virtual path this handle was opened with (for diagnostics).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn device(&mut self) -> PackResult<&mut dyn BackendFile> {
        match self.inner.as_deref_mut() {
            Some(inner) => Ok(inner),
            None => Err(PackError::io(
                &self.name,
                io::Error::new(io::ErrorKind::NotConnected, "file is not open"),
            )),
        }
    }

    /// Read up to `buf.len()` bytes.
    ///
    /// Returns the count actually read; zero means end of data, which is
    /// not an error.
    pub fn read(&mut self, buf: &mut [u8]) -> PackResult<usize> {
        if self.mode != OpenMode::Read {
            return Err(PackError::io(
                &self.name,
                io::Error::new(io::ErrorKind::PermissionDenied, "file opened for writing"),
            ));
        }
        let name = self.name.clone();
        self.device()?
            .read(buf)
            .map_err(|e| PackError::io(name, e))
    }

    /// Write up to `buf.len()` bytes; a short count is a normal return.
    pub fn write(&mut self, buf: &[u8]) -> PackResult<usize> {
        if self.mode == OpenMode::Read {
            return Err(PackError::io(
                &self.name,
                io::Error::new(io::ErrorKind::PermissionDenied, "file opened for reading"),
            ));
        }
        let name = self.name.clone();
        self.device()?
            .write(buf)
            .map_err(|e| PackError::io(name, e))
    }

    /// Reposition to an absolute byte offset.
    pub fn seek(&mut self, pos: u64) -> PackResult<()> {
        let name = self.name.clone();
        self.device()?.seek(pos).map_err(|e| PackError::Seek {
            path: name,
            offset: pos as i64,
            reason: e.to_string(),
        })
    }

    /// Current absolute offset.
    pub fn tell(&mut self) -> PackResult<u64> {
        let name = self.name.clone();
        self.device()?.tell().map_err(|e| PackError::io(name, e))
    }

    /// Total file length.
    ///
    /// Fails when the backend cannot report it (streamed entries with
    /// unknown size); callers must treat that as "unknown", not as zero.
    pub fn length(&mut self) -> PackResult<u64> {
        let name = self.name.clone();
        self.device()?.length().map_err(|e| PackError::io(name, e))
    }

    pub fn eof(&mut self) -> PackResult<bool> {
        let name = self.name.clone();
        self.device()?.eof().map_err(|e| PackError::io(name, e))
    }

    /// Force written bytes down to the backing store now.
    pub fn flush(&mut self) -> PackResult<()> {
        let name = self.name.clone();
        self.device()?.flush().map_err(|e| PackError::io(name, e))
    }

    /// Close the handle.
    ///
    /// Best-effort: the handle is considered closed afterwards even when
    /// the final flush reports a failure.
    pub fn close(&mut self) -> PackResult<()> {
        match self.inner.take() {
            Some(mut inner) => inner
                .flush()
                .map_err(|e| PackError::io(self.name.clone(), e)),
            None => Ok(()),
        }
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            if let Err(e) = inner.flush() {
                warn!(file = %self.name, error = %e, "could not close file cleanly");
            }
        }
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::memory::MemoryBackend;

    fn read_handle(content: &[u8]) -> FileHandle {
        let backend = MemoryBackend::with_files([("f.bin", content.to_vec())]);
        let inner = backend.open_read("f.bin").unwrap();
        FileHandle::new(inner, "f.bin".to_string(), OpenMode::Read)
    }

    #[test]
    fn test_read_and_tell() {
        let mut handle = read_handle(b"0123456789");
        let mut buf = [0u8; 4];

        assert_eq!(handle.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(handle.tell().unwrap(), 4);
        assert_eq!(handle.length().unwrap(), 10);
        assert!(!handle.eof().unwrap());
    }

    #[test]
    fn test_zero_read_at_end_is_ok() {
        let mut handle = read_handle(b"ab");
        let mut buf = [0u8; 8];
        assert_eq!(handle.read(&mut buf).unwrap(), 2);
        assert_eq!(handle.read(&mut buf).unwrap(), 0);
        assert!(handle.eof().unwrap());
    }

    #[test]
    fn test_mode_is_enforced() {
        let mut handle = read_handle(b"ab");
        assert!(matches!(
            handle.write(b"x"),
            Err(PackError::Io { .. })
        ));
    }

    #[test]
    fn test_seek_and_close() {
        let mut handle = read_handle(b"abcdef");
        handle.seek(3).unwrap();
        let mut buf = [0u8; 1];
        handle.read(&mut buf).unwrap();
        assert_eq!(&buf, b"d");

        assert!(handle.is_open());
        handle.close().unwrap();
        assert!(!handle.is_open());

        // operations on a closed handle report, they do not panic
        assert!(handle.read(&mut buf).is_err());
        assert!(handle.tell().is_err());
        // closing twice is fine
        handle.close().unwrap();
    }

    #[test]
    fn test_write_handle_roundtrip() {
        let backend = MemoryBackend::new();
        {
            let inner = backend.open_write("out.bin", false).unwrap();
            let mut handle = FileHandle::new(inner, "out.bin".to_string(), OpenMode::Write);
            assert_eq!(handle.write(b"payload").unwrap(), 7);
            handle.close().unwrap();
        }
        assert_eq!(backend.stat("out.bin").unwrap().size, 7);
    }
}
