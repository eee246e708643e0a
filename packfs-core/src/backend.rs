//! Backend trait definitions
//!
//! A backend is one mounted source of files: a directory tree, an
//! in-memory pack, or anything else that can resolve backend-relative
//! paths. Backends are the seam between the virtual file system layer
//! and actual storage; everything above them speaks virtual paths and
//! typed errors, everything below speaks `std::io`.

use crate::stat::FileStat;
use std::io;

/// One mounted source of files.
///
/// Paths handed to a backend are relative to its own root: normalized,
/// `/`-separated, with the empty string meaning the backend root.
/// Failures are reported as `std::io::Error`; the layer above translates
/// them into [`PackError`](crate::PackError) with virtual-path context.
///
/// # Implementations
/// - [`DirBackend`](crate::DirBackend): host directory tree
/// - [`MemoryBackend`](crate::MemoryBackend): in-memory pack
/// - [`LoggedBackend`](crate::LoggedBackend): tracing wrapper around another backend
pub trait Backend: Send + Sync {
    /// Check whether a path exists in this backend
    fn exists(&self, path: &str) -> bool;

    /// Metadata for a path
    fn stat(&self, path: &str) -> io::Result<FileStat>;

    /// Entry names (not paths) of a directory
    fn enumerate(&self, path: &str) -> io::Result<Vec<String>>;

    /// Open a file for reading
    fn open_read(&self, path: &str) -> io::Result<Box<dyn BackendFile>>;

    /// Open a file for writing, truncating or appending
    ///
    /// Backends that only serve read traffic report
    /// `ErrorKind::PermissionDenied` here.
    fn open_write(&self, path: &str, append: bool) -> io::Result<Box<dyn BackendFile>>;

    /// Delete a file or an empty directory
    fn remove(&self, path: &str) -> io::Result<()>;

    /// Create a directory, including missing parents
    fn make_dir(&self, path: &str) -> io::Result<()>;

    /// Whether the backend rejects all mutation
    fn read_only(&self) -> bool {
        true
    }
}

/// One open file inside a backend.
///
/// All operations are blocking and synchronous; offsets are absolute byte
/// positions. A read of zero bytes means end of data, never an error;
/// the buffered stream layer depends on that distinction.
pub trait BackendFile: Send {
    /// Read up to `buf.len()` bytes; returns the count actually read
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write up to `buf.len()` bytes; returns the count actually written
    ///
    /// Partial writes are a normal return, not a failure.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Reposition to an absolute offset
    fn seek(&mut self, pos: u64) -> io::Result<()>;

    /// Current absolute offset
    fn tell(&mut self) -> io::Result<u64>;

    /// Total length in bytes, if the backend can report it
    fn length(&mut self) -> io::Result<u64>;

    /// Whether the position is at or past the end of data
    fn eof(&mut self) -> io::Result<bool>;

    /// Push written bytes down to the backing store
    fn flush(&mut self) -> io::Result<()>;
}
