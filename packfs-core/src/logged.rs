//! Logging wrapper for backends

use crate::backend::{Backend, BackendFile};
use crate::stat::FileStat;
use std::io;
use std::sync::Arc;
use tracing::debug;

/// Backend wrapper that logs every operation
///
/// Emits `tracing` debug events with the operation, path and outcome,
/// then forwards to the wrapped backend unchanged. Useful behind a CLI
/// flag when diagnosing which mount actually served a path.
pub struct LoggedBackend {
    inner: Arc<dyn Backend>,
}

impl LoggedBackend {
    /// Wrap a backend.
    pub fn new(inner: Arc<dyn Backend>) -> Self {
        Self { inner }
    }
}

impl Backend for LoggedBackend {
    fn exists(&self, path: &str) -> bool {
        let result = self.inner.exists(path);
        debug!(path, result, "vfs exists");
        result
    }

    fn stat(&self, path: &str) -> io::Result<FileStat> {
        let result = self.inner.stat(path);
        match &result {
            Ok(stat) => debug!(path, size = stat.size, "vfs stat ok"),
            Err(e) => debug!(path, error = %e, "vfs stat failed"),
        }
        result
    }

    fn enumerate(&self, path: &str) -> io::Result<Vec<String>> {
        let result = self.inner.enumerate(path);
        match &result {
            Ok(names) => debug!(path, entries = names.len(), "vfs enumerate ok"),
            Err(e) => debug!(path, error = %e, "vfs enumerate failed"),
        }
        result
    }

    fn open_read(&self, path: &str) -> io::Result<Box<dyn BackendFile>> {
        let result = self.inner.open_read(path);
        match &result {
            Ok(_) => debug!(path, "vfs open_read ok"),
            Err(e) => debug!(path, error = %e, "vfs open_read failed"),
        }
        result
    }

    fn open_write(&self, path: &str, append: bool) -> io::Result<Box<dyn BackendFile>> {
        let result = self.inner.open_write(path, append);
        match &result {
            Ok(_) => debug!(path, append, "vfs open_write ok"),
            Err(e) => debug!(path, append, error = %e, "vfs open_write failed"),
        }
        result
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        let result = self.inner.remove(path);
        debug!(path, ok = result.is_ok(), "vfs remove");
        result
    }

    fn make_dir(&self, path: &str) -> io::Result<()> {
        let result = self.inner.make_dir(path);
        debug!(path, ok = result.is_ok(), "vfs make_dir");
        result
    }

    fn read_only(&self) -> bool {
        self.inner.read_only()
    }
}
