//! Error types for the virtual file system layer.

use thiserror::Error;

/// Result type for all packfs operations
pub type PackResult<T> = Result<T, PackError>;

/// Error type for all packfs operations
///
/// Every failure reported by a backend is translated into one of these
/// variants at the wrapper boundary, with the virtual path (or mount
/// target) attached for diagnostics.
#[derive(Debug, Error)]
pub enum PackError {
    /// Lifecycle misuse: double init, deinit without init, or an
    /// operation attempted while the layer is not initialized
    #[error("init error: {0}")]
    Init(String),

    /// A file could not be opened
    #[error("cannot open '{path}': {reason}")]
    Open { path: String, reason: String },

    /// A read, write, flush or close reported a hard failure
    #[error("i/o error on '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A seek target was rejected by the handle
    #[error("seek to {offset} failed on '{path}': {reason}")]
    Seek {
        path: String,
        offset: i64,
        reason: String,
    },

    /// A path could not be stat'ed (missing or inaccessible)
    #[error("cannot stat '{path}': {reason}")]
    Stat { path: String, reason: String },

    /// Mount, unmount or write-dir configuration failed
    #[error("mount error for '{target}': {reason}")]
    Mount { target: String, reason: String },
}

impl PackError {
    pub(crate) fn open(path: impl Into<String>, reason: impl Into<String>) -> Self {
        PackError::Open {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        PackError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn stat(path: impl Into<String>, reason: impl Into<String>) -> Self {
        PackError::Stat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn mount(target: impl Into<String>, reason: impl Into<String>) -> Self {
        PackError::Mount {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

impl From<PackError> for std::io::Error {
    /// Bridge into `std::io` for the stream trait impls.
    ///
    /// The original `io::ErrorKind` is preserved where one exists; the
    /// typed error stays reachable through `io::Error::get_ref`.
    fn from(e: PackError) -> Self {
        let kind = match &e {
            PackError::Io { source, .. } => source.kind(),
            PackError::Open { .. } | PackError::Stat { .. } => std::io::ErrorKind::NotFound,
            PackError::Seek { .. } => std::io::ErrorKind::InvalidInput,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, e)
    }
}
