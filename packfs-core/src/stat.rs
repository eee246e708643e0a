//! File metadata reported by backends

/// Kind of entry a virtual path resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Ordinary file
    Regular,
    /// Directory (real or synthesized from a mount point)
    Directory,
    /// Symbolic link (only reported by backends that can see them)
    Symlink,
    /// Anything else the host reports (device, socket, ...)
    Other,
}

/// Metadata for one virtual path
///
/// Timestamps are unix seconds; `None` means the backend cannot report
/// the value. Callers must treat a missing timestamp as unknown, never
/// as the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: Option<i64>,
    pub created: Option<i64>,
    pub accessed: Option<i64>,
    pub file_type: FileType,
    pub read_only: bool,
}

impl FileStat {
    /// Stat for a directory synthesized from the mount table (no backing
    /// entry, so no size or timestamps).
    pub(crate) fn virtual_dir() -> Self {
        Self {
            size: 0,
            modified: None,
            created: None,
            accessed: None,
            file_type: FileType::Directory,
            read_only: true,
        }
    }

    pub fn is_regular_file(&self) -> bool {
        self.file_type == FileType::Regular
    }

    pub fn is_directory(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }
}
