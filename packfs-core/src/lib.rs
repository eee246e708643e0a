//! Packfs - a virtual file system layer for packaged assets
//!
//! Mounts several sources (host directories, in-memory packs, custom
//! backends) into one virtual tree with an ordered search path, a single
//! write directory, and buffered file streams speaking the standard
//! `Read`/`Write`/`Seek`/`BufRead` traits.
//!
//! # Usage
//! ```rust,ignore
//! use packfs_core::{InitGuard, FileStream, OpenMode};
//! use std::io::BufRead;
//!
//! let _fs = InitGuard::new()?;
//! packfs_core::mount("./assets", Some("assets"), true)?;
//!
//! let stream = FileStream::open("assets/themeinfo.txt", OpenMode::Read)?;
//! for line in stream.lines() {
//!     println!("{}", line?);
//! }
//! ```
//!
//! The process-wide state behind [`init`]/[`InitGuard`] mirrors the
//! lifecycle of a native asset library; embedders that want several
//! independent trees can own [`Vfs`] instances directly.

mod backend;
mod dir;
mod error;
mod file;
mod logged;
mod memory;
mod path;
mod stat;
mod state;
mod stream;
mod vfs;

pub use backend::{Backend, BackendFile};
pub use dir::DirBackend;
pub use error::{PackError, PackResult};
pub use file::{FileHandle, OpenMode};
pub use logged::LoggedBackend;
pub use memory::MemoryBackend;
pub use stat::{FileStat, FileType};
pub use state::{
    base_dir, deinit, disable_writing, enumerate, exists, file_size, init, is_init, is_read_only,
    make_dir, mount, mount_backend, mount_point_of, open_append, open_read, open_write,
    permit_symlinks, pref_dir, real_dir, remove, search_paths, set_write_dir, stat,
    symlinks_permitted, unmount, write_dir, InitGuard,
};
pub use stream::{FileStream, DEFAULT_CAPACITY};
pub use vfs::Vfs;

/// Create a new in-memory backend.
pub fn memory_backend() -> MemoryBackend {
    MemoryBackend::new()
}

/// Create a backend serving a host directory tree.
pub fn dir_backend(root: impl Into<std::path::PathBuf>) -> DirBackend {
    DirBackend::new(root)
}
