//! Host directory backend

use crate::backend::{Backend, BackendFile};
use crate::stat::{FileStat, FileType};
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A backend serving a directory tree on the host file system.
///
/// Wraps `std::fs` under a fixed root; backend-relative virtual paths map
/// onto host paths below that root. This is both the usual read source
/// for development trees and the backend behind the write directory.
///
/// # Example
/// ```
/// use packfs_core::DirBackend;
///
/// let backend = DirBackend::new(std::env::temp_dir());
/// ```
#[derive(Debug, Clone)]
pub struct DirBackend {
    root: PathBuf,
    follow_symlinks: bool,
}

impl DirBackend {
    /// Create a backend rooted at `root`. Symbolic links are followed.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: true,
        }
    }

    /// Refuse to traverse or resolve symbolic links.
    ///
    /// With this set, a path whose resolution crosses a symlink behaves
    /// as if it did not exist, and `stat` reports links as links instead
    /// of their targets.
    pub fn deny_symlinks(mut self) -> Self {
        self.follow_symlinks = false;
        self
    }

    /// Root directory this backend serves.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let mut host = self.root.clone();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if !self.follow_symlinks {
                let meta = fs::symlink_metadata(&host);
                if let Ok(meta) = meta {
                    if meta.file_type().is_symlink() {
                        return Err(io::Error::new(
                            io::ErrorKind::NotFound,
                            "symbolic link refused",
                        ));
                    }
                }
            }
            host.push(part);
        }
        Ok(host)
    }

    fn host_metadata(&self, host: &Path) -> io::Result<fs::Metadata> {
        if self.follow_symlinks {
            fs::metadata(host)
        } else {
            fs::symlink_metadata(host)
        }
    }
}

impl Backend for DirBackend {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path)
            .and_then(|host| self.host_metadata(&host))
            .is_ok()
    }

    fn stat(&self, path: &str) -> io::Result<FileStat> {
        let host = self.resolve(path)?;
        let meta = self.host_metadata(&host)?;

        let file_type = if meta.file_type().is_symlink() {
            FileType::Symlink
        } else if meta.is_dir() {
            FileType::Directory
        } else if meta.is_file() {
            FileType::Regular
        } else {
            FileType::Other
        };

        Ok(FileStat {
            size: meta.len(),
            modified: unix_secs(meta.modified()),
            created: unix_secs(meta.created()),
            accessed: unix_secs(meta.accessed()),
            file_type,
            read_only: meta.permissions().readonly(),
        })
    }

    fn enumerate(&self, path: &str) -> io::Result<Vec<String>> {
        let host = self.resolve(path)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(host)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn open_read(&self, path: &str) -> io::Result<Box<dyn BackendFile>> {
        let host = self.resolve(path)?;
        if !self.follow_symlinks && fs::symlink_metadata(&host)?.file_type().is_symlink() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "symbolic link refused",
            ));
        }
        let file = fs::File::open(host)?;
        Ok(Box::new(DirFile {
            file,
            writable: false,
        }))
    }

    fn open_write(&self, path: &str, append: bool) -> io::Result<Box<dyn BackendFile>> {
        let host = self.resolve(path)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(!append)
            .open(host)?;
        if append {
            file.seek(SeekFrom::End(0))?;
        }
        Ok(Box::new(DirFile {
            file,
            writable: true,
        }))
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        let host = self.resolve(path)?;
        let meta = self.host_metadata(&host)?;
        if meta.is_dir() {
            fs::remove_dir(host)
        } else {
            fs::remove_file(host)
        }
    }

    fn make_dir(&self, path: &str) -> io::Result<()> {
        let host = self.resolve(path)?;
        fs::create_dir_all(host)
    }

    fn read_only(&self) -> bool {
        false
    }
}

fn unix_secs(time: io::Result<SystemTime>) -> Option<i64> {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
}

struct DirFile {
    file: fs::File,
    writable: bool,
}

impl BackendFile for DirFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(pos)).map(|_| ())
    }

    fn tell(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn length(&mut self) -> io::Result<u64> {
        self.file.metadata().map(|m| m.len())
    }

    fn eof(&mut self) -> io::Result<bool> {
        let pos = self.file.stream_position()?;
        let len = self.file.metadata()?.len();
        Ok(pos >= len)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.writable {
            self.file.sync_data()
        } else {
            Ok(())
        }
    }
}
