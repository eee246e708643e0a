//! In-memory backend

use crate::backend::{Backend, BackendFile};
use crate::stat::{FileStat, FileType};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::{Arc, RwLock};

/// A backend holding its whole tree in memory.
///
/// Files live in a `BTreeMap` keyed by normalized path. Besides testing,
/// this is the stand-in for a mounted pack: pre-populate it with
/// [`MemoryBackend::with_files`] and mount it like any other source.
///
/// # Example
/// ```
/// use packfs_core::{Backend, MemoryBackend};
///
/// let pack = MemoryBackend::with_files([("themeinfo.txt", b"dark".to_vec())]);
/// assert!(pack.exists("themeinfo.txt"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<MemoryTree>>,
}

#[derive(Debug, Default)]
struct MemoryTree {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MemoryTree {
    fn is_dir(&self, path: &str) -> bool {
        if path.is_empty() {
            return true;
        }
        if self.dirs.contains(path) {
            return true;
        }
        let prefix = format!("{path}/");
        self.files.keys().any(|k| k.starts_with(&prefix))
            || self.dirs.iter().any(|d| d.starts_with(&prefix))
    }
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "lock poisoned")
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-populated with files.
    ///
    /// Parent directories are implied by the paths; they do not need to
    /// be created separately.
    ///
    /// # Arguments
    /// * `files` - Iterator of (path, content) tuples
    pub fn with_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let backend = Self::new();
        {
            let mut tree = backend.inner.write().unwrap();
            for (path, content) in files {
                tree.files.insert(path.as_ref().to_string(), content);
            }
        }
        backend
    }
}

impl Backend for MemoryBackend {
    fn exists(&self, path: &str) -> bool {
        let tree = match self.inner.read() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        tree.files.contains_key(path) || tree.is_dir(path)
    }

    fn stat(&self, path: &str) -> io::Result<FileStat> {
        let tree = self.inner.read().map_err(|_| poisoned())?;
        if let Some(content) = tree.files.get(path) {
            return Ok(FileStat {
                size: content.len() as u64,
                modified: None,
                created: None,
                accessed: None,
                file_type: FileType::Regular,
                read_only: false,
            });
        }
        if tree.is_dir(path) {
            return Ok(FileStat {
                size: 0,
                modified: None,
                created: None,
                accessed: None,
                file_type: FileType::Directory,
                read_only: false,
            });
        }
        Err(io::Error::new(io::ErrorKind::NotFound, "no such entry"))
    }

    fn enumerate(&self, path: &str) -> io::Result<Vec<String>> {
        let tree = self.inner.read().map_err(|_| poisoned())?;
        if !tree.is_dir(path) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such directory"));
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        let mut names = BTreeSet::new();
        for key in tree.files.keys().chain(tree.dirs.iter()) {
            if let Some(rest) = key.strip_prefix(&prefix) {
                if rest.is_empty() {
                    continue;
                }
                let name = rest.split('/').next().unwrap_or(rest);
                names.insert(name.to_string());
            }
        }
        Ok(names.into_iter().collect())
    }

    fn open_read(&self, path: &str) -> io::Result<Box<dyn BackendFile>> {
        let tree = self.inner.read().map_err(|_| poisoned())?;
        let data = tree
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?;
        Ok(Box::new(MemoryReadFile { data, pos: 0 }))
    }

    fn open_write(&self, path: &str, append: bool) -> io::Result<Box<dyn BackendFile>> {
        let mut tree = self.inner.write().map_err(|_| poisoned())?;
        if tree.is_dir(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "is a directory",
            ));
        }
        let buf = if append {
            tree.files.get(path).cloned().unwrap_or_default()
        } else {
            Vec::new()
        };
        // Make the entry visible immediately, as a host file system would.
        tree.files.insert(path.to_string(), buf.clone());
        let pos = buf.len() as u64;
        Ok(Box::new(MemoryWriteFile {
            inner: Arc::clone(&self.inner),
            path: path.to_string(),
            buf,
            pos: if append { pos } else { 0 },
        }))
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        let mut tree = self.inner.write().map_err(|_| poisoned())?;
        if tree.files.remove(path).is_some() {
            return Ok(());
        }
        if tree.is_dir(path) {
            let prefix = format!("{path}/");
            let occupied = tree.files.keys().any(|k| k.starts_with(&prefix))
                || tree.dirs.iter().any(|d| d.starts_with(&prefix));
            if occupied {
                return Err(io::Error::new(io::ErrorKind::Other, "directory not empty"));
            }
            tree.dirs.remove(path);
            return Ok(());
        }
        Err(io::Error::new(io::ErrorKind::NotFound, "no such entry"))
    }

    fn make_dir(&self, path: &str) -> io::Result<()> {
        let mut tree = self.inner.write().map_err(|_| poisoned())?;
        if tree.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "a file is in the way",
            ));
        }
        let mut built = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if !built.is_empty() {
                built.push('/');
            }
            built.push_str(part);
            tree.dirs.insert(built.clone());
        }
        Ok(())
    }

    fn read_only(&self) -> bool {
        false
    }
}

struct MemoryReadFile {
    data: Vec<u8>,
    pos: u64,
}

impl BackendFile for MemoryReadFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = (self.pos as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "file opened for reading",
        ))
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = pos;
        Ok(())
    }

    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }

    fn length(&mut self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn eof(&mut self) -> io::Result<bool> {
        Ok(self.pos >= self.data.len() as u64)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct MemoryWriteFile {
    inner: Arc<RwLock<MemoryTree>>,
    path: String,
    buf: Vec<u8>,
    pos: u64,
}

impl MemoryWriteFile {
    fn commit(&self) -> io::Result<()> {
        let mut tree = self.inner.write().map_err(|_| poisoned())?;
        tree.files.insert(self.path.clone(), self.buf.clone());
        Ok(())
    }
}

impl BackendFile for MemoryWriteFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = (self.pos as usize).min(self.buf.len());
        let n = buf.len().min(self.buf.len() - start);
        buf[..n].copy_from_slice(&self.buf[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let pos = self.pos as usize;
        if pos > self.buf.len() {
            // Sparse write: fill the gap like a host file would.
            self.buf.resize(pos, 0);
        }
        let overlap = buf.len().min(self.buf.len().saturating_sub(pos));
        self.buf[pos..pos + overlap].copy_from_slice(&buf[..overlap]);
        self.buf.extend_from_slice(&buf[overlap..]);
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = pos;
        Ok(())
    }

    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }

    fn length(&mut self) -> io::Result<u64> {
        Ok(self.buf.len() as u64)
    }

    fn eof(&mut self) -> io::Result<bool> {
        Ok(self.pos >= self.buf.len() as u64)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit()
    }
}

impl Drop for MemoryWriteFile {
    fn drop(&mut self) {
        let _ = self.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_backend_is_empty() {
        let backend = MemoryBackend::new();
        assert!(!backend.exists("anything.txt"));
        assert!(backend.exists(""));
    }

    #[test]
    fn test_with_files_and_read() {
        let backend = MemoryBackend::with_files([
            ("a.txt", b"content a".to_vec()),
            ("sub/b.txt", b"content b".to_vec()),
        ]);

        assert!(backend.exists("a.txt"));
        assert!(backend.exists("sub"));
        assert!(backend.exists("sub/b.txt"));

        let mut file = backend.open_read("sub/b.txt").unwrap();
        let mut buf = [0u8; 16];
        let n = file.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"content b");
        assert_eq!(file.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_stat_file_and_dir() {
        let backend = MemoryBackend::with_files([("pack/data.bin", vec![0u8; 42])]);

        let stat = backend.stat("pack/data.bin").unwrap();
        assert!(stat.is_regular_file());
        assert_eq!(stat.size, 42);

        let stat = backend.stat("pack").unwrap();
        assert!(stat.is_directory());

        assert!(backend.stat("missing").is_err());
    }

    #[test]
    fn test_enumerate_merges_files_and_dirs() {
        let backend = MemoryBackend::with_files([
            ("pack/a.txt", vec![]),
            ("pack/b.txt", vec![]),
            ("pack/nested/c.txt", vec![]),
        ]);
        backend.make_dir("pack/empty").unwrap();

        let names = backend.enumerate("pack").unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt", "empty", "nested"]);
    }

    #[test]
    fn test_enumerate_missing_dir_fails() {
        let backend = MemoryBackend::new();
        assert!(backend.enumerate("nope").is_err());
    }

    #[test]
    fn test_write_then_read_back() {
        let backend = MemoryBackend::new();
        {
            let mut file = backend.open_write("out.txt", false).unwrap();
            file.write(b"hello").unwrap();
            file.flush().unwrap();
        }
        let mut file = backend.open_read("out.txt").unwrap();
        let mut buf = [0u8; 16];
        let n = file.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn test_append_positions_at_end() {
        let backend = MemoryBackend::with_files([("log.txt", b"one\n".to_vec())]);
        {
            let mut file = backend.open_write("log.txt", true).unwrap();
            assert_eq!(file.tell().unwrap(), 4);
            file.write(b"two\n").unwrap();
            file.flush().unwrap();
        }
        let mut file = backend.open_read("log.txt").unwrap();
        let mut buf = [0u8; 16];
        let n = file.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"one\ntwo\n");
    }

    #[test]
    fn test_write_commits_on_drop() {
        let backend = MemoryBackend::new();
        {
            let mut file = backend.open_write("dropped.txt", false).unwrap();
            file.write(b"kept").unwrap();
            // no explicit flush
        }
        assert!(backend.exists("dropped.txt"));
        assert_eq!(backend.stat("dropped.txt").unwrap().size, 4);
    }

    #[test]
    fn test_overwrite_truncates() {
        let backend = MemoryBackend::with_files([("f.txt", b"something long".to_vec())]);
        {
            let mut file = backend.open_write("f.txt", false).unwrap();
            file.write(b"x").unwrap();
            file.flush().unwrap();
        }
        assert_eq!(backend.stat("f.txt").unwrap().size, 1);
    }

    #[test]
    fn test_remove_file_and_dir() {
        let backend = MemoryBackend::with_files([("d/f.txt", vec![])]);

        assert!(backend.remove("d").is_err()); // not empty
        backend.remove("d/f.txt").unwrap();
        assert!(!backend.exists("d/f.txt"));

        backend.make_dir("empty").unwrap();
        backend.remove("empty").unwrap();
        assert!(!backend.exists("empty"));

        assert!(backend.remove("never_there").is_err());
    }

    #[test]
    fn test_clone_shares_tree() {
        let a = MemoryBackend::new();
        let b = a.clone();
        {
            let mut file = a.open_write("shared.txt", false).unwrap();
            file.write(b"shared").unwrap();
            file.flush().unwrap();
        }
        assert!(b.exists("shared.txt"));
    }

    #[test]
    fn test_sparse_write_fills_gap() {
        let backend = MemoryBackend::new();
        {
            let mut file = backend.open_write("sparse.bin", false).unwrap();
            file.write(b"ab").unwrap();
            file.seek(4).unwrap();
            file.write(b"cd").unwrap();
            file.flush().unwrap();
        }
        let mut file = backend.open_read("sparse.bin").unwrap();
        let mut buf = [0u8; 8];
        let n = file.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ab\0\0cd");
    }
}
