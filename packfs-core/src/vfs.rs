//! Mount table and query surface
//!
//! A [`Vfs`] is an ordered list of mounted sources (the search path), an
//! optional write directory, and the forwarding queries over them. Reads
//! resolve against the search path in order; writes go to the write
//! directory only, which is not implicitly part of the search path.

use crate::backend::Backend;
use crate::dir::DirBackend;
use crate::error::{PackError, PackResult};
use crate::file::{FileHandle, OpenMode};
use crate::path;
use crate::stat::FileStat;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

struct Mount {
    /// Source name: the directory path or backend label given at mount time
    source: String,
    /// Normalized virtual mount point ("" is the root)
    point: String,
    backend: Arc<dyn Backend>,
}

/// One virtual file system instance.
///
/// Most programs use the process-wide instance behind
/// [`init`](crate::init)/[`InitGuard`](crate::InitGuard); owning a `Vfs`
/// directly is useful for tests and embedders that want several
/// independent trees.
#[derive(Default)]
pub struct Vfs {
    mounts: Vec<Mount>,
    write_dir: Option<WriteDir>,
    deny_symlinks: bool,
}

struct WriteDir {
    path: String,
    backend: DirBackend,
}

impl Vfs {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- mounting ------------------------------------------------------

    /// Mount a host directory into the virtual tree.
    ///
    /// `mount_point` of `None` mounts at the root. With `append` the
    /// source goes to the end of the search path, otherwise to the front.
    /// Only directories can be mounted this way; packs and other custom
    /// sources go through [`Vfs::mount_backend`].
    pub fn mount(
        &mut self,
        target: impl AsRef<Path>,
        mount_point: Option<&str>,
        append: bool,
    ) -> PackResult<()> {
        let target = target.as_ref();
        let source = target.display().to_string();
        if !target.is_dir() {
            return Err(PackError::mount(source, "not a directory"));
        }
        let backend = Arc::new(self.dir_backend(target));
        self.mount_backend(&source, backend, mount_point, append)
    }

    /// Mount an arbitrary backend under `source` as its search-path name.
    pub fn mount_backend(
        &mut self,
        source: &str,
        backend: Arc<dyn Backend>,
        mount_point: Option<&str>,
        append: bool,
    ) -> PackResult<()> {
        if self.mounts.iter().any(|m| m.source == source) {
            return Err(PackError::mount(source, "already mounted"));
        }
        let point = path::normalize(mount_point.unwrap_or(""))
            .map_err(|reason| PackError::mount(source, reason))?;

        debug!(source, point, append, "mounting");
        let mount = Mount {
            source: source.to_string(),
            point,
            backend,
        };
        if append {
            self.mounts.push(mount);
        } else {
            self.mounts.insert(0, mount);
        }
        Ok(())
    }

    /// Remove a source from the search path, by the name it was mounted
    /// under.
    pub fn unmount(&mut self, target: &str) -> PackResult<()> {
        let before = self.mounts.len();
        self.mounts.retain(|m| m.source != target);
        if self.mounts.len() == before {
            return Err(PackError::mount(target, "not mounted"));
        }
        debug!(target, "unmounted");
        Ok(())
    }

    /// Source names in search order.
    pub fn search_paths(&self) -> Vec<String> {
        self.mounts.iter().map(|m| m.source.clone()).collect()
    }

    /// Mount point a source was mounted at.
    pub fn mount_point_of(&self, target: &str) -> PackResult<String> {
        self.mounts
            .iter()
            .find(|m| m.source == target)
            .map(|m| m.point.clone())
            .ok_or_else(|| PackError::mount(target, "not mounted"))
    }

    /// Source name of the first mount that contains `virtual_path`.
    pub fn real_dir(&self, virtual_path: &str) -> PackResult<String> {
        let norm = path::normalize(virtual_path)
            .map_err(|reason| PackError::stat(virtual_path, reason))?;
        for mount in &self.mounts {
            if let Some(rel) = path::strip_point(&norm, &mount.point) {
                if mount.backend.exists(rel) {
                    return Ok(mount.source.clone());
                }
            }
        }
        Err(PackError::stat(virtual_path, "not found in search path"))
    }

    // ---- write directory -----------------------------------------------

    /// Direct all writes, removals and directory creation at a host
    /// directory.
    pub fn set_write_dir(&mut self, dir: impl AsRef<Path>) -> PackResult<()> {
        let dir = dir.as_ref();
        let name = dir.display().to_string();
        if !dir.is_dir() {
            return Err(PackError::mount(name, "not a directory"));
        }
        debug!(dir = %name, "write directory set");
        self.write_dir = Some(WriteDir {
            path: name,
            backend: self.dir_backend(dir),
        });
        Ok(())
    }

    /// Forget the write directory; subsequent writes fail.
    pub fn disable_writing(&mut self) {
        self.write_dir = None;
    }

    /// Current write directory, `None` while writing is disabled.
    pub fn write_dir(&self) -> Option<&str> {
        self.write_dir.as_ref().map(|w| w.path.as_str())
    }

    // ---- symlink policy ------------------------------------------------

    /// Allow or refuse symbolic link traversal in directory sources.
    ///
    /// Links are permitted by default. The policy applies to directories
    /// mounted and write directories set after the call; sources already
    /// in the table keep the policy they were created under.
    pub fn permit_symlinks(&mut self, allow: bool) {
        self.deny_symlinks = !allow;
    }

    pub fn symlinks_permitted(&self) -> bool {
        !self.deny_symlinks
    }

    fn dir_backend(&self, root: &Path) -> DirBackend {
        let backend = DirBackend::new(root);
        if self.deny_symlinks {
            backend.deny_symlinks()
        } else {
            backend
        }
    }

    fn writable(&self, for_path: &str) -> PackResult<&WriteDir> {
        self.write_dir
            .as_ref()
            .ok_or_else(|| PackError::open(for_path, "no write directory set"))
    }

    // ---- queries -------------------------------------------------------

    pub fn exists(&self, virtual_path: &str) -> bool {
        let norm = match path::normalize(virtual_path) {
            Ok(n) => n,
            Err(_) => return false,
        };
        for mount in &self.mounts {
            if let Some(rel) = path::strip_point(&norm, &mount.point) {
                if mount.backend.exists(rel) {
                    return true;
                }
            }
            if path::point_under(&mount.point, &norm) {
                // The path is the mount point itself or an ancestor of
                // it, visible as a directory.
                return true;
            }
        }
        false
    }

    pub fn stat(&self, virtual_path: &str) -> PackResult<FileStat> {
        let norm = path::normalize(virtual_path)
            .map_err(|reason| PackError::stat(virtual_path, reason))?;
        for mount in &self.mounts {
            if let Some(rel) = path::strip_point(&norm, &mount.point) {
                if mount.backend.exists(rel) {
                    return mount
                        .backend
                        .stat(rel)
                        .map_err(|e| PackError::stat(virtual_path, e.to_string()));
                }
            }
        }
        if self
            .mounts
            .iter()
            .any(|m| path::point_under(&m.point, &norm))
        {
            return Ok(FileStat::virtual_dir());
        }
        Err(PackError::stat(virtual_path, "not found in search path"))
    }

    /// Merged directory listing across every mounted source.
    ///
    /// Names are deduplicated and sorted; mount points sitting below the
    /// directory contribute their first component.
    pub fn enumerate(&self, directory: &str) -> PackResult<Vec<String>> {
        let norm = path::normalize(directory)
            .map_err(|reason| PackError::stat(directory, reason))?;

        let mut names = BTreeSet::new();
        let mut found = false;
        for mount in &self.mounts {
            if let Some(rel) = path::strip_point(&norm, &mount.point) {
                if let Ok(entries) = mount.backend.enumerate(rel) {
                    found = true;
                    names.extend(entries);
                }
            }
            if let Some(child) = path::point_child(&mount.point, &norm) {
                found = true;
                names.insert(child);
            }
            if path::point_under(&mount.point, &norm) {
                found = true;
            }
        }
        if !found {
            if self.exists(&norm) {
                return Err(PackError::stat(directory, "not a directory"));
            }
            return Err(PackError::stat(directory, "not found in search path"));
        }
        Ok(names.into_iter().collect())
    }

    /// Shortcut for `stat(path)?.size`.
    pub fn file_size(&self, virtual_path: &str) -> PackResult<u64> {
        Ok(self.stat(virtual_path)?.size)
    }

    pub fn is_read_only(&self, virtual_path: &str) -> PackResult<bool> {
        Ok(self.stat(virtual_path)?.read_only)
    }

    // ---- mutation (write directory only) -------------------------------

    /// Delete a file or empty directory under the write directory.
    pub fn remove(&self, virtual_path: &str) -> PackResult<()> {
        let norm = path::normalize(virtual_path)
            .map_err(|reason| PackError::stat(virtual_path, reason))?;
        let write = self.writable(virtual_path)?;
        write
            .backend
            .remove(&norm)
            .map_err(|e| PackError::io(virtual_path, e))
    }

    /// Create a directory (and missing parents) under the write
    /// directory.
    pub fn make_dir(&self, virtual_path: &str) -> PackResult<()> {
        let norm = path::normalize(virtual_path)
            .map_err(|reason| PackError::stat(virtual_path, reason))?;
        let write = self.writable(virtual_path)?;
        write
            .backend
            .make_dir(&norm)
            .map_err(|e| PackError::io(virtual_path, e))
    }

    // ---- opening files -------------------------------------------------

    /// Open the first file in the search path matching `virtual_path`.
    pub fn open_read(&self, virtual_path: &str) -> PackResult<FileHandle> {
        let norm = path::normalize(virtual_path)
            .map_err(|reason| PackError::open(virtual_path, reason))?;
        for mount in &self.mounts {
            if let Some(rel) = path::strip_point(&norm, &mount.point) {
                if mount.backend.exists(rel) {
                    let inner = mount
                        .backend
                        .open_read(rel)
                        .map_err(|e| PackError::open(virtual_path, e.to_string()))?;
                    return Ok(FileHandle::new(inner, norm, OpenMode::Read));
                }
            }
        }
        Err(PackError::open(virtual_path, "not found in search path"))
    }

    /// Open a file for writing in the write directory, truncating any
    /// existing content.
    pub fn open_write(&self, virtual_path: &str) -> PackResult<FileHandle> {
        self.open_for_writing(virtual_path, OpenMode::Write)
    }

    /// Open a file for appending in the write directory.
    pub fn open_append(&self, virtual_path: &str) -> PackResult<FileHandle> {
        self.open_for_writing(virtual_path, OpenMode::Append)
    }

    fn open_for_writing(&self, virtual_path: &str, mode: OpenMode) -> PackResult<FileHandle> {
        let norm = path::normalize(virtual_path)
            .map_err(|reason| PackError::open(virtual_path, reason))?;
        let write = self.writable(virtual_path)?;
        let inner = write
            .backend
            .open_write(&norm, mode == OpenMode::Append)
            .map_err(|e| PackError::open(virtual_path, e.to_string()))?;
        Ok(FileHandle::new(inner, norm, mode))
    }
}
