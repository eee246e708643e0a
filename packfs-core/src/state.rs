//! Process-wide lifecycle and forwarding surface
//!
//! The library keeps one [`Vfs`] instance behind a process-wide lock,
//! established by [`init`] and torn down by [`deinit`]. Re-initializing
//! while initialized, or deinitializing while not, is a reported failure
//! rather than a no-op. Every free function here forwards to that
//! instance; handles returned by the open calls stay valid independently
//! of it, but the caller must still close them before tearing the state
//! down, as with any native library lifecycle.

use crate::backend::Backend;
use crate::error::{PackError, PackResult};
use crate::file::FileHandle;
use crate::stat::FileStat;
use crate::vfs::Vfs;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

struct GlobalState {
    vfs: Vfs,
    argv0: Option<String>,
}

static STATE: Lazy<Mutex<Option<GlobalState>>> = Lazy::new(|| Mutex::new(None));

fn lock() -> PackResult<std::sync::MutexGuard<'static, Option<GlobalState>>> {
    STATE
        .lock()
        .map_err(|_| PackError::Init("state lock poisoned".to_string()))
}

fn with_state<R>(f: impl FnOnce(&mut GlobalState) -> PackResult<R>) -> PackResult<R> {
    let mut guard = lock()?;
    match guard.as_mut() {
        Some(state) => f(state),
        None => Err(PackError::Init("not initialized".to_string())),
    }
}

/// Initialize the process-wide virtual file system.
///
/// `argv0` is the program name from the command line, if the caller has
/// one; it is only used as a fallback when the executable path cannot be
/// queried for [`base_dir`].
///
/// Initializing twice is an error, not a no-op.
pub fn init(argv0: Option<&str>) -> PackResult<()> {
    let mut guard = lock()?;
    if guard.is_some() {
        return Err(PackError::Init("already initialized".to_string()));
    }
    debug!(argv0, "packfs initialized");
    *guard = Some(GlobalState {
        vfs: Vfs::new(),
        argv0: argv0.map(str::to_string),
    });
    Ok(())
}

/// Tear the process-wide state down, dropping all mounts.
///
/// Deinitializing while not initialized is an error.
pub fn deinit() -> PackResult<()> {
    let mut guard = lock()?;
    if guard.take().is_none() {
        return Err(PackError::Init("not initialized".to_string()));
    }
    debug!("packfs deinitialized");
    Ok(())
}

/// Whether [`init`] has been called and not yet undone.
pub fn is_init() -> bool {
    STATE.lock().map(|g| g.is_some()).unwrap_or(false)
}

/// Scope guard pairing [`init`] with a best-effort [`deinit`].
///
/// Dropping the guard deinitializes; a failure during that implicit
/// teardown is logged and suppressed, since it cannot be propagated out
/// of a drop.
pub struct InitGuard(());

impl InitGuard {
    pub fn new() -> PackResult<Self> {
        init(None)?;
        Ok(Self(()))
    }

    pub fn with_argv0(argv0: &str) -> PackResult<Self> {
        init(Some(argv0))?;
        Ok(Self(()))
    }
}

impl Drop for InitGuard {
    fn drop(&mut self) {
        if let Err(e) = deinit() {
            warn!(error = %e, "could not deinitialize packfs");
        }
    }
}

// ---- mounting ----------------------------------------------------------

/// Mount a host directory. See [`Vfs::mount`].
pub fn mount(
    target: impl AsRef<Path>,
    mount_point: Option<&str>,
    append: bool,
) -> PackResult<()> {
    with_state(|s| s.vfs.mount(target.as_ref(), mount_point, append))
}

/// Mount an arbitrary backend. See [`Vfs::mount_backend`].
pub fn mount_backend(
    source: &str,
    backend: Arc<dyn Backend>,
    mount_point: Option<&str>,
    append: bool,
) -> PackResult<()> {
    with_state(|s| s.vfs.mount_backend(source, backend, mount_point, append))
}

pub fn unmount(target: &str) -> PackResult<()> {
    with_state(|s| s.vfs.unmount(target))
}

pub fn search_paths() -> PackResult<Vec<String>> {
    with_state(|s| Ok(s.vfs.search_paths()))
}

pub fn mount_point_of(target: &str) -> PackResult<String> {
    with_state(|s| s.vfs.mount_point_of(target))
}

pub fn real_dir(virtual_path: &str) -> PackResult<String> {
    with_state(|s| s.vfs.real_dir(virtual_path))
}

// ---- write directory ---------------------------------------------------

pub fn set_write_dir(dir: impl AsRef<Path>) -> PackResult<()> {
    with_state(|s| s.vfs.set_write_dir(dir.as_ref()))
}

pub fn disable_writing() -> PackResult<()> {
    with_state(|s| {
        s.vfs.disable_writing();
        Ok(())
    })
}

/// Current write directory; `None` while writing is disabled.
pub fn write_dir() -> PackResult<Option<String>> {
    with_state(|s| Ok(s.vfs.write_dir().map(str::to_string)))
}

// ---- symlink policy ----------------------------------------------------

/// Allow or refuse symlink traversal for directory sources mounted from
/// now on. See [`Vfs::permit_symlinks`].
pub fn permit_symlinks(allow: bool) -> PackResult<()> {
    with_state(|s| {
        s.vfs.permit_symlinks(allow);
        Ok(())
    })
}

pub fn symlinks_permitted() -> PackResult<bool> {
    with_state(|s| Ok(s.vfs.symlinks_permitted()))
}

// ---- queries -----------------------------------------------------------

/// Whether a virtual path exists. Quietly `false` when the layer is not
/// initialized.
pub fn exists(virtual_path: &str) -> bool {
    with_state(|s| Ok(s.vfs.exists(virtual_path))).unwrap_or(false)
}

pub fn stat(virtual_path: &str) -> PackResult<FileStat> {
    with_state(|s| s.vfs.stat(virtual_path))
}

pub fn enumerate(directory: &str) -> PackResult<Vec<String>> {
    with_state(|s| s.vfs.enumerate(directory))
}

pub fn file_size(virtual_path: &str) -> PackResult<u64> {
    with_state(|s| s.vfs.file_size(virtual_path))
}

pub fn is_read_only(virtual_path: &str) -> PackResult<bool> {
    with_state(|s| s.vfs.is_read_only(virtual_path))
}

pub fn remove(virtual_path: &str) -> PackResult<()> {
    with_state(|s| s.vfs.remove(virtual_path))
}

pub fn make_dir(virtual_path: &str) -> PackResult<()> {
    with_state(|s| s.vfs.make_dir(virtual_path))
}

// ---- opening files -----------------------------------------------------

pub fn open_read(virtual_path: &str) -> PackResult<FileHandle> {
    with_state(|s| s.vfs.open_read(virtual_path))
}

pub fn open_write(virtual_path: &str) -> PackResult<FileHandle> {
    with_state(|s| s.vfs.open_write(virtual_path))
}

pub fn open_append(virtual_path: &str) -> PackResult<FileHandle> {
    with_state(|s| s.vfs.open_append(virtual_path))
}

// ---- platform paths ----------------------------------------------------

/// Directory the running executable lives in, falling back to the
/// directory of the `argv0` passed to [`init`].
pub fn base_dir() -> PackResult<String> {
    with_state(|s| {
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                return Ok(dir.display().to_string());
            }
        }
        s.argv0
            .as_deref()
            .and_then(|a| Path::new(a).parent())
            .map(|p| p.display().to_string())
            .ok_or_else(|| PackError::stat("<base dir>", "cannot determine base directory"))
    })
}

/// Per-user preference directory for `org`/`app`, created on demand.
pub fn pref_dir(org: &str, app: &str) -> PackResult<String> {
    with_state(|_| {
        let base = dirs::data_dir().ok_or_else(|| {
            PackError::stat("<pref dir>", "no user data directory on this platform")
        })?;
        let dir = base.join(org).join(app);
        std::fs::create_dir_all(&dir)
            .map_err(|e| PackError::io(dir.display().to_string(), e))?;
        Ok(dir.display().to_string())
    })
}
