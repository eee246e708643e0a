//! Shared fixtures for the end-to-end tests

use packfs_core::MemoryBackend;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// The tests in one binary share the process-wide packfs state; take
/// this lock first in every test that initializes it.
static SERIAL: Mutex<()> = Mutex::new(());

pub fn serialized() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    // A test that panicked mid-lifecycle may have left the state
    // initialized; start from a clean slate.
    if packfs_core::is_init() {
        let _ = packfs_core::deinit();
    }
    guard
}

/// A six-entry theme pack, standing in for a mounted archive.
///
/// `themeinfo.txt` is exactly 19 bytes and two lines.
pub fn theme_pack() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::with_files([
        ("themeinfo.txt", b"Aurora Theme\nalpha\n".to_vec()),
        ("background.png", vec![0u8; 128]),
        ("cursor.png", vec![1u8; 16]),
        ("icons/ok.png", vec![2u8; 8]),
        ("sounds/click.ogg", vec![3u8; 64]),
        ("readme.md", b"# aurora\n".to_vec()),
    ]))
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "packfs_it_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
