//! End-to-end tests through the process-wide surface

mod common;

use packfs_core::{FileStream, InitGuard, OpenMode, PackError};
use std::io::{BufRead, Read, Write};

#[test]
fn test_lifecycle_is_paired() {
    let _lock = common::serialized();

    {
        let _fs = InitGuard::new().unwrap();
        assert!(packfs_core::is_init());
        assert!(matches!(
            packfs_core::init(None),
            Err(PackError::Init(_))
        ));
    }
    assert!(!packfs_core::is_init());
}

#[test]
fn test_mount_enumerate_and_paths() {
    let _lock = common::serialized();
    let _fs = InitGuard::new().unwrap();

    packfs_core::mount_backend("theme.pack", common::theme_pack(), Some("pack"), true).unwrap();

    assert!(packfs_core::exists("pack"));
    assert!(packfs_core::exists("pack/themeinfo.txt"));
    assert_eq!(packfs_core::mount_point_of("theme.pack").unwrap(), "pack");
    assert_eq!(
        packfs_core::search_paths().unwrap(),
        vec!["theme.pack".to_string()]
    );
    assert_eq!(
        packfs_core::real_dir("pack/themeinfo.txt").unwrap(),
        "theme.pack"
    );

    // the pack root holds exactly six entries
    let entries = packfs_core::enumerate("pack").unwrap();
    assert_eq!(entries.len(), 6);
    assert_eq!(
        entries,
        vec![
            "background.png",
            "cursor.png",
            "icons",
            "readme.md",
            "sounds",
            "themeinfo.txt"
        ]
    );

    packfs_core::unmount("theme.pack").unwrap();
    assert!(!packfs_core::exists("pack/themeinfo.txt"));
}

#[test]
fn test_read_theme_info_end_to_end() {
    let _lock = common::serialized();
    let _fs = InitGuard::new().unwrap();

    packfs_core::mount_backend("theme.pack", common::theme_pack(), Some("pack"), true).unwrap();
    assert!(packfs_core::exists("pack/themeinfo.txt"));

    let mut stream = FileStream::open("pack/themeinfo.txt", OpenMode::Read).unwrap();
    assert_eq!(stream.length().unwrap(), 19);

    let lines: Vec<String> = stream.lines().map(|l| l.unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Aurora"));
}

#[test]
fn test_stat_through_the_mount_table() {
    let _lock = common::serialized();
    let _fs = InitGuard::new().unwrap();

    packfs_core::mount_backend("theme.pack", common::theme_pack(), Some("pack"), true).unwrap();

    let stat = packfs_core::stat("pack/themeinfo.txt").unwrap();
    assert!(stat.is_regular_file());
    assert_eq!(stat.size, 19);
    assert_eq!(packfs_core::file_size("pack/themeinfo.txt").unwrap(), 19);

    assert!(packfs_core::stat("pack/icons").unwrap().is_directory());
    assert!(packfs_core::stat("pack").unwrap().is_directory());
    assert!(matches!(
        packfs_core::stat("pack/none.txt"),
        Err(PackError::Stat { .. })
    ));
}

#[test]
fn test_write_read_back_and_remove() {
    let _lock = common::serialized();
    let _fs = InitGuard::new().unwrap();

    let scratch = common::scratch_dir("write_cycle");
    packfs_core::set_write_dir(&scratch).unwrap();
    // writes land in the write dir; mount it for reading them back
    packfs_core::mount(&scratch, None, true).unwrap();

    let payload = "this is the test content";
    {
        let mut out = FileStream::open("test_file.txt", OpenMode::Write).unwrap();
        out.write_all(payload.as_bytes()).unwrap();
        out.close().unwrap();
    }

    {
        let mut input = FileStream::open("test_file.txt", OpenMode::Read).unwrap();
        let mut read_back = String::new();
        input.read_to_string(&mut read_back).unwrap();
        assert_eq!(read_back, payload);
    }

    packfs_core::remove("test_file.txt").unwrap();
    assert!(!packfs_core::exists("test_file.txt"));

    std::fs::remove_dir_all(&scratch).unwrap();
}

#[test]
fn test_write_dir_toggling() {
    let _lock = common::serialized();
    let _fs = InitGuard::new().unwrap();

    assert_eq!(packfs_core::write_dir().unwrap(), None);
    assert!(matches!(
        packfs_core::open_write("blocked.txt"),
        Err(PackError::Open { .. })
    ));

    let scratch = common::scratch_dir("toggling");
    packfs_core::set_write_dir(&scratch).unwrap();
    assert_eq!(
        packfs_core::write_dir().unwrap().unwrap(),
        scratch.display().to_string()
    );

    packfs_core::make_dir("nested/saves").unwrap();
    assert!(scratch.join("nested/saves").is_dir());

    packfs_core::disable_writing().unwrap();
    assert_eq!(packfs_core::write_dir().unwrap(), None);

    std::fs::remove_dir_all(&scratch).unwrap();
}

#[test]
fn test_append_through_the_stream() {
    let _lock = common::serialized();
    let _fs = InitGuard::new().unwrap();

    let scratch = common::scratch_dir("append");
    packfs_core::set_write_dir(&scratch).unwrap();
    packfs_core::mount(&scratch, None, true).unwrap();

    {
        let mut out = FileStream::open("log.txt", OpenMode::Write).unwrap();
        writeln!(out, "first").unwrap();
        out.close().unwrap();
    }
    {
        let mut out = FileStream::open("log.txt", OpenMode::Append).unwrap();
        writeln!(out, "second").unwrap();
        out.close().unwrap();
    }

    let stream = FileStream::open("log.txt", OpenMode::Read).unwrap();
    let lines: Vec<String> = stream.lines().map(|l| l.unwrap()).collect();
    assert_eq!(lines, vec!["first", "second"]);

    std::fs::remove_dir_all(&scratch).unwrap();
}

#[test]
fn test_base_and_pref_dirs() {
    let _lock = common::serialized();
    let _fs = InitGuard::with_argv0("game").unwrap();

    let base = packfs_core::base_dir().unwrap();
    assert!(!base.is_empty());

    let pref = packfs_core::pref_dir("packfs-tests", "it").unwrap();
    assert!(std::path::Path::new(&pref).is_dir());
    let _ = std::fs::remove_dir_all(&pref);
}

#[test]
fn test_search_order_shadows_later_mounts() {
    let _lock = common::serialized();
    let _fs = InitGuard::new().unwrap();

    let override_pack = std::sync::Arc::new(packfs_core::MemoryBackend::with_files([(
        "themeinfo.txt",
        b"Override\n".to_vec(),
    )]));

    packfs_core::mount_backend("theme.pack", common::theme_pack(), None, true).unwrap();
    packfs_core::mount_backend("override.pack", override_pack, None, false).unwrap();

    assert_eq!(
        packfs_core::real_dir("themeinfo.txt").unwrap(),
        "override.pack"
    );
    let mut stream = FileStream::open("themeinfo.txt", OpenMode::Read).unwrap();
    let mut content = String::new();
    stream.read_to_string(&mut content).unwrap();
    assert_eq!(content, "Override\n");
}
