//! Virtual path handling
//!
//! Virtual paths are `/`-separated regardless of platform. Internally
//! every path is kept normalized: no leading or trailing separator, no
//! empty components. The empty string is the root of the virtual tree.

/// Normalize a virtual path for internal use.
///
/// Collapses repeated separators and strips leading/trailing ones.
/// `.` and `..` components are rejected; the virtual tree has no notion
/// of relative traversal.
///
/// # Returns
/// The normalized path, or the reason it is invalid.
pub(crate) fn normalize(path: &str) -> Result<String, String> {
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" => continue,
            "." | ".." => return Err(format!("invalid path component '{part}'")),
            _ => parts.push(part),
        }
    }
    Ok(parts.join("/"))
}

/// Path of `path` relative to `point`, if `path` lies under it.
///
/// Both arguments must already be normalized. Returns `Some("")` when the
/// path is the mount point itself.
pub(crate) fn strip_point<'a>(path: &'a str, point: &str) -> Option<&'a str> {
    if point.is_empty() {
        return Some(path);
    }
    if path == point {
        return Some("");
    }
    path.strip_prefix(point)
        .and_then(|rest| rest.strip_prefix('/'))
}

/// Whether `dir` is an ancestor of `point` (or `point` itself), i.e. the
/// mount point is visible somewhere at or below `dir`.
pub(crate) fn point_under(point: &str, dir: &str) -> bool {
    strip_point(point, dir).is_some()
}

/// First component of `point` below `dir`, when the mount point sits
/// strictly below `dir`.
///
/// E.g. point `themes/dark`, dir `themes` -> `dark`; dir `` -> `themes`.
/// This is the entry name a mount point contributes to a listing of `dir`.
pub(crate) fn point_child(point: &str, dir: &str) -> Option<String> {
    match strip_point(point, dir) {
        Some(rest) if !rest.is_empty() => {
            Some(rest.split('/').next().unwrap_or(rest).to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain() {
        assert_eq!(normalize("pack/themeinfo.txt").unwrap(), "pack/themeinfo.txt");
    }

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize("/a//b/").unwrap(), "a/b");
        assert_eq!(normalize("///").unwrap(), "");
        assert_eq!(normalize("").unwrap(), "");
    }

    #[test]
    fn test_normalize_rejects_traversal() {
        assert!(normalize("a/../b").is_err());
        assert!(normalize("./a").is_err());
    }

    #[test]
    fn test_strip_point() {
        assert_eq!(strip_point("pack/a.txt", "pack"), Some("a.txt"));
        assert_eq!(strip_point("pack", "pack"), Some(""));
        assert_eq!(strip_point("packed/a.txt", "pack"), None);
        assert_eq!(strip_point("a/b/c", ""), Some("a/b/c"));
    }

    #[test]
    fn test_point_under() {
        assert!(point_under("themes/dark", "themes"));
        assert!(point_under("themes", "themes"));
        assert!(!point_under("themes", "themes/dark"));
    }

    #[test]
    fn test_point_child() {
        assert_eq!(point_child("themes/dark", "themes"), Some("dark".to_string()));
        assert_eq!(point_child("themes/dark", ""), Some("themes".to_string()));
        assert_eq!(point_child("themes", "themes"), None);
        assert_eq!(point_child("themes", "sounds"), None);
    }
}
