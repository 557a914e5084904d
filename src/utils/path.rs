//! Path normalization utilities.
//!
//! Pure functions for path manipulation. No side effects.

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Expand `~` and resolve a configured path relative to the project root.
///
/// Absolute paths (after tilde expansion) are kept as-is.
pub fn resolve_config_path(raw: &Path, root: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&raw.to_string_lossy()).into_owned();
    let expanded = PathBuf::from(expanded);
    if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_absolute() {
        let path = Path::new("/absolute/path/file.txt");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_path_relative() {
        let path = Path::new("relative/path/file.txt");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_path_resolves_dots() {
        let temp = tempfile::TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        let dotted = nested.join("..").join("b");
        assert_eq!(normalize_path(&dotted), normalize_path(&nested));
    }

    #[test]
    fn test_resolve_config_path_relative() {
        let resolved = resolve_config_path(Path::new("src"), Path::new("/project"));
        assert_eq!(resolved, PathBuf::from("/project/src"));
    }

    #[test]
    fn test_resolve_config_path_absolute() {
        let resolved = resolve_config_path(Path::new("/elsewhere/src"), Path::new("/project"));
        assert_eq!(resolved, PathBuf::from("/elsewhere/src"));
    }
}
