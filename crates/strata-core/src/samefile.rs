//! SameFileDetector (§4.7): decide whether two host paths name the same
//! host file. Errs conservative: two differently-spelled paths that might
//! be the same file are treated as the same file, because a false
//! "different" risks the forbidden double-open (P7), while a false "same"
//! only costs the caller a needlessly rejected second open.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

fn normalize(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|_| Error::NotFound(path.display().to_string()))
}

/// True if `path_a` and `path_b` refer to the same host file.
///
/// Both paths must exist; a missing file is `Error::NotFound`. Comparison
/// canonicalizes each path (resolving `.`/`..` and, on platforms where
/// `canonicalize` follows them, symlinks) and then compares
/// case-insensitively regardless of whether the host filesystem is
/// actually case-sensitive — see the open question in the design notes
/// about symlinks and case variants on a case-sensitive volume, resolved
/// here in favor of the conservative "same" answer.
pub fn is_same_host_file(path_a: impl AsRef<Path>, path_b: impl AsRef<Path>) -> Result<bool> {
    let a = normalize(path_a.as_ref())?;
    let b = normalize(path_b.as_ref())?;

    let a_str = a.to_string_lossy().to_ascii_lowercase();
    let b_str = b.to_string_lossy().to_ascii_lowercase();

    Ok(a_str == b_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn identical_paths_are_the_same_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.zip");
        std::fs::write(&path, b"data").unwrap();
        assert!(is_same_host_file(&path, &path).unwrap());
    }

    #[test]
    #[serial_test::serial]
    fn relative_and_absolute_paths_to_the_same_file_match() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.zip");
        std::fs::write(&path, b"data").unwrap();

        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = is_same_host_file("./x.zip", &path);
        std::env::set_current_dir(cwd).unwrap();

        assert!(result.unwrap());
    }

    #[test]
    fn distinct_files_are_not_the_same() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.zip");
        let b = dir.path().join("b.zip");
        std::fs::write(&a, b"data").unwrap();
        std::fs::write(&b, b"other").unwrap();
        assert!(!is_same_host_file(&a, &b).unwrap());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.zip");
        let present = dir.path().join("present.zip");
        std::fs::write(&present, b"data").unwrap();
        assert!(matches!(
            is_same_host_file(&missing, &present),
            Err(Error::NotFound(_))
        ));
    }
}
