use crate::permissions::PermissionMode;
use crate::{Error, Result};
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    pub permissions: Option<PermissionMode>,
    pub sync: bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permissions(mut self, mode: PermissionMode) -> Self {
        self.permissions = Some(mode);
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Write `content` to `path` via a sibling temp file plus rename, so a
/// reader never observes a partially-written file. This is the primitive
/// `ContainerNode::save` uses to swap in a freshly committed archive
/// stream without a window where the host file is truncated.
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8], options: AtomicWriteOptions) -> Result<()> {
    let path = path.as_ref();
    let parent = path.parent().ok_or_else(|| Error::Write {
        path: path.to_path_buf(),
        source: std::io::Error::other("path has no parent directory"),
    })?;

    let tmp_path = parent.join(format!(".strata-tmp-{}", uuid::Uuid::new_v4()));

    fs::write(&tmp_path, content).map_err(|e| Error::Write {
        path: tmp_path.clone(),
        source: e,
    })?;

    if let Some(mode) = options.permissions {
        mode.apply_to_path(&tmp_path)?;
    }

    if options.sync {
        let file = fs::File::open(&tmp_path).map_err(|e| Error::Write {
            path: tmp_path.clone(),
            source: e,
        })?;
        file.sync_all().map_err(|e| Error::Write {
            path: tmp_path.clone(),
            source: e,
        })?;
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::Write {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

pub fn atomic_read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_and_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        atomic_write(&path, b"hello world", AtomicWriteOptions::new()).unwrap();
        assert_eq!(atomic_read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        atomic_write(&path, b"data", AtomicWriteOptions::new()).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".strata-tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn applies_requested_permissions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        atomic_write(
            &path,
            b"data",
            AtomicWriteOptions::new().permissions(PermissionMode::Custom(0o600)),
        )
        .unwrap();
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn overwrite_replaces_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        atomic_write(&path, b"first", AtomicWriteOptions::new()).unwrap();
        atomic_write(&path, b"second", AtomicWriteOptions::new()).unwrap();
        assert_eq!(atomic_read(&path).unwrap(), b"second");
    }
}
