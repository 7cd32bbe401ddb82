use crate::Result;
use std::path::{Path, PathBuf};

/// A scoped staging directory: files are written under `path()`, and
/// `commit()` atomically swaps them into `dest`. Dropping without
/// committing removes the staging directory, which is exactly the
/// "scratch storage must not leak" guarantee spec.md asks of `TempStore`
/// and of cancellation in `TransactionCoordinator`.
pub struct Workspace {
    staging: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl Workspace {
    pub fn new(staging_dir: impl AsRef<Path>, dest_dir: impl AsRef<Path>) -> Result<Self> {
        let staging = staging_dir.as_ref().to_path_buf();
        let dest = dest_dir.as_ref().to_path_buf();

        if !staging.exists() {
            std::fs::create_dir_all(&staging).map_err(|e| crate::Error::Write {
                path: staging.clone(),
                source: e,
            })?;
        }

        Ok(Self {
            staging,
            dest,
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.staging
    }

    pub fn commit(mut self) -> Result<()> {
        crate::primitives::replace_dir(&self.staging, &self.dest, Default::default())?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_dir_all(&self.staging);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn commit_moves_staged_content_into_dest() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("staging");
        let dest = dir.path().join("dest");
        let workspace = Workspace::new(&staging, &dest).unwrap();
        std::fs::write(staging.join("file.txt"), "data").unwrap();
        workspace.commit().unwrap();
        assert!(dest.join("file.txt").exists());
    }

    #[test]
    fn drop_without_commit_cleans_up() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("staging");
        {
            let workspace = Workspace::new(&staging, dir.path().join("dest")).unwrap();
            std::fs::write(staging.join("file.txt"), "data").unwrap();
            assert!(staging.exists());
        }
        assert!(!staging.exists());
    }
}
