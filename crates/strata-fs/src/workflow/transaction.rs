use crate::{Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// An exclusive host-file lock held for the duration of a single save.
/// `strata-core`'s `TransactionCoordinator` does not rely on OS locks for
/// the "one open per host file" invariant (the Resolver's reuse rule
/// handles that within a process), but it uses `Transaction` around the
/// final rename into the host file so a second *process* opening the same
/// file mid-save sees either the old or the new bytes, never a partial
/// write colliding with its own read.
pub struct Transaction {
    file: File,
    path: PathBuf,
}

impl Transaction {
    fn open(path: impl AsRef<Path>) -> Result<File> {
        File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::Write {
                path: path.as_ref().to_path_buf(),
                source: e,
            })
    }

    pub fn open_locked(path: impl AsRef<Path>) -> Result<Self> {
        let file = Self::open(path.as_ref())?;
        let path = path.as_ref().to_path_buf();
        file.lock_exclusive().map_err(|e| Error::Lock {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self { file, path })
    }

    pub fn try_open_locked(path: impl AsRef<Path>) -> Result<Self> {
        let file = Self::open(path.as_ref())?;
        let path = path.as_ref().to_path_buf();
        file.try_lock_exclusive().map_err(|e| Error::Lock {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| Error::Read {
            path: self.path.clone(),
            source: e,
        })
    }

    pub fn write(&self, data: &[u8]) -> Result<()> {
        crate::primitives::atomic_write(&self.path, data, Default::default())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.bin");
        let tx = Transaction::open_locked(&path).unwrap();
        tx.write(b"data").unwrap();
        assert_eq!(tx.read().unwrap(), b"data");
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.bin");
        {
            let _tx = Transaction::open_locked(&path).unwrap();
        }
        // A second lock attempt must succeed now that the first was dropped.
        Transaction::try_open_locked(&path).unwrap();
    }
}
