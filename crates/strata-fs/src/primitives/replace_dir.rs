use crate::{Error, Result};
use std::path::Path;

pub struct ReplaceDirOptions {
    pub retry_count: u32,
    pub retry_delay: std::time::Duration,
}

impl Default for ReplaceDirOptions {
    fn default() -> Self {
        Self {
            retry_count: 5,
            retry_delay: std::time::Duration::from_millis(100),
        }
    }
}

impl ReplaceDirOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    pub fn retry_delay(mut self, delay: std::time::Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

/// Atomically swap `dest` for the contents of `src`, used by
/// `Workspace::commit` to move a staged extraction into place in one step.
pub fn replace_dir(
    src: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: ReplaceDirOptions,
) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    #[cfg(unix)]
    {
        if dest.exists() {
            std::fs::remove_dir_all(dest).map_err(|e| Error::ReplaceDir {
                path: dest.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::rename(src, dest).map_err(|e| Error::ReplaceDir {
            path: dest.to_path_buf(),
            source: e,
        })
    }

    #[cfg(windows)]
    {
        let mut attempts = 0;
        loop {
            if dest.exists() {
                if let Err(e) = std::fs::remove_dir_all(dest) {
                    attempts += 1;
                    if attempts >= options.retry_count {
                        return Err(Error::ReplaceDir {
                            path: dest.to_path_buf(),
                            source: e,
                        });
                    }
                    std::thread::sleep(options.retry_delay * attempts);
                    continue;
                }
            }

            match std::fs::rename(src, dest) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempts += 1;
                    if attempts >= options.retry_count {
                        return Err(Error::ReplaceDir {
                            path: dest.to_path_buf(),
                            source: e,
                        });
                    }
                    std::thread::sleep(options.retry_delay * attempts);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn moves_staged_contents_into_place() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("file.txt"), "data").unwrap();

        replace_dir(&src, &dest, ReplaceDirOptions::new()).unwrap();
        assert!(dest.join("file.txt").exists());
        assert!(!src.exists());
    }

    #[test]
    fn replaces_an_existing_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("stale.txt"), "old").unwrap();
        std::fs::write(src.join("fresh.txt"), "new").unwrap();

        replace_dir(&src, &dest, ReplaceDirOptions::new()).unwrap();
        assert!(dest.join("fresh.txt").exists());
        assert!(!dest.join("stale.txt").exists());
    }
}
