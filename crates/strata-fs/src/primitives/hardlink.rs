use crate::{Error, Result};
use std::path::Path;

#[derive(Clone, Copy, Debug, Default)]
pub enum FallbackStrategy {
    #[default]
    Copy,
    Error,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HardlinkOrCopyOptions {
    pub fallback: FallbackStrategy,
}

impl HardlinkOrCopyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fallback(mut self, fallback: FallbackStrategy) -> Self {
        self.fallback = fallback;
        self
    }
}

/// Hardlink `src` to `dest`, falling back to a copy when the two paths
/// sit on different devices (or the platform has no hardlink support).
pub fn hardlink_or_copy(
    src: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: HardlinkOrCopyOptions,
) -> Result<()> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    let src_metadata = std::fs::metadata(src).map_err(|e| Error::Read {
        path: src.to_path_buf(),
        source: e,
    })?;

    if src_metadata.is_dir() {
        return if matches!(options.fallback, FallbackStrategy::Copy) {
            crate::primitives::copy_dir::copy_dir_all(src, dest)
        } else {
            Err(Error::CrossDeviceHardlink)
        };
    }

    match std::fs::hard_link(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            if matches!(options.fallback, FallbackStrategy::Copy) {
                std::fs::copy(src, dest).map(drop).map_err(|e| Error::Write {
                    path: dest.to_path_buf(),
                    source: e,
                })
            } else {
                Err(Error::CrossDeviceHardlink)
            }
        }
        Err(e) => Err(Error::Write {
            path: dest.to_path_buf(),
            source: e,
        }),
    }
}

fn is_cross_device(e: &std::io::Error) -> bool {
    #[cfg(unix)]
    {
        e.raw_os_error() == Some(18) // EXDEV
    }
    #[cfg(not(unix))]
    {
        let _ = e;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn hardlinks_a_file() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dest = dir.path().join("dest.txt");
        std::fs::write(&src, "data").unwrap();

        hardlink_or_copy(&src, &dest, HardlinkOrCopyOptions::new()).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"data");
    }

    #[test]
    fn copies_a_directory_instead_of_linking() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("f.txt"), "data").unwrap();

        hardlink_or_copy(&src, &dest, HardlinkOrCopyOptions::new()).unwrap();
        assert!(dest.join("f.txt").exists());
    }
}
