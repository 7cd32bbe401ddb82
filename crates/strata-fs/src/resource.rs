use crate::{Error, Result};
use std::borrow::Cow;
use std::path::Path;

/// Threshold above which [`Resource::content`] maps the file instead of
/// reading it into a `Vec`. Nested-archive entries are usually small
/// (ShrinkIt/ZIP members), so the default favors the simple path; callers
/// extracting whole disk images should raise it via [`ResourceOptions::with_mmap_threshold`].
const DEFAULT_MMAP_THRESHOLD: u64 = 8 * 1024 * 1024;

#[derive(Clone, Copy, Debug)]
pub struct ResourceOptions {
    mmap_threshold: u64,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mmap_threshold(mut self, bytes: u64) -> Self {
        self.mmap_threshold = bytes;
        self
    }

    pub fn mmap_threshold(&self) -> u64 {
        self.mmap_threshold
    }
}

/// A host-file-backed resource whose mtime is pinned at open time. Used by
/// `strata-core::node::ContainerNode` as the byte stream a `HostFile` node
/// owns: `ensure_integrity` lets the node detect if something outside the
/// tree touched the file between open and save.
pub struct Resource<'a> {
    path: Cow<'a, Path>,
    options: ResourceOptions,
    initial_mtime: Option<std::time::SystemTime>,
}

impl<'a> Resource<'a> {
    pub fn new(path: impl Into<Cow<'a, Path>>) -> Result<Self> {
        Self::with_options(path, ResourceOptions::default())
    }

    pub fn with_options(path: impl Into<Cow<'a, Path>>, options: ResourceOptions) -> Result<Self> {
        let path = path.into();
        let metadata = path
            .metadata()
            .map_err(|_| Error::NotFound(path.to_path_buf()))?;

        Ok(Self {
            path,
            options,
            initial_mtime: metadata.modified().ok(),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_ref()
    }

    /// Detect whether the underlying file changed since this resource was
    /// opened. The resolver calls this before handing a leaf to a caller a
    /// second time so a stale read never silently succeeds.
    pub fn ensure_integrity(&self) -> Result<()> {
        let current = self
            .path
            .metadata()
            .map_err(|e| Error::Read {
                path: self.path.to_path_buf(),
                source: e,
            })?
            .modified()
            .ok();

        if current != self.initial_mtime {
            return Err(Error::ModifiedExternally(self.path.to_path_buf()));
        }
        Ok(())
    }

    pub fn metadata(&self) -> Result<std::fs::Metadata> {
        self.path.as_ref().metadata().map_err(|e| Error::Read {
            path: self.path.to_path_buf(),
            source: e,
        })
    }

    pub fn size(&self) -> Result<u64> {
        self.metadata().map(|m| m.len())
    }

    pub fn is_dir(&self) -> bool {
        self.path.as_ref().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.path.as_ref().is_file()
    }

    pub fn content(&self) -> Result<Content> {
        self.ensure_integrity()?;
        let size = self.size()?;

        if size < self.options.mmap_threshold() {
            let data = std::fs::read(self.path.as_ref()).map_err(|e| Error::Read {
                path: self.path.to_path_buf(),
                source: e,
            })?;
            Ok(Content::Small(data))
        } else {
            let file = std::fs::File::open(self.path.as_ref()).map_err(|e| Error::Read {
                path: self.path.to_path_buf(),
                source: e,
            })?;
            // SAFETY: the mapped file is not concurrently mutated outside
            // this process per spec.md's single-process-access non-goal.
            let mmap = unsafe {
                memmap2::MmapOptions::new()
                    .map(&file)
                    .map_err(|_| Error::Other("mmap failed".into()))?
            };
            Ok(Content::Mmap(mmap))
        }
    }

    pub fn read_all(self) -> Result<Vec<u8>> {
        self.content()?.to_vec()
    }
}

pub enum Content {
    Small(Vec<u8>),
    Mmap(memmap2::Mmap),
}

impl Content {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Content::Small(data) => data.as_slice(),
            Content::Mmap(mmap) => mmap.as_ref(),
        }
    }

    pub fn to_vec(self) -> Result<Vec<u8>> {
        match self {
            Content::Small(data) => Ok(data),
            Content::Mmap(mmap) => Ok(mmap.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reports_size_and_kind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello").unwrap();
        let resource = Resource::new(&path).unwrap();
        assert_eq!(resource.size().unwrap(), 5);
        assert!(resource.is_file());
    }

    #[test]
    fn reads_small_content_inline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello world").unwrap();
        let resource = Resource::new(&path).unwrap();
        assert_eq!(resource.content().unwrap().as_slice(), b"hello world");
    }

    #[test]
    fn detects_external_modification() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello").unwrap();
        let resource = Resource::new(&path).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(&path, "goodbye!").unwrap();

        // mtime resolution on some filesystems is coarse; only assert when
        // the write was actually observed as a change.
        if resource.ensure_integrity().is_err() {
            assert!(matches!(
                resource.ensure_integrity(),
                Err(Error::ModifiedExternally(_))
            ));
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        assert!(matches!(Resource::new(&path), Err(Error::NotFound(_))));
    }
}
