//! TempStore (§4.5): scratch byte storage for extracting an inner
//! container's entry before descending into it. Backed by either an
//! in-memory buffer or a delete-on-close `tempfile::NamedTempFile`,
//! chosen by size the same way `strata_fs::Resource` picks between a
//! `Vec` and an mmap.

use crate::error::{Error, Result};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

/// Above this many bytes, scratch storage spills to a temp file instead of
/// growing a `Vec` in memory. Mirrors `strata_fs::DEFAULT_MMAP_THRESHOLD`'s
/// reasoning: most nested-archive entries are small.
pub const DEFAULT_SPILL_THRESHOLD: u64 = 8 * 1024 * 1024;

enum Backing {
    Memory(Cursor<Vec<u8>>),
    File(tempfile::NamedTempFile),
}

/// A scratch stream: writable while being filled, then seekable for
/// reads. Dropping it (without anything extracted first) frees the
/// backing storage — a temp file is unlinked by `tempfile` on drop, and a
/// memory buffer is simply deallocated.
pub struct TempStore {
    backing: Backing,
}

impl TempStore {
    /// Choose in-memory or temp-file backing based on an expected size
    /// hint. Passing `0` or an unknown size defaults to memory; callers
    /// that know the entry is large should pass the real size.
    pub fn new(expected_size_hint: u64) -> Result<Self> {
        if expected_size_hint >= DEFAULT_SPILL_THRESHOLD {
            Self::new_file()
        } else {
            Ok(Self::new_memory())
        }
    }

    pub fn new_memory() -> Self {
        Self {
            backing: Backing::Memory(Cursor::new(Vec::new())),
        }
    }

    pub fn new_file() -> Result<Self> {
        let file = tempfile::NamedTempFile::new().map_err(|e| Error::Io {
            path: std::env::temp_dir(),
            source: e,
        })?;
        Ok(Self {
            backing: Backing::File(file),
        })
    }

    /// Rewind and return every byte written so far.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        self.rewind()?;
        let mut buf = Vec::new();
        let result = match &mut self.backing {
            Backing::Memory(cursor) => cursor.read_to_end(&mut buf),
            Backing::File(file) => file.read_to_end(&mut buf),
        };
        result.map_err(|e| self.io_error(e))?;
        Ok(buf)
    }

    pub fn rewind(&mut self) -> Result<()> {
        let result = match &mut self.backing {
            Backing::Memory(cursor) => cursor.seek(SeekFrom::Start(0)),
            Backing::File(file) => file.seek(SeekFrom::Start(0)),
        };
        result.map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        let path = match &self.backing {
            Backing::Memory(_) => std::path::PathBuf::from("<scratch:memory>"),
            Backing::File(file) => file.path().to_path_buf(),
        };
        Error::Io { path, source }
    }
}

impl Write for TempStore {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.write(buf),
            Backing::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.flush(),
            Backing::File(file) => file.flush(),
        }
    }
}

impl Read for TempStore {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.read(buf),
            Backing::File(file) => file.read(buf),
        }
    }
}

impl Seek for TempStore {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match &mut self.backing {
            Backing::Memory(cursor) => cursor.seek(pos),
            Backing::File(file) => file.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backing_round_trips() {
        let mut store = TempStore::new_memory();
        store.write_all(b"hello").unwrap();
        assert_eq!(store.read_all().unwrap(), b"hello");
    }

    #[test]
    fn file_backing_round_trips() {
        let mut store = TempStore::new_file().unwrap();
        store.write_all(b"scratch bytes").unwrap();
        assert_eq!(store.read_all().unwrap(), b"scratch bytes");
    }

    #[test]
    fn size_hint_selects_backing() {
        let small = TempStore::new(1024).unwrap();
        assert!(matches!(small.backing, Backing::Memory(_)));

        let large = TempStore::new(DEFAULT_SPILL_THRESHOLD + 1).unwrap();
        assert!(matches!(large.backing, Backing::File(_)));
    }

    #[test]
    fn read_all_can_be_called_more_than_once() {
        let mut store = TempStore::new_memory();
        store.write_all(b"abc").unwrap();
        assert_eq!(store.read_all().unwrap(), b"abc");
        assert_eq!(store.read_all().unwrap(), b"abc");
    }
}
