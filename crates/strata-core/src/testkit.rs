//! In-memory fakes for the consumed interfaces (§6), used only by this
//! crate's own tests. Not exported outside `#[cfg(test)]`: no downstream
//! crate should be tempted to depend on test doubles instead of a real
//! format plug-in.

use crate::error::{Error, Result};
use crate::traits::*;
use std::collections::HashMap;
use std::io::{Read, Write};

/// A minimal in-memory archive: a flat map of path -> bytes, with a
/// transaction API that just snapshots/restores that map.
pub struct FakeArchive {
    entries: HashMap<String, Vec<u8>>,
    pending: Option<HashMap<String, Vec<u8>>>,
    single_entry: bool,
    writable: bool,
}

impl FakeArchive {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            pending: None,
            single_entry: false,
            writable: true,
        }
    }

    pub fn with_entry(name: &str, data: &[u8]) -> Self {
        let mut entries = HashMap::new();
        entries.insert(name.to_string(), data.to_vec());
        Self {
            entries,
            pending: None,
            single_entry: true,
            writable: true,
        }
    }

    pub fn with_entries(pairs: Vec<(&str, Vec<u8>)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(name, data)| (name.to_string(), data))
            .collect();
        Self {
            entries,
            pending: None,
            single_entry: false,
            writable: true,
        }
    }
}

impl Transactable for FakeArchive {
    fn start_transaction(&mut self) -> Result<()> {
        self.pending = Some(self.entries.clone());
        Ok(())
    }

    fn commit(&mut self, stream: &mut dyn WriteSeek) -> Result<()> {
        if let Some(pending) = self.pending.take() {
            self.entries = pending;
        }
        // A real archive serializes its format here; the fake writes a
        // stable but arbitrary marker so callers can assert something was
        // written.
        stream.write_all(b"FAKEARCHIVE")?;
        Ok(())
    }

    fn cancel(&mut self) {
        self.pending = None;
    }
}

impl Archive for FakeArchive {
    fn entries(&self) -> Vec<EntryId> {
        self.entries
            .keys()
            .cloned()
            .map(EntryId::ArchivePath)
            .collect()
    }

    fn find_by_path(&self, path: &str) -> Option<EntryId> {
        self.entries
            .contains_key(path)
            .then(|| EntryId::ArchivePath(path.to_string()))
    }

    fn find_first(&self) -> Option<EntryId> {
        self.entries.keys().next().cloned().map(EntryId::ArchivePath)
    }

    fn attributes(&self, entry: &EntryId) -> Result<EntryAttributes> {
        let path = match entry {
            EntryId::ArchivePath(p) => p,
            _ => return Err(Error::NotFound("not an archive entry".into())),
        };
        let data = self
            .entries
            .get(path)
            .ok_or_else(|| Error::NotFound(path.clone()))?;
        Ok(EntryAttributes {
            data_length: data.len() as u64,
            ..Default::default()
        })
    }

    fn extract_part(&self, entry: &EntryId, _fork: ForkKind, dest: &mut dyn Write) -> Result<()> {
        let path = match entry {
            EntryId::ArchivePath(p) => p,
            _ => return Err(Error::NotFound("not an archive entry".into())),
        };
        let data = self
            .entries
            .get(path)
            .ok_or_else(|| Error::NotFound(path.clone()))?;
        dest.write_all(data)?;
        Ok(())
    }

    fn create_record(&mut self, path: &str) -> Result<EntryId> {
        let target = self.pending.as_mut().unwrap_or(&mut self.entries);
        target.insert(path.to_string(), Vec::new());
        Ok(EntryId::ArchivePath(path.to_string()))
    }

    fn delete_record(&mut self, entry: &EntryId) -> Result<()> {
        if let EntryId::ArchivePath(p) = entry {
            let target = self.pending.as_mut().unwrap_or(&mut self.entries);
            target.remove(p);
        }
        Ok(())
    }

    fn add_part(
        &mut self,
        entry: &EntryId,
        _fork: ForkKind,
        source: &mut dyn PartSource,
        _compression: Option<&str>,
    ) -> Result<()> {
        if let EntryId::ArchivePath(p) = entry {
            let mut buf = Vec::new();
            source.read_to_end(&mut buf)?;
            let target = self.pending.as_mut().unwrap_or(&mut self.entries);
            target.insert(p.clone(), buf);
        }
        Ok(())
    }

    fn delete_part(&mut self, entry: &EntryId, _fork: ForkKind) -> Result<()> {
        self.delete_record(entry)
    }

    fn is_single_entry(&self) -> bool {
        self.single_entry
    }

    fn is_writable(&self) -> bool {
        self.writable
    }
}

/// A disk image whose body is either nothing, a single fake filesystem, or
/// a fake multi-partition layout.
pub enum FakeDiskBody {
    None,
    Filesystem(HashMap<String, Vec<u8>>),
    MultiPart(Vec<(String, HashMap<String, Vec<u8>>)>),
}

pub struct FakeDiskImage {
    body: FakeDiskBody,
    chunks: FakeChunkAccess,
    flushed: bool,
}

impl FakeDiskImage {
    pub fn empty() -> Self {
        Self {
            body: FakeDiskBody::None,
            chunks: FakeChunkAccess::new(0),
            flushed: false,
        }
    }

    pub fn with_filesystem(files: Vec<(&str, Vec<u8>)>) -> Self {
        let map = files.into_iter().map(|(n, d)| (n.to_string(), d)).collect();
        Self {
            body: FakeDiskBody::Filesystem(map),
            chunks: FakeChunkAccess::new(1440 * 512),
            flushed: false,
        }
    }

    pub fn with_partitions(partitions: Vec<(&str, Vec<(&str, Vec<u8>)>)>) -> Self {
        let parts = partitions
            .into_iter()
            .map(|(name, files)| {
                (
                    name.to_string(),
                    files.into_iter().map(|(n, d)| (n.to_string(), d)).collect(),
                )
            })
            .collect();
        Self {
            body: FakeDiskBody::MultiPart(parts),
            chunks: FakeChunkAccess::new(32 * 1024 * 1024),
            flushed: false,
        }
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }
}

impl DiskImage for FakeDiskImage {
    fn chunks(&self) -> &dyn ChunkAccess {
        &self.chunks
    }

    fn chunks_mut(&mut self) -> &mut dyn ChunkAccess {
        &mut self.chunks
    }

    fn analyze(&mut self) -> Result<DiskContents> {
        match &self.body {
            FakeDiskBody::None => Ok(DiskContents::None),
            FakeDiskBody::Filesystem(files) => {
                Ok(DiskContents::Filesystem(Box::new(FakeFilesystem::new(files.clone()))))
            }
            FakeDiskBody::MultiPart(parts) => {
                Ok(DiskContents::MultiPart(Box::new(FakeMultiPart::new(parts.clone()))))
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.flushed = true;
        Ok(())
    }

    fn notes(&self) -> Vec<String> {
        Vec::new()
    }

    fn is_dubious(&self) -> bool {
        false
    }

    fn is_damaged(&self) -> bool {
        false
    }
}

pub struct FakeFilesystem {
    files: HashMap<String, Vec<u8>>,
}

impl FakeFilesystem {
    pub fn new(files: HashMap<String, Vec<u8>>) -> Self {
        Self { files }
    }
}

impl Filesystem for FakeFilesystem {
    fn volume_dir(&self) -> DirEntry {
        DirEntry {
            id: EntryId::FilesystemEntry("<root>".into()),
            name: "<root>".into(),
            is_dir: true,
        }
    }

    fn iter_dir(&self, _dir: &DirEntry) -> Result<Vec<DirEntry>> {
        Ok(self
            .files
            .keys()
            .map(|name| DirEntry {
                id: EntryId::FilesystemEntry(name.clone()),
                name: name.clone(),
                is_dir: false,
            })
            .collect())
    }

    fn find_by_name(&self, _dir: &DirEntry, name: &str) -> Result<Option<DirEntry>> {
        Ok(self.files.contains_key(name).then(|| DirEntry {
            id: EntryId::FilesystemEntry(name.to_string()),
            name: name.to_string(),
            is_dir: false,
        }))
    }

    fn open_file(&self, entry: &DirEntry, _fork: ForkKind) -> Result<Box<dyn ReadSeek>> {
        let data = self
            .files
            .get(&entry.name)
            .ok_or_else(|| Error::NotFound(entry.name.clone()))?
            .clone();
        Ok(Box::new(std::io::Cursor::new(data)))
    }

    fn format_name(&self) -> &'static str {
        "fake"
    }

    fn raw_access(&self) -> &dyn ChunkAccess {
        unimplemented!("fake filesystem has no backing chunk accessor")
    }

    fn embedded_volumes(&self) -> Vec<EntryId> {
        Vec::new()
    }

    fn open_embedded(&self, id: &EntryId) -> Result<Box<dyn Filesystem>> {
        Err(Error::NotFound(format!("no embedded volume {id}")))
    }

    fn is_dubious(&self) -> bool {
        false
    }

    fn is_readonly(&self) -> bool {
        false
    }

    fn free_space(&self) -> Option<u64> {
        None
    }

    fn formatted_length(&self) -> u64 {
        self.files.values().map(|d| d.len() as u64).sum()
    }

    fn create_file(&mut self, _dir: &DirEntry, name: &str, is_dir: bool) -> Result<DirEntry> {
        self.files.insert(name.to_string(), Vec::new());
        Ok(DirEntry {
            id: EntryId::FilesystemEntry(name.to_string()),
            name: name.to_string(),
            is_dir,
        })
    }

    fn save_changes(&mut self, _entry: &DirEntry) -> Result<()> {
        Ok(())
    }
}

pub struct FakeMultiPart {
    partitions: Vec<(String, HashMap<String, Vec<u8>>)>,
}

impl FakeMultiPart {
    pub fn new(partitions: Vec<(String, HashMap<String, Vec<u8>>)>) -> Self {
        Self { partitions }
    }
}

impl MultiPart for FakeMultiPart {
    fn partitions(&self) -> Vec<EntryId> {
        (0..self.partitions.len() as u32)
            .map(EntryId::PartitionIndex)
            .collect()
    }

    fn partition_name(&self, id: &EntryId) -> Option<String> {
        if let EntryId::PartitionIndex(i) = id {
            self.partitions.get(*i as usize).map(|(name, _)| name.clone())
        } else {
            None
        }
    }

    fn partition_type(&self, _id: &EntryId) -> Option<String> {
        None
    }

    fn raw_access(&self, _id: &EntryId) -> &dyn ChunkAccess {
        unimplemented!("fake multipart has no backing chunk accessor")
    }

    fn open_filesystem(&self, id: &EntryId) -> Result<Box<dyn Filesystem>> {
        if let EntryId::PartitionIndex(i) = id {
            if let Some((_, files)) = self.partitions.get(*i as usize) {
                return Ok(Box::new(FakeFilesystem::new(files.clone())));
            }
        }
        Err(Error::NotFound(format!("no partition {id}")))
    }
}

pub struct FakeChunkAccess {
    length: u64,
    mode: AccessMode,
}

impl FakeChunkAccess {
    pub fn new(length: u64) -> Self {
        Self {
            length,
            mode: AccessMode::Open,
        }
    }
}

impl ChunkAccess for FakeChunkAccess {
    fn read_block(&self, _block: u32, buf: &mut [u8]) -> Result<()> {
        buf.fill(0);
        Ok(())
    }

    fn write_block(&mut self, _block: u32, _buf: &[u8]) -> Result<()> {
        if self.mode != AccessMode::Open {
            return Err(Error::NotWritable("chunk accessor not open".into()));
        }
        Ok(())
    }

    fn read_sector(&self, _track: u32, _sector: u32, buf: &mut [u8]) -> Result<()> {
        buf.fill(0);
        Ok(())
    }

    fn write_sector(&mut self, _track: u32, _sector: u32, _buf: &[u8]) -> Result<()> {
        if self.mode != AccessMode::Open {
            return Err(Error::NotWritable("chunk accessor not open".into()));
        }
        Ok(())
    }

    fn formatted_length(&self) -> u64 {
        self.length
    }

    fn num_tracks(&self) -> Option<u32> {
        None
    }

    fn sectors_per_track(&self) -> Option<u32> {
        None
    }

    fn access_mode(&self) -> AccessMode {
        self.mode
    }

    fn set_access_mode(&mut self, mode: AccessMode) {
        self.mode = mode;
    }
}
