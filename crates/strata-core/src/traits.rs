//! Interfaces consumed from format plug-ins (§6 "Consumed"). The core never
//! knows a concrete format; it only calls through these capability sets.
//! Implementations live outside this crate (ZIP, NuFX, ProDOS, HFS, ...);
//! `testkit` provides in-memory fakes for exercising the engine in tests.

use crate::error::Result;
use std::io::{Read, Seek, Write};

/// A parent-local identifier for an entry within some container. Archive
/// entries use a path string; disk images use a partition index or name;
/// filesystems use whatever reference their plug-in defines. Kept as an
/// opaque newtype so `ContainerNode::children` can key on it without the
/// core caring about per-format shapes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntryId {
    ArchivePath(String),
    PartitionIndex(u32),
    PartitionName(String),
    FilesystemEntry(String),
    EmbeddedVolume(u32),
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryId::ArchivePath(p) => write!(f, "{p}"),
            EntryId::PartitionIndex(i) => write!(f, "#{i}"),
            EntryId::PartitionName(n) => write!(f, "{n}"),
            EntryId::FilesystemEntry(n) => write!(f, "{n}"),
            EntryId::EmbeddedVolume(i) => write!(f, "vol#{i}"),
        }
    }
}

/// Which data stream of an entry a part operation addresses. Most formats
/// only use `Data`; `Resource` exists for AppleSingle/AppleDouble/MacBinary
/// style forked files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForkKind {
    Data,
    Resource,
}

#[derive(Clone, Debug, Default)]
pub struct EntryAttributes {
    pub data_length: u64,
    pub resource_length: u64,
    pub compressed_size: u64,
    pub compression_tag: Option<String>,
    pub file_type: Option<String>,
    pub modified: Option<std::time::SystemTime>,
    pub readonly: bool,
    pub comment: Option<String>,
}

/// A source of bytes for `add_part`: either a complete in-memory buffer or
/// anything implementing `Read`, so callers can stream a large file into an
/// archive without materializing it first.
pub trait PartSource: Read {}
impl<T: Read> PartSource for T {}

/// Transaction lifecycle shared by every Archive implementation (§4.6).
/// `start` begins a new transaction; `commit` serializes the whole archive
/// (including any pending record/part edits) into `stream`; `cancel`
/// discards pending edits without touching `stream`.
pub trait Transactable {
    fn start_transaction(&mut self) -> Result<()>;
    fn commit(&mut self, stream: &mut dyn WriteSeek) -> Result<()>;
    fn cancel(&mut self);
}

pub trait WriteSeek: Write + Seek {}
impl<T: Write + Seek> WriteSeek for T {}

/// A file archive: ZIP, NuFX, Binary II, gzip, AppleSingle, MacBinary, ...
pub trait Archive: Transactable {
    fn entries(&self) -> Vec<EntryId>;
    fn find_by_path(&self, path: &str) -> Option<EntryId>;
    fn find_first(&self) -> Option<EntryId>;

    fn attributes(&self, entry: &EntryId) -> Result<EntryAttributes>;

    /// Extract one entry's fork into `dest`. Used by the resolver to
    /// populate scratch storage before descending into a nested archive.
    fn extract_part(&self, entry: &EntryId, fork: ForkKind, dest: &mut dyn Write) -> Result<()>;

    fn create_record(&mut self, path: &str) -> Result<EntryId>;
    fn delete_record(&mut self, entry: &EntryId) -> Result<()>;
    fn add_part(
        &mut self,
        entry: &EntryId,
        fork: ForkKind,
        source: &mut dyn PartSource,
        compression: Option<&str>,
    ) -> Result<()>;
    fn delete_part(&mut self, entry: &EntryId, fork: ForkKind) -> Result<()>;

    /// True for gzip, AppleSingle, and other formats that hold exactly one
    /// logical entry. Consulted by the resolver's skip-simple rule.
    fn is_single_entry(&self) -> bool;
    fn is_writable(&self) -> bool;
}

/// What a disk image's body turns out to be, once [`DiskImage::analyze`]
/// has run.
pub enum DiskContents {
    Filesystem(Box<dyn Filesystem>),
    MultiPart(Box<dyn MultiPart>),
    None,
}

pub trait DiskImage {
    fn chunks(&self) -> &dyn ChunkAccess;
    fn chunks_mut(&mut self) -> &mut dyn ChunkAccess;

    /// Perform full-depth analysis (sector order, then filesystem or
    /// multi-partition layout). Downstream commands assume this has run to
    /// completion, per §4.2.
    fn analyze(&mut self) -> Result<DiskContents>;

    fn flush(&mut self) -> Result<()>;

    fn notes(&self) -> Vec<String>;
    fn is_dubious(&self) -> bool;
    fn is_damaged(&self) -> bool;
}

/// A filesystem-entry reference returned while walking a directory tree.
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub id: EntryId,
    pub name: String,
    pub is_dir: bool,
}

pub trait Filesystem {
    fn volume_dir(&self) -> DirEntry;
    fn iter_dir(&self, dir: &DirEntry) -> Result<Vec<DirEntry>>;
    fn find_by_name(&self, dir: &DirEntry, name: &str) -> Result<Option<DirEntry>>;

    /// Open one entry's data fork as a seekable byte stream.
    fn open_file(&self, entry: &DirEntry, fork: ForkKind) -> Result<Box<dyn ReadSeek>>;

    fn format_name(&self) -> &'static str;
    fn raw_access(&self) -> &dyn ChunkAccess;

    fn embedded_volumes(&self) -> Vec<EntryId>;
    fn open_embedded(&self, id: &EntryId) -> Result<Box<dyn Filesystem>>;

    fn is_dubious(&self) -> bool;
    fn is_readonly(&self) -> bool;
    fn free_space(&self) -> Option<u64>;
    fn formatted_length(&self) -> u64;

    fn create_file(&mut self, dir: &DirEntry, name: &str, is_dir: bool) -> Result<DirEntry>;
    fn save_changes(&mut self, entry: &DirEntry) -> Result<()>;
}

pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

pub trait MultiPart {
    fn partitions(&self) -> Vec<EntryId>;
    fn partition_name(&self, id: &EntryId) -> Option<String>;
    fn partition_type(&self, id: &EntryId) -> Option<String>;
    fn raw_access(&self, id: &EntryId) -> &dyn ChunkAccess;

    /// Derive one partition's filesystem, analogous to
    /// [`DiskImage::analyze`] but scoped to a single partition's raw bytes.
    fn open_filesystem(&self, id: &EntryId) -> Result<Box<dyn Filesystem>>;
}

/// How a filesystem has claimed a disk's underlying accessor (§4.8).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMode {
    Open,
    ReadOnly,
    Closed,
}

pub trait ChunkAccess {
    fn read_block(&self, block: u32, buf: &mut [u8]) -> Result<()>;
    fn write_block(&mut self, block: u32, buf: &[u8]) -> Result<()>;

    fn read_sector(&self, track: u32, sector: u32, buf: &mut [u8]) -> Result<()>;
    fn write_sector(&mut self, track: u32, sector: u32, buf: &[u8]) -> Result<()>;

    fn formatted_length(&self) -> u64;
    fn num_tracks(&self) -> Option<u32>;
    fn sectors_per_track(&self) -> Option<u32>;

    fn access_mode(&self) -> AccessMode;
    fn set_access_mode(&mut self, mode: AccessMode);
}
