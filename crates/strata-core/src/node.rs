//! ContainerNode (§3, §4.3): the tree node wrapping one host file, archive,
//! disk image, or partition. Parent links are back-references used only
//! for lookup; children are owned strongly. Kind is a tagged enum per the
//! design note preferring a sum type over inheritance.

use crate::error::{Error, Result};
use crate::tempstore::TempStore;
use crate::traits::{Archive, DiskImage, EntryId, Filesystem};
use std::collections::HashMap;

/// Index into the tree-owned arena (see [`crate::engine::Tree`]). Acts as
/// the "back reference" from child to parent: a plain identifier looked up
/// through the arena, never a strong reciprocal edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

pub enum Kind {
    HostFile,
    Archive,
    DiskImage,
    Partition,
}

/// The typed payload a node owns. Each variant carries the handle plus the
/// byte stream it reads/writes, matching the "duck-typed content" design
/// note: commands dispatch on the variant, never on a shared base type.
pub enum Content {
    HostFile {
        transaction: strata_fs::Transaction,
    },
    Archive {
        archive: Box<dyn Archive>,
        transaction_open: bool,
    },
    DiskImage {
        disk: Box<dyn DiskImage>,
    },
    Partition {
        filesystem: Option<Box<dyn Filesystem>>,
    },
}

/// One node in the container tree.
pub struct ContainerNode {
    pub kind: Kind,
    pub parent: Option<NodeId>,
    pub content: Content,
    /// Set only when this node was created by extracting an entry of its
    /// parent; identifies which entry to notify on save.
    pub entry_in_parent: Option<EntryId>,
    pub children: HashMap<EntryId, NodeId>,
    dirty: bool,
}

impl ContainerNode {
    pub fn new_host_file(transaction: strata_fs::Transaction) -> Self {
        Self {
            kind: Kind::HostFile,
            parent: None,
            content: Content::HostFile { transaction },
            entry_in_parent: None,
            children: HashMap::new(),
            dirty: false,
        }
    }

    pub fn as_host_transaction(&self) -> Option<&strata_fs::Transaction> {
        match &self.content {
            Content::HostFile { transaction } => Some(transaction),
            _ => None,
        }
    }

    /// Write fresh bytes directly into the host file. Called when an
    /// Archive node's parent is the HostFile root itself, the terminal
    /// case of "write new bytes back" that §4.3 spells out explicitly
    /// only for a Filesystem parent.
    pub fn write_host_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        match &self.content {
            Content::HostFile { transaction } => {
                transaction.write(bytes)?;
                self.clear_dirty();
                Ok(())
            }
            _ => Err(Error::Unsupported("write_host_bytes on non-HostFile node")),
        }
    }

    /// Replace this node's content in place once `StreamIdentifier` has
    /// recognized the host file's bytes as an archive. Used only on the
    /// root node, right after `new_host_file`: `parent` and
    /// `entry_in_parent` stay `None`, this is still the root.
    pub fn become_archive(&mut self, archive: Box<dyn Archive>) {
        self.kind = Kind::Archive;
        self.content = Content::Archive {
            archive,
            transaction_open: false,
        };
    }

    /// As [`Self::become_archive`], for a host file recognized as a disk
    /// image.
    pub fn become_disk_image(&mut self, disk: Box<dyn DiskImage>) {
        self.kind = Kind::DiskImage;
        self.content = Content::DiskImage { disk };
    }

    pub fn new_archive(
        parent: NodeId,
        entry_in_parent: Option<EntryId>,
        archive: Box<dyn Archive>,
    ) -> Self {
        Self {
            kind: Kind::Archive,
            parent: Some(parent),
            content: Content::Archive {
                archive,
                transaction_open: false,
            },
            entry_in_parent,
            children: HashMap::new(),
            dirty: false,
        }
    }

    pub fn new_disk_image(
        parent: NodeId,
        entry_in_parent: Option<EntryId>,
        disk: Box<dyn DiskImage>,
    ) -> Self {
        Self {
            kind: Kind::DiskImage,
            parent: Some(parent),
            content: Content::DiskImage { disk },
            entry_in_parent,
            children: HashMap::new(),
            dirty: false,
        }
    }

    pub fn new_partition(parent: NodeId, entry_in_parent: Option<EntryId>) -> Self {
        Self {
            kind: Kind::Partition,
            parent: Some(parent),
            content: Content::Partition { filesystem: None },
            entry_in_parent,
            children: HashMap::new(),
            dirty: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Begin a transaction on this node's archive content, if it has one
    /// and none is open yet. No-op for non-Archive nodes.
    pub fn ensure_transaction_open(&mut self) -> Result<()> {
        if let Content::Archive {
            archive,
            transaction_open,
        } = &mut self.content
        {
            if !*transaction_open {
                archive.start_transaction()?;
                *transaction_open = true;
            }
        }
        Ok(())
    }

    /// Serialize this node's content into its owned stream. Called
    /// bottom-up by the coordinator; does not recurse into children (the
    /// coordinator walks post-order itself).
    ///
    /// Returns `Some(new_scratch_bytes)` when an Archive node rewrote
    /// itself into fresh scratch storage, so the caller can mark the
    /// parent entry's data as replaced.
    pub fn save(&mut self) -> Result<Option<Vec<u8>>> {
        match &mut self.content {
            Content::HostFile { .. } => Ok(None),
            Content::Archive {
                archive,
                transaction_open,
            } => {
                if !*transaction_open {
                    // Nothing was mutated through the transactional API;
                    // dirty must have come from a child, which already
                    // replaced bytes via `add_part`/`delete_part` inside
                    // an open transaction started when the write occurred.
                    self.clear_dirty();
                    return Ok(None);
                }

                let mut fresh = TempStore::new_memory();
                archive.commit(&mut fresh)?;
                let bytes = fresh.read_all()?;

                *transaction_open = false;
                self.clear_dirty();

                Ok(Some(bytes))
            }
            Content::DiskImage { disk } => {
                disk.flush()?;
                self.clear_dirty();
                Ok(None)
            }
            Content::Partition { .. } => {
                // Delegated to the containing DiskImage's flush (§4.3).
                self.clear_dirty();
                Ok(None)
            }
        }
    }

    pub fn cancel_transaction(&mut self) {
        if let Content::Archive {
            archive,
            transaction_open,
        } = &mut self.content
        {
            if *transaction_open {
                archive.cancel();
                *transaction_open = false;
            }
        }
    }

    pub fn as_archive(&self) -> Option<&dyn Archive> {
        match &self.content {
            Content::Archive { archive, .. } => Some(archive.as_ref()),
            _ => None,
        }
    }

    pub fn as_archive_mut(&mut self) -> Option<&mut Box<dyn Archive>> {
        match &mut self.content {
            Content::Archive { archive, .. } => Some(archive),
            _ => None,
        }
    }

    pub fn as_disk_image(&self) -> Option<&dyn DiskImage> {
        match &self.content {
            Content::DiskImage { disk } => Some(disk.as_ref()),
            _ => None,
        }
    }

    pub fn as_disk_image_mut(&mut self) -> Option<&mut Box<dyn DiskImage>> {
        match &mut self.content {
            Content::DiskImage { disk } => Some(disk),
            _ => None,
        }
    }

    pub fn filesystem(&self) -> Option<&dyn Filesystem> {
        match &self.content {
            Content::Partition { filesystem } => filesystem.as_deref(),
            _ => None,
        }
    }

    pub fn set_filesystem(&mut self, fs: Box<dyn Filesystem>) -> Result<()> {
        match &mut self.content {
            Content::Partition { filesystem } => {
                *filesystem = Some(fs);
                Ok(())
            }
            _ => Err(Error::Unsupported("set_filesystem on non-Partition node")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::FakeArchive;

    #[test]
    fn new_node_is_not_dirty() {
        let node = ContainerNode::new_archive(NodeId(0), None, Box::new(FakeArchive::empty()));
        assert!(!node.is_dirty());
    }

    #[test]
    fn mark_dirty_then_save_clears_flag_without_open_transaction() {
        let mut node =
            ContainerNode::new_archive(NodeId(0), None, Box::new(FakeArchive::empty()));
        node.mark_dirty();
        let result = node.save().unwrap();
        assert!(result.is_none());
        assert!(!node.is_dirty());
    }

    #[test]
    fn save_with_open_transaction_produces_fresh_bytes() {
        let mut node =
            ContainerNode::new_archive(NodeId(0), None, Box::new(FakeArchive::empty()));
        node.ensure_transaction_open().unwrap();
        node.mark_dirty();
        let result = node.save().unwrap();
        assert!(result.is_some());
        assert!(!node.is_dirty());
    }
}
