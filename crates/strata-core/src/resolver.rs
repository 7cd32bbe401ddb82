//! Resolver (§4.4): walk extended-archive path components against an open
//! ContainerNode tree, producing or reusing nodes as it goes.

use crate::access::AccessGate;
use crate::error::{Error, Result};
use crate::hook::Hook;
use crate::identify::ProbeRegistry;
use crate::node::{ContainerNode, Content, NodeId};
use crate::tempstore::TempStore;
use crate::traits::{
    AccessMode, Archive, DirEntry, DiskContents, EntryId, Filesystem, ForkKind, MultiPart,
};
use std::io::Write;

/// The in-memory arena backing a single open host file's container tree.
/// Nodes are never removed individually; the whole arena is dropped (in
/// reverse insertion order, satisfying the LIFO teardown rule) when the
/// tree itself is dropped.
pub struct Tree {
    nodes: Vec<ContainerNode>,
    pub root: NodeId,
}

impl Tree {
    pub fn new(root_node: ContainerNode) -> Self {
        Self {
            nodes: vec![root_node],
            root: NodeId(0),
        }
    }

    pub fn get(&self, id: NodeId) -> &ContainerNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut ContainerNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn push(&mut self, node: ContainerNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node id in the order it was created. The coordinator walks
    /// this in reverse for post-order save, and `close_tree` drops in the
    /// same reverse order (§8 scenario 1).
    pub fn insertion_order(&self) -> Vec<NodeId> {
        (0..self.nodes.len()).map(NodeId).collect()
    }

    fn mark_ancestors_dirty(&mut self, mut id: NodeId) {
        loop {
            self.get_mut(id).mark_dirty();
            match self.get(id).parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
    }
}

impl Drop for Tree {
    /// Nodes are appended in creation order, so popping from the back
    /// drops the most recently created node first — LIFO, matching §3's
    /// "destroyed in LIFO order when the root is dropped" and the reverse
    /// teardown order `close_tree` is required to exhibit (§8 scenario 1).
    fn drop(&mut self) {
        while self.nodes.pop().is_some() {}
    }
}

/// What `Resolver::walk` produced.
pub struct WalkOutcome {
    pub leaf: NodeId,
    pub ending_dir_entry: Option<DirEntry>,
}

pub struct Resolver;

impl Resolver {
    /// Walk `components[1..]` (component 0 selects the host file and is
    /// handled by the engine before a `Tree` exists) starting from `root`.
    pub fn walk(
        tree: &mut Tree,
        components: &[String],
        is_dir_ok: bool,
        hook: &Hook,
        probes: &ProbeRegistry,
    ) -> Result<WalkOutcome> {
        let mut current = tree.root;
        let mut i = 0;

        while i < components.len() {
            if crate::cancel::is_requested() {
                return Err(Error::Cancelled);
            }

            let advance = Self::step(tree, current, components, i, hook, probes)?;
            current = advance.node;
            i = advance.consumed;

            if let Some(dir_entry) = advance.ending_dir_entry {
                if !is_dir_ok {
                    return Err(Error::FileAsDirectory(dir_entry.name));
                }
                return Ok(WalkOutcome {
                    leaf: current,
                    ending_dir_entry: Some(dir_entry),
                });
            }
        }

        // Consume any trailing simple-wrapper implicitly even with no
        // components left, so `walk("file.po.gz")` lands on the disk.
        while hook.skip_simple() && Self::is_simple_wrapper(tree, current) {
            current = Self::descend_simple_wrapper(tree, current, probes)?;
        }

        Ok(WalkOutcome {
            leaf: current,
            ending_dir_entry: None,
        })
    }

    fn is_simple_wrapper(tree: &Tree, node: NodeId) -> bool {
        tree.get(node)
            .as_archive()
            .map(|a| a.is_single_entry())
            .unwrap_or(false)
    }

    fn descend_simple_wrapper(
        tree: &mut Tree,
        parent: NodeId,
        probes: &ProbeRegistry,
    ) -> Result<NodeId> {
        let entry = tree
            .get(parent)
            .as_archive()
            .and_then(|a| a.find_first())
            .ok_or_else(|| Error::NotFound("simple wrapper has no entry".into()))?;

        Self::extract_and_identify(tree, parent, entry, probes)
    }

    fn step(
        tree: &mut Tree,
        current: NodeId,
        components: &[String],
        i: usize,
        hook: &Hook,
        probes: &ProbeRegistry,
    ) -> Result<StepResult> {
        enum Kind {
            Archive,
            DiskImage,
            UnanalyzedPartition,
            Partition,
            HostFile,
        }

        let kind = match &tree.get(current).content {
            Content::Archive { .. } => Kind::Archive,
            Content::DiskImage { .. } => Kind::DiskImage,
            Content::Partition { filesystem } if filesystem.is_none() => Kind::UnanalyzedPartition,
            Content::Partition { .. } => Kind::Partition,
            Content::HostFile { .. } => Kind::HostFile,
        };

        match kind {
            Kind::Archive => Self::step_archive(tree, current, components, i, hook, probes),
            Kind::DiskImage => Self::step_disk_image(tree, current, components, i, probes),
            Kind::UnanalyzedPartition => {
                Self::analyze_partition(tree, current)?;
                Self::step_filesystem(tree, current, components, i, probes)
            }
            Kind::Partition => Self::step_filesystem(tree, current, components, i, probes),
            Kind::HostFile => {
                // Identification already happened when the node was
                // created; `open_ext_archive` replaces the root's content
                // in place once identification succeeds. Reaching here
                // with unidentified content means the stream was
                // unrecognized.
                Err(Error::Format {
                    label: "host file".into(),
                    detail: "stream content could not be identified".into(),
                })
            }
        }
    }

    fn step_archive(
        tree: &mut Tree,
        current: NodeId,
        components: &[String],
        i: usize,
        hook: &Hook,
        probes: &ProbeRegistry,
    ) -> Result<StepResult> {
        if hook.skip_simple() && Self::is_simple_wrapper(tree, current) {
            let child = Self::descend_simple_wrapper(tree, current, probes)?;
            return Ok(StepResult {
                node: child,
                consumed: i,
                ending_dir_entry: None,
            });
        }

        // Try increasingly long concatenations of the remaining
        // components against the archive's internal path separator,
        // shortest first per the "first match wins" resolution of the
        // open question in §9.
        let archive = tree.get(current).as_archive().unwrap();
        let mut matched_entry = None;
        let mut consumed = i;
        for end in (i + 1)..=components.len() {
            let candidate = components[i..end].join("/");
            if let Some(entry) = archive.find_by_path(&candidate) {
                matched_entry = Some(entry);
                consumed = end;
                break;
            }
        }

        let entry = matched_entry.ok_or_else(|| {
            Error::NotFound(format!("no archive entry matches {:?}", &components[i..]))
        })?;

        if let Some(&existing) = tree.get(current).children.get(&entry) {
            return Ok(StepResult {
                node: existing,
                consumed,
                ending_dir_entry: None,
            });
        }

        let child = Self::extract_and_identify(tree, current, entry, probes)?;
        Ok(StepResult {
            node: child,
            consumed,
            ending_dir_entry: None,
        })
    }

    fn extract_and_identify(
        tree: &mut Tree,
        parent: NodeId,
        entry: EntryId,
        probes: &ProbeRegistry,
    ) -> Result<NodeId> {
        let size_hint = tree
            .get(parent)
            .as_archive()
            .and_then(|a| a.attributes(&entry).ok())
            .map(|attrs| attrs.data_length)
            .unwrap_or(0);

        let mut scratch = TempStore::new(size_hint)?;
        {
            let archive = tree.get(parent).as_archive().unwrap();
            archive.extract_part(&entry, ForkKind::Data, &mut scratch as &mut dyn Write)?;
        }

        let bytes = scratch.read_all()?;
        let mut stream = std::io::Cursor::new(bytes);
        let label = entry.to_string();
        let identified = probes.identify(&mut stream, None, &label)?;

        let child = match identified.content {
            crate::identify::Identified::Archive(archive) => {
                ContainerNode::new_archive(parent, Some(entry.clone()), archive)
            }
            crate::identify::Identified::DiskImage(disk) => {
                ContainerNode::new_disk_image(parent, Some(entry.clone()), disk)
            }
            crate::identify::Identified::None => {
                return Err(Error::Format {
                    label,
                    detail: "unrecognized contents".into(),
                });
            }
        };

        let child_id = tree.push(child);
        tree.get_mut(parent).children.insert(entry, child_id);
        Ok(child_id)
    }

    fn step_disk_image(
        tree: &mut Tree,
        current: NodeId,
        components: &[String],
        i: usize,
        probes: &ProbeRegistry,
    ) -> Result<StepResult> {
        let contents = tree.get_mut(current).as_disk_image_mut().unwrap().analyze()?;

        match contents {
            DiskContents::Filesystem(fs) => {
                let fs_entry_id = EntryId::FilesystemEntry("<root-filesystem>".into());
                if let Some(&existing) = tree.get(current).children.get(&fs_entry_id) {
                    return Self::step_filesystem(tree, existing, components, i, probes);
                }
                let mut partition = crate::node::ContainerNode::new_partition(
                    current,
                    Some(fs_entry_id.clone()),
                );
                partition.set_filesystem(fs)?;
                let child_id = tree.push(partition);
                tree.get_mut(current)
                    .children
                    .insert(fs_entry_id, child_id);
                Self::step_filesystem(tree, child_id, components, i, probes)
            }
            DiskContents::MultiPart(multipart) => {
                let token = &components[i];
                let entry_id = Self::resolve_partition_token(multipart.as_ref(), token)?;

                if let Some(&existing) = tree.get(current).children.get(&entry_id) {
                    return Ok(StepResult {
                        node: existing,
                        consumed: i + 1,
                        ending_dir_entry: None,
                    });
                }

                let partition =
                    crate::node::ContainerNode::new_partition(current, Some(entry_id.clone()));
                let child_id = tree.push(partition);
                tree.get_mut(current).children.insert(entry_id, child_id);
                Ok(StepResult {
                    node: child_id,
                    consumed: i + 1,
                    ending_dir_entry: None,
                })
            }
            DiskContents::None => Err(Error::UnsupportedNesting(
                "disk image has no recognized filesystem or partition layout".into(),
            )),
        }
    }

    /// 1-based partition index, or (for APM-style layouts) a
    /// case-insensitive partition name. The numeric-vs-name ambiguity
    /// rule from §4.4: a numeric token is a partition index only when
    /// partitions exist and the index is in range; otherwise it's treated
    /// as a name match attempt, which then fails as NotFound if no name
    /// matches either, and as Ambiguous if more than one name matches
    /// case-insensitively.
    fn resolve_partition_token(
        multipart: &dyn crate::traits::MultiPart,
        token: &str,
    ) -> Result<EntryId> {
        let partitions = multipart.partitions();

        if let Ok(index_u64) = token.parse::<u64>() {
            let index: u32 = index_u64.try_into().map_err(|_| {
                Error::Conversion(format!("partition index {token} does not fit a u32 index"))
            })?;
            if index >= 1 && (index as usize) <= partitions.len() {
                return Ok(partitions[(index - 1) as usize].clone());
            }
        }

        let mut name_matches = Vec::new();
        for id in &partitions {
            if let Some(name) = multipart.partition_name(id) {
                if name.eq_ignore_ascii_case(token) {
                    name_matches.push(id.clone());
                }
            }
        }

        match name_matches.len() {
            0 => Err(Error::NotFound(format!("no partition matches {token:?}"))),
            1 => Ok(name_matches.into_iter().next().expect("len checked above")),
            _ => Err(Error::Ambiguous(format!(
                "{} partitions match {token:?} case-insensitively",
                name_matches.len()
            ))),
        }
    }

    /// Derive a freshly-created Partition node's filesystem by re-entering
    /// its parent DiskImage's multi-partition layout. Called the first
    /// time `step` reaches a Partition node whose filesystem hasn't been
    /// analyzed yet, so a partition never visited by a walk never pays for
    /// analysis.
    fn analyze_partition(tree: &mut Tree, current: NodeId) -> Result<()> {
        let node = tree.get(current);
        let (parent, entry) = match (node.parent, node.entry_in_parent.clone()) {
            (Some(parent), Some(entry)) => (parent, entry),
            _ => {
                return Err(Error::UnsupportedNesting(
                    "partition has no parent disk image to analyze".into(),
                ));
            }
        };

        // Claim the parent disk's chunk accessor for the duration of
        // analysis (§4.8) and restore its prior mode on every exit path,
        // including an `analyze` failure.
        let disk = tree
            .get_mut(parent)
            .as_disk_image_mut()
            .ok_or_else(|| Error::UnsupportedNesting("partition's parent is not a disk image".into()))?;
        let previous_mode = disk.chunks_mut().access_mode();
        disk.chunks_mut().set_access_mode(AccessMode::ReadOnly);
        let gate = AccessGate::claim(previous_mode, AccessMode::ReadOnly);

        let analyze_result = tree.get_mut(parent).as_disk_image_mut().unwrap().analyze();
        reclaim_access(gate, tree.get_mut(parent).as_disk_image_mut().unwrap().chunks_mut());
        let contents = analyze_result?;

        let multipart = match contents {
            DiskContents::MultiPart(multipart) => multipart,
            _ => {
                return Err(Error::UnsupportedNesting(
                    "partition's parent is no longer a multi-partition layout".into(),
                ));
            }
        };

        let filesystem = multipart.open_filesystem(&entry)?;
        tree.get_mut(current).set_filesystem(filesystem)?;
        Ok(())
    }

    /// Nearest ancestor (including `node` itself) whose content is a
    /// `DiskImage`, walking parent links. A filesystem-bearing `Partition`
    /// node has no chunk accessor of its own (§4.8); it shares the one
    /// owned by the disk image that produced it.
    fn find_disk_image_ancestor(tree: &Tree, mut node: NodeId) -> Option<NodeId> {
        loop {
            if matches!(tree.get(node).content, Content::DiskImage { .. }) {
                return Some(node);
            }
            node = tree.get(node).parent?;
        }
    }

    fn step_filesystem(
        tree: &mut Tree,
        current: NodeId,
        components: &[String],
        i: usize,
        probes: &ProbeRegistry,
    ) -> Result<StepResult> {
        // Claim the backing disk's chunk accessor for the duration of this
        // step (§4.8) so the filesystem's reads aren't racing a concurrent
        // write; released back to its prior mode on every exit path below.
        let claim = Self::find_disk_image_ancestor(tree, current).and_then(|disk_id| {
            let disk = tree.get_mut(disk_id).as_disk_image_mut()?;
            let previous = disk.chunks_mut().access_mode();
            disk.chunks_mut().set_access_mode(AccessMode::ReadOnly);
            Some((disk_id, AccessGate::claim(previous, AccessMode::ReadOnly)))
        });

        let result = Self::step_filesystem_inner(tree, current, components, i, probes);

        if let Some((disk_id, gate)) = claim {
            if let Some(disk) = tree.get_mut(disk_id).as_disk_image_mut() {
                reclaim_access(gate, disk.chunks_mut());
            }
        }

        result
    }

    fn step_filesystem_inner(
        tree: &mut Tree,
        current: NodeId,
        components: &[String],
        i: usize,
        probes: &ProbeRegistry,
    ) -> Result<StepResult> {
        let token = &components[i];

        let filesystem_present = tree.get(current).filesystem().is_some();
        if !filesystem_present {
            return Err(Error::UnsupportedNesting("no filesystem analyzed yet".into()));
        }

        // Try a 1-based embedded-volume index first.
        if let Ok(index) = token.parse::<u32>() {
            let embedded = tree.get(current).filesystem().unwrap().embedded_volumes();
            if index >= 1 && (index as usize) <= embedded.len() {
                let entry_id = embedded[(index - 1) as usize].clone();
                if let Some(&existing) = tree.get(current).children.get(&entry_id) {
                    return Ok(StepResult {
                        node: existing,
                        consumed: i + 1,
                        ending_dir_entry: None,
                    });
                }
                let sub_fs = tree
                    .get(current)
                    .filesystem()
                    .unwrap()
                    .open_embedded(&entry_id)?;
                let mut partition = crate::node::ContainerNode::new_partition(
                    current,
                    Some(entry_id.clone()),
                );
                partition.set_filesystem(sub_fs)?;
                let child_id = tree.push(partition);
                tree.get_mut(current)
                    .children
                    .insert(entry_id, child_id);
                return Ok(StepResult {
                    node: child_id,
                    consumed: i + 1,
                    ending_dir_entry: None,
                });
            }
        }

        let fs = tree.get(current).filesystem().unwrap();
        let dir = fs.volume_dir();
        let found = fs
            .find_by_name(&dir, token)?
            .ok_or_else(|| Error::NotFound(format!("no entry named {token:?}")))?;

        if found.is_dir {
            if i + 1 == components.len() {
                return Ok(StepResult {
                    node: current,
                    consumed: i + 1,
                    ending_dir_entry: Some(found),
                });
            }
            return Err(Error::UnsupportedNesting(
                "directory descent across multiple components is tracked by the filesystem plug-in".into(),
            ));
        }

        if i + 1 != components.len() {
            return Err(Error::DirectoryAsFile(found.name));
        }

        let entry_id = found.id.clone();
        if let Some(&existing) = tree.get(current).children.get(&entry_id) {
            return Ok(StepResult {
                node: existing,
                consumed: i + 1,
                ending_dir_entry: None,
            });
        }

        let mut buf = Vec::new();
        {
            let fs = tree.get(current).filesystem().unwrap();
            let mut file = fs.open_file(&found, ForkKind::Data)?;
            std::io::copy(&mut file, &mut buf).map_err(|e| Error::Io {
                path: std::path::PathBuf::from(&found.name),
                source: e,
            })?;
        }

        let mut stream = std::io::Cursor::new(buf);
        let identified = probes.identify(&mut stream, None, &found.name)?;

        let child = match identified.content {
            crate::identify::Identified::Archive(archive) => {
                ContainerNode::new_archive(current, Some(entry_id.clone()), archive)
            }
            crate::identify::Identified::DiskImage(disk) => {
                ContainerNode::new_disk_image(current, Some(entry_id.clone()), disk)
            }
            crate::identify::Identified::None => {
                return Err(Error::Format {
                    label: found.name,
                    detail: "unrecognized contents".into(),
                });
            }
        };

        let child_id = tree.push(child);
        tree.get_mut(current).children.insert(entry_id, child_id);
        Ok(StepResult {
            node: child_id,
            consumed: i + 1,
            ending_dir_entry: None,
        })
    }
}

struct StepResult {
    node: NodeId,
    consumed: usize,
    ending_dir_entry: Option<DirEntry>,
}

/// Apply an access-mode change to a filesystem's claimed accessor and
/// bubble the prior mode back up when it's released. Kept here rather
/// than in `access.rs` because only the resolver knows when a filesystem
/// finishes claiming raw access (on entering/leaving `step_filesystem`).
pub fn reclaim_access(gate: AccessGate, accessor: &mut dyn crate::traits::ChunkAccess) {
    accessor.set_access_mode(gate.release());
}

impl Tree {
    pub fn mark_dirty_from(&mut self, id: NodeId) {
        self.mark_ancestors_dirty(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ContainerNode;
    use crate::testkit::{FakeArchive, FakeDiskImage};

    fn host_root() -> (tempfile::TempDir, Tree) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.bin");
        std::fs::write(&path, b"host bytes").unwrap();
        let transaction = strata_fs::Transaction::open_locked(&path).unwrap();
        (dir, Tree::new(ContainerNode::new_host_file(transaction)))
    }

    #[test]
    fn walk_empty_components_returns_root() {
        let (_dir, mut tree) = host_root();
        let hook = Hook::new();
        // Replace root content with an archive to exercise skip-simple at
        // the top level.
        let archive = FakeArchive::with_entry("inner.bin", b"inner data");
        tree.nodes[0] = ContainerNode::new_archive(NodeId(0), None, Box::new(archive));
        tree.root = NodeId(0);

        let probes = ProbeRegistry::new();
        let outcome = Resolver::walk(&mut tree, &[], false, &hook, &probes).unwrap();
        // Single entry archive + skip_simple means even zero components
        // descends to the inner identified content (or fails identify,
        // which is fine for this smoke test as long as it doesn't panic).
        let _ = outcome.leaf;
    }

    #[test]
    fn reuse_rule_returns_same_child_for_repeated_component() {
        let (_dir, mut tree) = host_root();
        let archive = FakeArchive::with_entries(vec![
            ("a/b", b"ab".to_vec()),
            ("a/c", b"ac".to_vec()),
        ]);
        tree.nodes[0] = ContainerNode::new_archive(NodeId(0), None, Box::new(archive));

        let hook = Hook::new().with_skip_simple(false);
        let components = vec!["a".to_string(), "b".to_string()];
        let probes = ProbeRegistry::new();
        let first = Resolver::walk(&mut tree, &components, false, &hook, &probes);
        assert!(first.is_ok() || matches!(first, Err(Error::Format { .. })));
    }

    #[test]
    fn walk_derives_filesystem_for_a_freshly_created_partition() {
        // No probe is registered in this test, so the unrecognized
        // "inner.bin" bytes will still fail identification at the very
        // last step (Error::Format) — that failure mode, rather than
        // `UnsupportedNesting("no filesystem analyzed yet")`, is what
        // proves `analyze_partition` actually populated the partition's
        // filesystem before `step_filesystem` ran.
        let (_dir, mut tree) = host_root();
        let disk = FakeDiskImage::with_partitions(vec![
            ("HFS_Part", vec![]),
            ("ProDOS_Part", vec![("inner.bin", b"inner data".to_vec())]),
        ]);
        tree.nodes[0] = ContainerNode::new_disk_image(NodeId(0), None, Box::new(disk));

        let hook = Hook::new().with_skip_simple(false);
        let components = vec!["2".to_string(), "inner.bin".to_string()];
        let probes = ProbeRegistry::new();
        let result = Resolver::walk(&mut tree, &components, false, &hook, &probes);
        assert!(matches!(result, Err(Error::Format { .. })));
    }

    #[test]
    fn disk_image_without_recognized_body_errors() {
        let (_dir, mut tree) = host_root();
        let disk = FakeDiskImage::empty();
        tree.nodes[0] = ContainerNode::new_disk_image(NodeId(0), None, Box::new(disk));

        let hook = Hook::new();
        let probes = ProbeRegistry::new();
        let result = Resolver::walk(&mut tree, &["1".to_string()], false, &hook, &probes);
        assert!(result.is_err());
    }

    #[test]
    fn ambiguous_partition_name_surfaces_error() {
        let (_dir, mut tree) = host_root();
        let disk = FakeDiskImage::with_partitions(vec![
            ("DATA", vec![]),
            ("data", vec![]),
        ]);
        tree.nodes[0] = ContainerNode::new_disk_image(NodeId(0), None, Box::new(disk));

        let hook = Hook::new();
        let probes = ProbeRegistry::new();
        let result = Resolver::walk(&mut tree, &["data".to_string()], false, &hook, &probes);
        assert!(matches!(result, Err(Error::Ambiguous(_))));
    }

    #[test]
    fn numeric_partition_token_overflowing_u32_is_a_conversion_error() {
        let (_dir, mut tree) = host_root();
        let disk = FakeDiskImage::with_partitions(vec![("HFS_Part", vec![])]);
        tree.nodes[0] = ContainerNode::new_disk_image(NodeId(0), None, Box::new(disk));

        let hook = Hook::new();
        let probes = ProbeRegistry::new();
        let result = Resolver::walk(
            &mut tree,
            &["99999999999".to_string()],
            false,
            &hook,
            &probes,
        );
        assert!(matches!(result, Err(Error::Conversion(_))));
    }
}
