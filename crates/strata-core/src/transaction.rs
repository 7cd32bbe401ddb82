//! TransactionCoordinator (§4.6): sequences commit semantics for archive
//! wrappers so a parent's save observes its children's commits.

use crate::error::Result;
use crate::node::{Content, NodeId};
use crate::resolver::Tree;

/// Outcome of `save_updates`: mirrors the cancellation split from §5 so a
/// caller's commit path can treat a user abort as "nothing happened"
/// rather than as an error.
pub enum SaveOutcome {
    Saved,
    Cancelled,
}

pub struct TransactionCoordinator;

impl TransactionCoordinator {
    /// Walk the tree in post-order, saving every dirty node. A failure at
    /// any node aborts the remaining saves (§4.6 rule 3): already-flushed
    /// child archives stay committed to their own scratch streams, but
    /// those bytes may not have propagated further up.
    pub fn save_updates(tree: &mut Tree) -> Result<SaveOutcome> {
        for id in Self::post_order(tree) {
            if crate::cancel::is_requested() {
                return Ok(SaveOutcome::Cancelled);
            }

            if !tree.get(id).is_dirty() {
                continue;
            }

            if let Some(new_bytes) = tree.get_mut(id).save()? {
                Self::notify_parent_entry_replaced(tree, id, &new_bytes)?;
            }
        }

        Ok(SaveOutcome::Saved)
    }

    /// Cancel every open archive transaction in the tree, in any order, so
    /// no scratch stream is promoted to replace a parent's bytes (§4.6
    /// rule 4, §8 P5).
    pub fn cancel_all(tree: &mut Tree) {
        for id in tree.insertion_order() {
            tree.get_mut(id).cancel_transaction();
        }
    }

    /// Post-order (children before parents) traversal over every node
    /// currently in the arena. Since nodes are appended to the arena in
    /// the order they were created (always after their parent), reversing
    /// insertion order is a valid post-order for this tree shape.
    fn post_order(tree: &Tree) -> Vec<NodeId> {
        let mut order = tree.insertion_order();
        order.reverse();
        order
    }

    fn notify_parent_entry_replaced(tree: &mut Tree, child: NodeId, new_bytes: &[u8]) -> Result<()> {
        let parent_id = match tree.get(child).parent {
            Some(p) => p,
            None => return Ok(()),
        };
        let entry = match &tree.get(child).entry_in_parent {
            Some(e) => e.clone(),
            None => return Ok(()),
        };

        enum Kind {
            HostFile,
            Archive,
            Other,
        }

        let kind = match &tree.get(parent_id).content {
            Content::HostFile { .. } => Kind::HostFile,
            Content::Archive { .. } => Kind::Archive,
            _ => Kind::Other,
        };

        match kind {
            Kind::HostFile => {
                tree.get_mut(parent_id).write_host_bytes(new_bytes)?;
            }
            Kind::Archive => {
                // Stage the child's fresh bytes as a replacement for its
                // own entry in the parent archive, opening a transaction
                // if the caller hadn't already started one some other way.
                // Without this, the parent's `save` would see no open
                // transaction and skip committing, silently dropping the
                // child's update (violates P4).
                let parent = tree.get_mut(parent_id);
                parent.ensure_transaction_open()?;
                let archive = parent
                    .as_archive_mut()
                    .expect("Kind::Archive parent yields Some from as_archive_mut");
                let mut source = std::io::Cursor::new(new_bytes.to_vec());
                archive.add_part(&entry, crate::traits::ForkKind::Data, &mut source, None)?;
                tree.mark_dirty_from(parent_id);
            }
            Kind::Other => {
                tree.mark_dirty_from(parent_id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ContainerNode;
    use crate::testkit::FakeArchive;

    fn single_archive_tree() -> Tree {
        let node = ContainerNode::new_archive(NodeId(0), None, Box::new(FakeArchive::empty()));
        Tree::new(node)
    }

    #[test]
    fn save_updates_skips_clean_nodes() {
        let mut tree = single_archive_tree();
        let outcome = TransactionCoordinator::save_updates(&mut tree);
        assert!(matches!(outcome.unwrap(), SaveOutcome::Saved));
    }

    #[test]
    fn save_updates_commits_dirty_archive() {
        let mut tree = single_archive_tree();
        tree.get_mut(tree.root).ensure_transaction_open().unwrap();
        tree.get_mut(tree.root).mark_dirty();
        TransactionCoordinator::save_updates(&mut tree).unwrap();
        assert!(!tree.get(tree.root).is_dirty());
    }

    #[test]
    fn save_updates_folds_child_archive_bytes_into_parent_entry() {
        use crate::traits::{Archive, EntryId};

        let root = ContainerNode::new_archive(
            NodeId(0),
            None,
            Box::new(FakeArchive::with_entry("inner.arc", b"stale")),
        );
        let mut tree = Tree::new(root);

        let entry = EntryId::ArchivePath("inner.arc".to_string());
        let child = ContainerNode::new_archive(
            tree.root,
            Some(entry.clone()),
            Box::new(FakeArchive::empty()),
        );
        let child_id = tree.push(child);
        tree.get_mut(tree.root).children.insert(entry.clone(), child_id);

        tree.get_mut(child_id).ensure_transaction_open().unwrap();
        tree.get_mut(child_id).mark_dirty();

        TransactionCoordinator::save_updates(&mut tree).unwrap();

        let parent_archive = tree.get(tree.root).as_archive().unwrap();
        let found = parent_archive.find_by_path("inner.arc").unwrap();
        let mut extracted = Vec::new();
        parent_archive
            .extract_part(&found, crate::traits::ForkKind::Data, &mut extracted)
            .unwrap();
        // The child committed fresh bytes distinct from the parent's
        // original "stale" entry; seeing those fresh bytes here (rather
        // than "stale") confirms `add_part` actually replaced the entry
        // instead of the update being silently dropped.
        assert_eq!(extracted, b"FAKEARCHIVE");
    }

    #[test]
    fn cancel_all_clears_open_transactions_without_saving() {
        let mut tree = single_archive_tree();
        tree.get_mut(tree.root).ensure_transaction_open().unwrap();
        tree.get_mut(tree.root).mark_dirty();
        TransactionCoordinator::cancel_all(&mut tree);
        // A subsequent save sees no open transaction and treats the node
        // as having nothing to commit, matching P5 (no promotion after
        // cancellation).
        let result = tree.get_mut(tree.root).save().unwrap();
        assert!(result.is_none());
    }
}
