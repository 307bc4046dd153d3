//! Structural self-check.
//!
//! Walks the attached mounts top-down, holding each tree's read lock while
//! its sub-mounts are checked, so the view is consistent across mount
//! boundaries.

use std::collections::HashSet;

use graft_types::{MountId, NodeId};

use super::FileSystemConnector;
use crate::error::{ConnectorError, ConnectorResult};
use crate::mount::FileSystemMount;

impl FileSystemConnector {
    /// Run [`check_tree`](Self::check_tree) if the connector was configured
    /// with `verify_tree`.
    pub(crate) fn verify(&self) -> ConnectorResult<()> {
        if self.verify_tree {
            self.check_tree()
        } else {
            Ok(())
        }
    }

    /// Check every attached mount: parent/child links, mount tables against
    /// child maps, grafted roots, and registry agreement.
    pub fn check_tree(&self) -> ConnectorResult<()> {
        let root = self.root_mount()?;
        let mut seen_mounts = HashSet::new();
        let mut seen_nodes = HashSet::new();
        self.check_mount(&root, NodeId::ROOT, &mut seen_mounts, &mut seen_nodes)
    }

    fn check_mount(
        &self,
        mount: &FileSystemMount,
        expected_root: NodeId,
        seen_mounts: &mut HashSet<MountId>,
        seen_nodes: &mut HashSet<NodeId>,
    ) -> ConnectorResult<()> {
        if !seen_mounts.insert(mount.id()) {
            return Err(ConnectorError::invariant(format!("mount {} is grafted twice", mount.id())));
        }
        let tree = mount.tree.read();
        if tree.root != Some(expected_root) {
            return Err(ConnectorError::invariant(format!(
                "mount {} has root {:?}, grafted at {expected_root:?}",
                mount.id(),
                tree.root
            )));
        }
        tree.check()
            .map_err(|e| ConnectorError::invariant(format!("mount {}: {e}", mount.id())))?;

        let mut grafts = Vec::new();
        for (&id, node) in &tree.nodes {
            if !seen_nodes.insert(id) {
                return Err(ConnectorError::invariant(format!("{id:?} is in two trees")));
            }
            let inode = self.inode(id).map_err(|e| {
                ConnectorError::invariant(format!("{id:?} is in a tree but not registered: {e}"))
            })?;
            if inode.mount_id() != mount.id() {
                return Err(ConnectorError::invariant(format!(
                    "{id:?} is in the tree of mount {} but belongs to {}",
                    mount.id(),
                    inode.mount_id()
                )));
            }
            for (name, &sub) in &node.mounts {
                if let Some(child) = node.child(name) {
                    grafts.push((sub, child));
                }
            }
        }

        for (sub, child) in grafts {
            let sub_mount = self.mount_by_id(sub)?;
            self.check_mount(&sub_mount, child, seen_mounts, seen_nodes)?;
        }
        drop(tree);
        Ok(())
    }
}
