//! Open file bookkeeping.
//!
//! An open file pins its inode against collection and vetoes unmounting
//! the mount it lives in.

use std::sync::Arc;

use graft_types::NodeId;

use super::FileSystemConnector;
use crate::error::{ConnectorError, ConnectorResult};

impl FileSystemConnector {
    /// Register a file handle opened on `node`.
    pub fn open_file(&self, node: NodeId, flags: u32) -> ConnectorResult<u64> {
        let inode = self.inode(node)?;
        let mount = self.mount_of(&inode)?;
        // Shared tree lock: serializes against unmount's busy check.
        let tree = mount.tree.read();
        if !tree.nodes.contains_key(&node) {
            return Err(ConnectorError::invariant(format!("open on {node:?}, which is not in the tree")));
        }
        // A root backend swap while we waited keeps the tree but replaces
        // the mount, and with it the open-file registry.
        let current = self.mount_of(&inode)?;
        if !Arc::ptr_eq(&current.tree, &mount.tree) {
            return Err(ConnectorError::invariant(format!("mount of {node:?} changed its tree")));
        }
        let file = current.register_open(node, flags);
        inode.add_open_file(file.handle());
        drop(tree);
        tracing::trace!(node = %node, fh = file.handle(), flags, "file opened");
        Ok(file.handle())
    }

    /// Drop a file handle returned by [`open_file`](Self::open_file).
    ///
    /// An inode the kernel already forgot is collected once its last file
    /// is released.
    pub fn release_file(&self, node: NodeId, fh: u64) -> ConnectorResult<()> {
        let inode = self.inode(node)?;
        let mount = self.mount_of(&inode)?;
        {
            let mut tree = mount.tree.write();
            let file = mount.open_files().decode(fh)?;
            if file.node_id() != node {
                return Err(ConnectorError::invariant(format!(
                    "file handle {fh:#x} belongs to {:?}, released on {node:?}",
                    file.node_id()
                )));
            }
            mount.open_files().forget(fh)?;
            inode.remove_open_file(fh);
            let released = tree.collect(node, |id| self.has_open_files(id));
            self.release(&released)?;
        }
        self.verify()
    }

    /// Number of handles open on `node`.
    pub fn open_file_count(&self, node: NodeId) -> ConnectorResult<usize> {
        Ok(self.inode(node)?.open_file_count())
    }
}
