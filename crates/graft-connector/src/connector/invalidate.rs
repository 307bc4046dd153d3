//! Outbound cache invalidation.

use graft_types::{NotifyInvalEntry, NotifyInvalInode};

use super::FileSystemConnector;
use crate::error::ConnectorResult;

impl FileSystemConnector {
    /// Invalidate attributes and `length` bytes at `offset` of the file at
    /// `path`.
    pub fn file_notify(&self, path: &str, offset: i64, length: i64) -> ConnectorResult<()> {
        let inode = self.find_inode(path)?;
        self.notifier().inode_notify(&NotifyInvalInode {
            node_id: inode.node_id(),
            offset,
            length,
        })?;
        Ok(())
    }

    /// Invalidate the entry `name` in the directory at `dir`.
    pub fn entry_notify(&self, dir: &str, name: &str) -> ConnectorResult<()> {
        let inode = self.find_inode(dir)?;
        self.notifier().entry_notify(&NotifyInvalEntry {
            parent: inode.node_id(),
            name: name.into(),
        })?;
        Ok(())
    }

    /// Invalidate whatever the kernel may have cached for `path`.
    ///
    /// If the tree only knows a prefix of the path, the first unknown
    /// component is invalidated as an entry of the deepest known directory.
    pub fn notify(&self, path: &str) -> ConnectorResult<()> {
        let (inode, rest) = self.find_last_known_inode(path)?;
        let notifier = self.notifier();
        match rest.into_iter().next() {
            Some(name) => notifier.entry_notify(&NotifyInvalEntry {
                parent: inode.node_id(),
                name,
            })?,
            None => notifier.inode_notify(&NotifyInvalInode {
                node_id: inode.node_id(),
                offset: 0,
                length: 0,
            })?,
        }
        Ok(())
    }
}
