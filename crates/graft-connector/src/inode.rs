//! Inodes and their per-mount structural state.
//!
//! An inode is split in two. [`Inode`] is the registered identity: id,
//! owning mount and the open-file set, which has its own lock so file
//! open/close never contends with tree mutation. [`TreeNode`] is the
//! structural part (parent link, child map, grafted mounts, lookup count);
//! it lives inside the owning mount's tree and is only touched under that
//! mount's tree lock.

use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};

use parking_lot::Mutex;

use graft_types::{MountId, NodeId};

use crate::handle::Handled;

/// A live filesystem node as the kernel knows it.
#[derive(Debug)]
pub struct Inode {
    node_id: NodeId,
    mount: MountId,
    is_dir: bool,
    open_files: Mutex<HashSet<u64>>,
}

impl Inode {
    pub(crate) fn new(node_id: NodeId, mount: MountId, is_dir: bool) -> Self {
        Self {
            node_id,
            mount,
            is_dir,
            open_files: Mutex::new(HashSet::new()),
        }
    }

    /// Kernel-visible id.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Mount this inode belongs to.
    pub fn mount_id(&self) -> MountId {
        self.mount
    }

    /// Whether the inode was created with a child map.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Number of file handles open on this inode.
    pub fn open_file_count(&self) -> usize {
        self.open_files.lock().len()
    }

    pub(crate) fn has_open_files(&self) -> bool {
        !self.open_files.lock().is_empty()
    }

    pub(crate) fn add_open_file(&self, fh: u64) {
        self.open_files.lock().insert(fh);
    }

    pub(crate) fn remove_open_file(&self, fh: u64) -> bool {
        self.open_files.lock().remove(&fh)
    }
}

impl Handled for Inode {
    fn handle(&self) -> u64 {
        self.node_id.get()
    }
}

/// Structural state of one inode, owned by its mount's tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TreeNode {
    /// Parent and the name we are filed under. `None` for a mount root or
    /// an orphan (unlinked while the kernel still holds references).
    pub parent: Option<(NodeId, OsString)>,
    /// Child map; `None` for non-directories.
    pub children: Option<HashMap<OsString, NodeId>>,
    /// Sub-mounts grafted onto children of this directory, by name.
    pub mounts: HashMap<OsString, MountId>,
    /// Kernel lookup references. Never clamped.
    pub lookup_count: i64,
}

impl TreeNode {
    pub fn new(is_dir: bool, parent: Option<(NodeId, OsString)>) -> Self {
        Self {
            parent,
            children: is_dir.then(HashMap::new),
            mounts: HashMap::new(),
            lookup_count: 0,
        }
    }

    pub fn child(&self, name: &OsStr) -> Option<NodeId> {
        self.children.as_ref()?.get(name).copied()
    }

    pub fn has_children(&self) -> bool {
        self.children.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Children that belong to the same mount, i.e. not grafted mount roots.
    pub fn local_children(&self) -> impl Iterator<Item = (&OsString, NodeId)> + '_ {
        self.children
            .iter()
            .flatten()
            .filter(|(name, _)| !self.mounts.contains_key(*name))
            .map(|(name, id)| (name, *id))
    }
}
