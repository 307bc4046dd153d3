//! Mounted backends and the trees they guard.
//!
//! Every [`FileSystemMount`] owns one [`MountTree`] behind one `RwLock`:
//! the structural state of every inode that belongs to the mount. The lock
//! does not reach into sub-mounts; a directory only records which of its
//! children are grafted mount roots, and those roots live in the child
//! mount's tree.

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::sync::Arc;

use parking_lot::RwLock;

use graft_types::{EntryOut, FileAttr, MountId, NodeId};

use crate::backend::NodeFileSystem;
use crate::error::{ConnectorError, ConnectorResult};
use crate::handle::{HandleMap, Handled};
use crate::inode::TreeNode;
use crate::options::FileSystemOptions;

/// Structural state of all inodes of one mount.
#[derive(Debug)]
pub(crate) struct MountTree {
    /// The mount's root inode; `None` once the mount is detached.
    pub root: Option<NodeId>,
    pub nodes: HashMap<NodeId, TreeNode>,
}

impl MountTree {
    pub fn new(root: NodeId) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(root, TreeNode::new(true, None));
        Self {
            root: Some(root),
            nodes,
        }
    }

    pub fn node(&self, id: NodeId) -> ConnectorResult<&TreeNode> {
        self.nodes
            .get(&id)
            .ok_or_else(|| ConnectorError::invariant(format!("{id:?} missing from its mount tree")))
    }

    pub fn node_mut(&mut self, id: NodeId) -> ConnectorResult<&mut TreeNode> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| ConnectorError::invariant(format!("{id:?} missing from its mount tree")))
    }

    pub fn is_mount_root(&self, id: NodeId) -> bool {
        self.root == Some(id)
    }

    /// File `child` under `parent` as `name`. The caller has made sure the
    /// name is free.
    pub fn attach(&mut self, parent: NodeId, name: &OsStr, child: NodeId) -> ConnectorResult<()> {
        let children = self
            .node_mut(parent)?
            .children
            .as_mut()
            .ok_or_else(|| ConnectorError::not_a_directory(format!("{parent:?}")))?;
        children.insert(name.to_owned(), child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some((parent, name.to_owned()));
        }
        Ok(())
    }

    /// Remove `name` from `parent`'s child map. A removed child of this
    /// mount becomes an orphan.
    pub fn detach(&mut self, parent: NodeId, name: &OsStr) -> ConnectorResult<Option<NodeId>> {
        let removed = self
            .node_mut(parent)?
            .children
            .as_mut()
            .and_then(|children| children.remove(name));
        if let Some(child) = removed
            && let Some(node) = self.nodes.get_mut(&child)
        {
            node.parent = None;
        }
        Ok(removed)
    }

    fn collectible(&self, id: NodeId, has_open_files: &impl Fn(NodeId) -> bool) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        if node.has_children() || node.lookup_count != 0 {
            if node.lookup_count < 0 {
                tracing::warn!(node = ?id, count = node.lookup_count, "negative lookup count");
            }
            return false;
        }
        if id.is_root() || self.is_mount_root(id) {
            return false;
        }
        !has_open_files(id)
    }

    /// Drop `id` from the tree and unhook it from its parent.
    fn remove(&mut self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.remove(&id)?;
        let (parent, name) = node.parent?;
        if let Some(children) = self
            .nodes
            .get_mut(&parent)
            .and_then(|p| p.children.as_mut())
            && children.get(&name) == Some(&id)
        {
            children.remove(&name);
        }
        Some(parent)
    }

    /// Garbage-collect starting at `start`.
    ///
    /// The subtree below `start` is swept bottom-up (grafted mounts are
    /// skipped), then `start` itself and, while they keep becoming
    /// collectible, its ancestors in this mount. Returns the released ids;
    /// the caller owns releasing their handles.
    pub fn collect(
        &mut self,
        start: NodeId,
        has_open_files: impl Fn(NodeId) -> bool,
    ) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut pending = vec![start];
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            order.push(id);
            pending.extend(node.local_children().map(|(_, child)| child));
        }

        let mut released = Vec::new();
        // Pre-order reversed: every node comes after all of its descendants.
        for &id in order.iter().rev() {
            if id != start && self.collectible(id, &has_open_files) {
                self.remove(id);
                released.push(id);
            }
        }

        let mut current = Some(start);
        while let Some(id) = current {
            if !self.collectible(id, &has_open_files) {
                break;
            }
            current = self.remove(id);
            released.push(id);
        }
        released
    }

    /// Structural self-check of this tree alone.
    pub fn check(&self) -> Result<(), String> {
        if let Some(root) = self.root {
            let node = self.nodes.get(&root).ok_or(format!("root {root:?} not in tree"))?;
            if node.parent.is_some() {
                return Err(format!("mount root {root:?} has a parent"));
            }
        }
        for (&id, node) in &self.nodes {
            if let Some((parent, name)) = &node.parent {
                let filed = self.nodes.get(parent).and_then(|p| p.child(name));
                if filed != Some(id) {
                    return Err(format!("{id:?} claims parent {parent:?}/{name:?} but is not filed there"));
                }
            }
            for (name, child) in node.local_children() {
                let back = self.nodes.get(&child).and_then(|c| c.parent.as_ref());
                if back != Some(&(id, name.clone())) {
                    return Err(format!("{id:?}/{name:?} -> {child:?} has no matching parent link"));
                }
            }
            for name in node.mounts.keys() {
                if node.child(name).is_none() {
                    return Err(format!("{id:?} grafts a mount at {name:?} without a child entry"));
                }
            }
        }
        Ok(())
    }
}

/// A file handle opened on an inode of a mount.
#[derive(Debug)]
pub struct OpenedFile {
    handle: u64,
    node_id: NodeId,
    flags: u32,
}

impl OpenedFile {
    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }
}

impl Handled for OpenedFile {
    fn handle(&self) -> u64 {
        self.handle
    }
}

/// One mounted backend.
pub struct FileSystemMount {
    id: MountId,
    backend: Arc<dyn NodeFileSystem>,
    options: FileSystemOptions,
    pub(crate) tree: Arc<RwLock<MountTree>>,
    open_files: HandleMap<OpenedFile>,
}

impl std::fmt::Debug for FileSystemMount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemMount")
            .field("id", &self.id)
            .field("backend", &self.backend.name())
            .field("open_files", &self.open_files.len())
            .finish()
    }
}

impl FileSystemMount {
    pub(crate) fn new(
        id: MountId,
        root: NodeId,
        backend: Arc<dyn NodeFileSystem>,
        options: FileSystemOptions,
    ) -> Self {
        let tree = Arc::new(RwLock::new(MountTree::new(root)));
        Self::with_tree(id, tree, backend, options)
    }

    /// Bind a backend to an existing tree (root backend replacement).
    pub(crate) fn with_tree(
        id: MountId,
        tree: Arc<RwLock<MountTree>>,
        backend: Arc<dyn NodeFileSystem>,
        options: FileSystemOptions,
    ) -> Self {
        let checked = !options.skip_check_handles;
        Self {
            id,
            backend,
            options,
            tree,
            open_files: HandleMap::new(checked),
        }
    }

    pub fn id(&self) -> MountId {
        self.id
    }

    pub fn backend(&self) -> &Arc<dyn NodeFileSystem> {
        &self.backend
    }

    pub fn options(&self) -> &FileSystemOptions {
        &self.options
    }

    /// Root inode of this mount, or `None` once unmounted.
    pub fn mount_inode(&self) -> Option<NodeId> {
        self.tree.read().root
    }

    /// Files open anywhere under this mount.
    pub fn open_file_count(&self) -> usize {
        self.open_files.len()
    }

    pub(crate) fn open_files(&self) -> &HandleMap<OpenedFile> {
        &self.open_files
    }

    pub(crate) fn register_open(&self, node_id: NodeId, flags: u32) -> Arc<OpenedFile> {
        self.open_files.register_with(|handle| OpenedFile {
            handle,
            node_id,
            flags,
        })
    }

    /// Build the entry reply for a child whose backend attributes are `attr`.
    pub fn entry_for(&self, node_id: NodeId, attr: &FileAttr) -> EntryOut {
        let attr = match self.options.owner {
            Some(owner) => attr.clone().with_owner(owner),
            None => attr.clone(),
        };
        EntryOut {
            node_id: Some(node_id),
            generation: 0,
            attr: Some(attr),
            entry_valid: self.options.entry_timeout,
            attr_valid: self.options.attr_timeout,
        }
    }

    /// Reply for a name the backend does not have.
    pub fn negative_entry(&self) -> EntryOut {
        EntryOut {
            node_id: None,
            generation: 0,
            attr: None,
            entry_valid: self.options.negative_timeout,
            attr_valid: self.options.negative_timeout,
        }
    }
}

/// Summary of one mount for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub id: MountId,
    /// Root inode of the mount.
    pub mount_inode: NodeId,
    pub backend: String,
    pub open_files: usize,
    pub inodes: usize,
}
