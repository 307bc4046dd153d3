//! The connector between the kernel protocol and mounted backends.
//!
//! [`FileSystemConnector`] owns the live inode tree as the kernel sees it.
//! Protocol handlers call it to translate node ids, to apply the
//! lookup/forget protocol and to mirror renames and unlinks; it grafts
//! sub-filesystems onto directories and pushes invalidations back to the
//! kernel.
//!
//! ## Locking
//!
//! Each mount has one tree lock. Locks are always taken ancestor mount
//! before descendant mount, then open-file sets, then the handle registry.
//! The mount table is a `DashMap`; its guards are dropped before any tree
//! lock is taken.

mod files;
mod invalidate;
mod mounts;
mod verify;

use std::ffi::{OsStr, OsString};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use dashmap::DashMap;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::debug;

use graft_types::{EntryOut, FileAttr, MountId, NodeId};

use crate::backend::NodeFileSystem;
use crate::error::{ConnectorError, ConnectorResult};
use crate::handle::HandleMap;
use crate::inode::{Inode, TreeNode};
use crate::mount::{FileSystemMount, MountTree};
use crate::notify::{KernelNotifier, NullNotifier};
use crate::options::ConnectorConfig;
use crate::path::{join_path, split_path};

/// Kernel-facing inode tree with grafted backends.
pub struct FileSystemConnector {
    inodes: HandleMap<Inode>,
    root: Arc<Inode>,
    mounts: DashMap<MountId, Arc<FileSystemMount>>,
    next_mount_id: AtomicU64,
    notifier: RwLock<Arc<dyn KernelNotifier>>,
    verify_tree: bool,
}

impl std::fmt::Debug for FileSystemConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemConnector")
            .field("inodes", &self.inode_count())
            .field("mounts", &self.mounts.len())
            .field("verify_tree", &self.verify_tree)
            .finish()
    }
}

impl FileSystemConnector {
    /// Create a connector whose root directory is served by `backend`.
    pub fn new(backend: Arc<dyn NodeFileSystem>, config: ConnectorConfig) -> Self {
        let ConnectorConfig {
            options,
            verify_tree,
        } = config;
        let inodes = HandleMap::new(!options.skip_check_handles);
        let root = Arc::new(Inode::new(NodeId::ROOT, MountId::ROOT, true));
        let mounts = DashMap::new();
        mounts.insert(
            MountId::ROOT,
            Arc::new(FileSystemMount::new(
                MountId::ROOT,
                NodeId::ROOT,
                Arc::clone(&backend),
                options,
            )),
        );
        let connector = Self {
            inodes,
            root,
            mounts,
            next_mount_id: AtomicU64::new(1),
            notifier: RwLock::new(Arc::new(NullNotifier)),
            verify_tree,
        };
        backend.on_mount(&connector);
        connector
    }

    /// Install the kernel notification channel once the session is up.
    pub fn init(&self, notifier: Arc<dyn KernelNotifier>) {
        *self.notifier.write() = notifier;
        debug!("kernel notifier installed");
    }

    pub(crate) fn notifier(&self) -> Arc<dyn KernelNotifier> {
        Arc::clone(&self.notifier.read())
    }

    /// The root inode.
    pub fn root(&self) -> &Arc<Inode> {
        &self.root
    }

    /// Translate a kernel node id.
    pub fn inode(&self, node: NodeId) -> ConnectorResult<Arc<Inode>> {
        if node.is_root() {
            return Ok(Arc::clone(&self.root));
        }
        self.inodes.decode(node.get())
    }

    pub(crate) fn mount_by_id(&self, id: MountId) -> ConnectorResult<Arc<FileSystemMount>> {
        self.mounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ConnectorError::invariant(format!("mount {id} is not in the mount table")))
    }

    /// The mount an inode belongs to.
    pub fn mount_of(&self, inode: &Inode) -> ConnectorResult<Arc<FileSystemMount>> {
        self.mount_by_id(inode.mount_id())
    }

    pub(crate) fn root_mount(&self) -> ConnectorResult<Arc<FileSystemMount>> {
        self.mount_by_id(MountId::ROOT)
    }

    pub(crate) fn has_open_files(&self, node: NodeId) -> bool {
        self.inode(node).is_ok_and(|inode| inode.has_open_files())
    }

    /// Release the handles of nodes a collection pass removed.
    fn release(&self, released: &[NodeId]) -> ConnectorResult<()> {
        for id in released {
            self.inodes.forget(id.get())?;
        }
        if !released.is_empty() {
            debug!(count = released.len(), "collected inodes");
        }
        Ok(())
    }

    /// Find or create `name` under `parent` and add `increment` lookups.
    ///
    /// When `name` is a mount point the lookup is counted against the
    /// sub-mount's root. `is_dir` only matters when the node is created.
    pub fn lookup_update(
        &self,
        parent: NodeId,
        name: &OsStr,
        is_dir: bool,
        increment: i64,
    ) -> ConnectorResult<Arc<Inode>> {
        let parent_inode = self.inode(parent)?;
        let mount = self.mount_of(&parent_inode)?;
        let tree = mount.tree.upgradable_read();

        let pnode = tree.node(parent)?;
        if pnode.children.is_none() {
            return Err(ConnectorError::not_a_directory(format!("{parent:?}")));
        }

        if let Some(&sub_id) = pnode.mounts.get(name) {
            let sub = self.mount_by_id(sub_id)?;
            let mut sub_tree = sub.tree.write();
            let root = sub_tree
                .root
                .ok_or_else(|| ConnectorError::invariant(format!("grafted mount {sub_id} has no root")))?;
            sub_tree.node_mut(root)?.lookup_count += increment;
            let inode = self.inode(root)?;
            drop(sub_tree);
            drop(tree);
            self.verify()?;
            return Ok(inode);
        }

        let existing = pnode.child(name);
        let mut tree = RwLockUpgradableReadGuard::upgrade(tree);
        let inode = match existing {
            Some(id) => self.inode(id)?,
            None => {
                let inode = self
                    .inodes
                    .register_with(|handle| Inode::new(NodeId::new(handle), mount.id(), is_dir));
                tree.nodes
                    .insert(inode.node_id(), TreeNode::new(is_dir, None));
                tree.attach(parent, name, inode.node_id())?;
                inode
            }
        };
        tree.node_mut(inode.node_id())?.lookup_count += increment;
        drop(tree);

        self.verify()?;
        Ok(inode)
    }

    /// Look `name` up with attributes from the backend and build the reply.
    pub fn create_child(
        &self,
        parent: NodeId,
        name: &OsStr,
        attr: &FileAttr,
    ) -> ConnectorResult<(EntryOut, Arc<Inode>)> {
        let inode = self.lookup_update(parent, name, attr.is_dir(), 1)?;
        let mount = self.mount_of(&inode)?;
        Ok((mount.entry_for(inode.node_id(), attr), inode))
    }

    /// Reply for a name the backend of `parent` does not have.
    pub fn negative_entry(&self, parent: NodeId) -> ConnectorResult<EntryOut> {
        let inode = self.inode(parent)?;
        Ok(self.mount_of(&inode)?.negative_entry())
    }

    /// Drop `decrement` kernel references and collect what became free.
    pub fn forget_update(&self, node: NodeId, decrement: i64) -> ConnectorResult<()> {
        let inode = self.inode(node)?;
        let mount = self.mount_of(&inode)?;
        {
            let mut tree = mount.tree.write();
            tree.node_mut(node)?.lookup_count -= decrement;
            let released = tree.collect(node, |id| self.has_open_files(id));
            self.release(&released)?;
        }
        self.verify()
    }

    /// Mirror a completed rename. The moved inode keeps its id and count.
    pub fn rename_update(
        &self,
        old_parent: NodeId,
        old_name: &OsStr,
        new_parent: NodeId,
        new_name: &OsStr,
    ) -> ConnectorResult<()> {
        let old_dir = self.inode(old_parent)?;
        let new_dir = self.inode(new_parent)?;
        if old_dir.mount_id() != new_dir.mount_id() {
            return Err(ConnectorError::invariant(format!(
                "rename across mounts {} and {}",
                old_dir.mount_id(),
                new_dir.mount_id()
            )));
        }

        let mount = self.mount_of(&old_dir)?;
        {
            let mut tree = mount.tree.write();
            if tree.node(old_parent)?.mounts.contains_key(old_name) {
                return Err(ConnectorError::busy(format!(
                    "{} is a mount point",
                    old_name.to_string_lossy()
                )));
            }
            let target = tree.node(new_parent)?;
            if target.mounts.contains_key(new_name) {
                return Err(ConnectorError::busy(format!(
                    "{} is a mount point",
                    new_name.to_string_lossy()
                )));
            }
            if target.children.is_none() {
                return Err(ConnectorError::not_a_directory(format!("{new_parent:?}")));
            }
            let moved = tree.node(old_parent)?.child(old_name).ok_or_else(|| {
                ConnectorError::invariant(format!(
                    "rename source {old_parent:?}/{} is unknown",
                    old_name.to_string_lossy()
                ))
            })?;
            if old_parent == new_parent && old_name == new_name {
                return Ok(());
            }

            let displaced = tree.detach(new_parent, new_name)?;
            tree.detach(old_parent, old_name)?;
            tree.attach(new_parent, new_name, moved)?;
            if let Some(orphan) = displaced {
                let released = tree.collect(orphan, |id| self.has_open_files(id));
                self.release(&released)?;
            }
        }
        self.verify()
    }

    /// Mirror a completed unlink or rmdir. An absent name is a no-op.
    pub fn unlink_update(&self, parent: NodeId, name: &OsStr) -> ConnectorResult<()> {
        let dir = self.inode(parent)?;
        let mount = self.mount_of(&dir)?;
        {
            let mut tree = mount.tree.write();
            if tree.node(parent)?.mounts.contains_key(name) {
                return Err(ConnectorError::busy(format!(
                    "{} is a mount point",
                    name.to_string_lossy()
                )));
            }
            let Some(orphan) = tree.detach(parent, name)? else {
                return Ok(());
            };
            let released = tree.collect(orphan, |id| self.has_open_files(id));
            self.release(&released)?;
        }
        self.verify()
    }

    /// Walk `parts` from the root. Returns the deepest inode reached and
    /// how many components were consumed.
    fn walk(&self, parts: &[OsString]) -> ConnectorResult<(Arc<Inode>, usize)> {
        let mut guard = self.root_mount()?.tree.read_arc();
        let mut current = NodeId::ROOT;
        let mut consumed = 0;

        while let Some(name) = parts.get(consumed) {
            let node = guard.node(current)?;
            if let Some(&sub_id) = node.mounts.get(name) {
                let sub = self.mount_by_id(sub_id)?;
                let sub_guard = sub.tree.read_arc();
                current = sub_guard.root.ok_or_else(|| {
                    ConnectorError::invariant(format!("grafted mount {sub_id} has no root"))
                })?;
                // Hand over: the parent's guard goes only once the child's is held.
                guard = sub_guard;
            } else if let Some(child) = node.child(name) {
                current = child;
            } else {
                break;
            }
            consumed += 1;
        }

        let inode = self.inode(current)?;
        drop(guard);
        Ok((inode, consumed))
    }

    /// Resolve as much of `path` as the tree knows.
    ///
    /// Returns the deepest known inode and the components left over.
    pub fn find_last_known_inode(&self, path: &str) -> ConnectorResult<(Arc<Inode>, Vec<OsString>)> {
        let mut parts = split_path(path);
        let (inode, consumed) = self.walk(&parts)?;
        Ok((inode, parts.split_off(consumed)))
    }

    /// Resolve `path` completely.
    pub fn find_inode(&self, path: &str) -> ConnectorResult<Arc<Inode>> {
        let parts = split_path(path);
        let (inode, consumed) = self.walk(&parts)?;
        if consumed < parts.len() {
            return Err(ConnectorError::not_found(join_path(&parts)));
        }
        Ok(inode)
    }

    fn with_tree<R>(
        &self,
        node: NodeId,
        read: impl FnOnce(&MountTree) -> ConnectorResult<R>,
    ) -> ConnectorResult<R> {
        let inode = self.inode(node)?;
        let mount = self.mount_of(&inode)?;
        let tree = mount.tree.read();
        read(&tree)
    }

    /// Current kernel reference count of a node.
    pub fn lookup_count(&self, node: NodeId) -> ConnectorResult<i64> {
        self.with_tree(node, |tree| Ok(tree.node(node)?.lookup_count))
    }

    /// Known children of a directory, sorted by name. Mount points appear
    /// with the id of the grafted root.
    pub fn children(&self, node: NodeId) -> ConnectorResult<Vec<(OsString, NodeId)>> {
        self.with_tree(node, |tree| {
            let mut out: Vec<_> = tree
                .node(node)?
                .children
                .iter()
                .flatten()
                .map(|(name, id)| (name.clone(), *id))
                .collect();
            out.sort();
            Ok(out)
        })
    }

    /// Whether `node` is the root of an attached sub-mount.
    pub fn is_mount_point(&self, node: NodeId) -> bool {
        match self.inode(node) {
            Ok(inode) if inode.mount_id() != MountId::ROOT => self
                .with_tree(node, |tree| Ok(tree.is_mount_root(node)))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Live inodes, root included.
    pub fn inode_count(&self) -> usize {
        self.inodes.len() + 1
    }
}
