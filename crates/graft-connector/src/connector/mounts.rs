//! Grafting and detaching sub-filesystems.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, info, warn};

use graft_types::{MountId, NodeId, NotifyInvalEntry};

use super::FileSystemConnector;
use crate::backend::NodeFileSystem;
use crate::error::{ConnectorError, ConnectorResult};
use crate::inode::Inode;
use crate::mount::{FileSystemMount, MountInfo};
use crate::options::FileSystemOptions;
use crate::path::{join_path, split_path};

impl FileSystemConnector {
    /// Graft `backend` onto the directory entry at `path`.
    ///
    /// The root path replaces the root backend, which is only allowed while
    /// the root has no children. Options default to the root mount's. An
    /// occupied name is `Busy`.
    pub fn mount(
        &self,
        path: &str,
        backend: Arc<dyn NodeFileSystem>,
        opts: Option<FileSystemOptions>,
    ) -> ConnectorResult<MountId> {
        let mut parts = split_path(path);
        let Some(name) = parts.pop() else {
            return self.mount_root(backend, opts);
        };

        let (parent, consumed) = self.walk(&parts)?;
        if consumed < parts.len() {
            warn!(path, "mount parent not found");
            return Err(ConnectorError::not_found(join_path(&parts)));
        }
        let parent_mount = self
            .mounts
            .get(&parent.mount_id())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                warn!(path, mount = %parent.mount_id(), "mount parent has no mount");
                ConnectorError::not_found(join_path(&parts))
            })?;
        let options = match opts {
            Some(options) => options,
            None => self.root_mount()?.options().clone(),
        };

        let id = {
            let mut tree = parent_mount.tree.write();
            // The parent may have been collected or detached since the walk.
            if tree.root.is_none() || !tree.nodes.contains_key(&parent.node_id()) {
                warn!(path, "mount parent went away");
                return Err(ConnectorError::not_found(join_path(&parts)));
            }
            let pnode = tree.node(parent.node_id())?;
            if pnode.children.is_none() {
                return Err(ConnectorError::not_a_directory(join_path(&parts)));
            }
            if pnode.child(&name).is_some() {
                return Err(ConnectorError::busy(format!("{path} is already occupied")));
            }

            let id = MountId::new(self.next_mount_id.fetch_add(1, Ordering::Relaxed));
            let inode = self
                .inodes
                .register_with(|handle| Inode::new(NodeId::new(handle), id, true));
            let mount = FileSystemMount::new(id, inode.node_id(), Arc::clone(&backend), options);
            self.mounts.insert(id, Arc::new(mount));

            let pnode = tree.node_mut(parent.node_id())?;
            if let Some(children) = pnode.children.as_mut() {
                children.insert(name.clone(), inode.node_id());
            }
            pnode.mounts.insert(name, id);
            id
        };
        self.verify()?;

        info!(path, mount = %id, backend = backend.name(), "mounted");
        backend.on_mount(self);
        Ok(id)
    }

    /// Swap the backend serving the root directory.
    fn mount_root(
        &self,
        backend: Arc<dyn NodeFileSystem>,
        opts: Option<FileSystemOptions>,
    ) -> ConnectorResult<MountId> {
        let shared = Arc::clone(&self.root_mount()?.tree);
        let old = {
            let tree = shared.write();
            // Re-read under the lock: another swap may have won the race.
            let old = self.root_mount()?;
            if tree.node(NodeId::ROOT)?.has_children() {
                return Err(ConnectorError::busy("/ has children"));
            }
            if old.open_file_count() > 0 {
                return Err(ConnectorError::busy("/ has open files"));
            }
            let options = opts.unwrap_or_else(|| old.options().clone());
            // The tree, and with it the root's lookup count, carries over.
            let mount = FileSystemMount::with_tree(
                MountId::ROOT,
                Arc::clone(&shared),
                Arc::clone(&backend),
                options,
            );
            self.mounts.insert(MountId::ROOT, Arc::new(mount));
            drop(tree);
            old
        };

        info!(
            old = old.backend().name(),
            new = backend.name(),
            "root backend replaced"
        );
        old.backend().on_unmount();
        backend.on_mount(self);
        Ok(MountId::ROOT)
    }

    /// Detach the sub-filesystem mounted at `path`.
    ///
    /// Fails with `Busy` while files are open under the mount, another
    /// mount is grafted below it, or the kernel still holds lookups on any
    /// of its inodes.
    pub fn unmount(&self, path: &str) -> ConnectorResult<()> {
        let mut parts = split_path(path);
        let Some(name) = parts.pop() else {
            return Err(ConnectorError::invalid("cannot unmount the root"));
        };
        let (parent, consumed) = self.walk(&parts)?;
        if consumed < parts.len() {
            return Err(ConnectorError::invalid(format!("{path} is not a mount point")));
        }
        let parent_mount = self.mount_of(&parent)?;

        let (mount, parent_id) = {
            let mut ptree = parent_mount.tree.write();
            let sub_id = ptree
                .nodes
                .get(&parent.node_id())
                .and_then(|node| node.mounts.get(&name))
                .copied()
                .ok_or_else(|| ConnectorError::invalid(format!("{path} is not a mount point")))?;
            let mount = self.mount_by_id(sub_id)?;
            let mut ctree = mount.tree.write();

            if mount.open_file_count() > 0 {
                return Err(ConnectorError::busy(format!(
                    "{path} has {} open files",
                    mount.open_file_count()
                )));
            }
            if ctree.nodes.values().any(|node| !node.mounts.is_empty()) {
                return Err(ConnectorError::busy(format!("{path} has nested mounts")));
            }
            if let Some((node, count)) = ctree
                .nodes
                .iter()
                .find(|(_, node)| node.lookup_count != 0)
                .map(|(id, node)| (*id, node.lookup_count))
            {
                return Err(ConnectorError::busy(format!(
                    "{path} is still referenced: {node} has {count} lookups"
                )));
            }

            let root = ctree
                .root
                .take()
                .ok_or_else(|| ConnectorError::invariant(format!("mount {sub_id} has no root")))?;
            let released = ctree.collect(root, |id| self.has_open_files(id));
            self.release(&released)?;
            if !ctree.nodes.is_empty() {
                return Err(ConnectorError::invariant(format!(
                    "mount {sub_id} kept {} inodes after unmount",
                    ctree.nodes.len()
                )));
            }

            let pnode = ptree.node_mut(parent.node_id())?;
            pnode.mounts.remove(&name);
            if let Some(children) = pnode.children.as_mut() {
                children.remove(&name);
            }
            self.mounts.remove(&sub_id);
            drop(ctree);
            drop(ptree);

            debug!(path, mount = %sub_id, released = released.len(), "detached");
            (mount, parent.node_id())
        };
        self.verify()?;

        info!(path, mount = %mount.id(), backend = mount.backend().name(), "unmounted");
        mount.backend().on_unmount();
        self.notifier().entry_notify(&NotifyInvalEntry {
            parent: parent_id,
            name,
        })?;
        Ok(())
    }

    /// Every mount in the table, root first.
    pub fn list_mounts(&self) -> Vec<MountInfo> {
        let mounts: Vec<Arc<FileSystemMount>> = self
            .mounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        // A mount unmounted after the snapshot has lost its root.
        let mut infos: Vec<MountInfo> = mounts
            .iter()
            .filter_map(|mount| {
                let tree = mount.tree.read();
                Some(MountInfo {
                    id: mount.id(),
                    mount_inode: tree.root?,
                    backend: mount.backend().name().to_string(),
                    open_files: mount.open_file_count(),
                    inodes: tree.nodes.len(),
                })
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }
}
