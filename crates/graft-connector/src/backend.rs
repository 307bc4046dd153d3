//! Backend filesystem trait.
//!
//! A backend supplies attributes and directory listings for one mount.
//! The connector only calls the lifecycle hooks; `getattr`/`readdir` are
//! there for the protocol layer, which resolves a node to a
//! backend-relative path and asks the mount's backend directly.
//!
//! Paths are always relative to the backend's root (`""` is the root).

use std::path::Path;

use graft_types::{DirEntry, FileAttr};

use crate::connector::FileSystemConnector;
use crate::error::ConnectorResult;

/// A filesystem that can be grafted onto the connector's tree.
pub trait NodeFileSystem: Send + Sync {
    /// Called once after the backend is attached. No connector locks are
    /// held, so the backend may call back into `connector`.
    fn on_mount(&self, connector: &FileSystemConnector) {
        let _ = connector;
    }

    /// Called once after the backend is detached.
    fn on_unmount(&self) {}

    /// Get attributes of a backend-relative path.
    fn getattr(&self, path: &Path) -> ConnectorResult<FileAttr>;

    /// List a directory.
    fn readdir(&self, path: &Path) -> ConnectorResult<Vec<DirEntry>>;

    /// Short name for logs and mount listings.
    fn name(&self) -> &str {
        "nodefs"
    }
}
