//! Layout description: connector settings plus in-memory backends.
//!
//! ```ron
//! (
//!     connector: (verify_tree: true),
//!     root: (name: "root", dirs: ["etc"], files: [(path: "etc/motd", size: 12)]),
//!     mounts: [
//!         (path: "/data", backend: (name: "data", files: [(path: "a.bin", size: 4096)])),
//!     ],
//! )
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use graft_connector::{
    ConfigError, ConnectorConfig, ConnectorResult, FileSystemConnector, FileSystemOptions,
    MemoryFileSystem, MountId, NodeId,
};

/// A file to seed into a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: String,
    #[serde(default)]
    pub size: u64,
}

/// Contents of one in-memory backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSpec {
    pub name: String,
    pub dirs: Vec<String>,
    pub files: Vec<FileSpec>,
}

impl Default for BackendSpec {
    fn default() -> Self {
        Self {
            name: "memfs".to_string(),
            dirs: Vec::new(),
            files: Vec::new(),
        }
    }
}

impl BackendSpec {
    /// Build and populate the backend.
    pub fn build(&self) -> ConnectorResult<Arc<MemoryFileSystem>> {
        let fs = MemoryFileSystem::new(self.name.clone());
        for dir in &self.dirs {
            fs.mkdir_all(dir)?;
        }
        for file in &self.files {
            fs.add_file(&file.path, file.size)?;
        }
        Ok(Arc::new(fs))
    }
}

/// A backend grafted at `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountSpec {
    pub path: String,
    #[serde(default)]
    pub backend: BackendSpec,
    /// `None` inherits the root mount's options.
    #[serde(default)]
    pub options: Option<FileSystemOptions>,
}

/// Top-level layout file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraftConfig {
    pub connector: ConnectorConfig,
    pub root: BackendSpec,
    /// Applied in order, so nested mounts come after their parents.
    pub mounts: Vec<MountSpec>,
}

impl GraftConfig {
    /// Parse a RON document.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Read and parse a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Build the connector and apply every mount.
    ///
    /// A mount's parent directory must already be known to the connector,
    /// so the mount path's parent components are looked up on the way. Those
    /// references are returned in [`Layout::held`].
    pub fn build(&self) -> anyhow::Result<Layout> {
        let connector = FileSystemConnector::new(self.root.build()?, self.connector.clone());
        let mut held = Vec::new();
        let mut mounted = Vec::new();
        for spec in &self.mounts {
            let parts = graft_connector::split_path(&spec.path);
            let Some((_, parents)) = parts.split_last() else {
                anyhow::bail!("mount path {:?} names the root", spec.path);
            };
            let mut dir = connector.root().node_id();
            for name in parents {
                dir = connector.lookup_update(dir, name, true, 1)?.node_id();
                held.push(dir);
            }
            let backend = spec.backend.build()?;
            let id = connector.mount(&spec.path, backend, spec.options.clone())?;
            tracing::debug!(path = %spec.path, mount = %id, "layout mount applied");
            mounted.push((spec.path.clone(), id));
        }
        Ok(Layout {
            connector,
            held,
            mounted,
        })
    }
}

/// A built layout.
#[derive(Debug)]
pub struct Layout {
    pub connector: FileSystemConnector,
    /// Lookups taken while resolving mount parents, in order.
    pub held: Vec<NodeId>,
    /// Mount paths and ids, in the order they were applied.
    pub mounted: Vec<(String, MountId)>,
}

impl Layout {
    /// Undo the build, innermost mount first.
    ///
    /// Held lookups inside a mount block its unmount, so they are returned
    /// just before it; the rest go once every mount is gone.
    pub fn teardown(&self) -> anyhow::Result<()> {
        let mut held = Vec::with_capacity(self.held.len());
        for &node in &self.held {
            held.push((node, self.connector.inode(node)?.mount_id()));
        }
        for (path, id) in self.mounted.iter().rev() {
            for &(node, _) in held.iter().rev().filter(|(_, mount)| mount == id) {
                self.connector.forget_update(node, 1)?;
            }
            self.connector.unmount(path)?;
        }
        for &(node, _) in held.iter().rev().filter(|(_, mount)| *mount == MountId::ROOT) {
            self.connector.forget_update(node, 1)?;
        }
        Ok(())
    }
}
