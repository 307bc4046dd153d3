//! Drive the lookup protocol over a whole layout, the way the kernel
//! would while listing every directory.

use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use graft_connector::{
    ConnectorResult, DirEntry, FileSystemConnector, FileType, MountId, NodeFileSystem, NodeId,
};

/// One node reached by the walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub depth: usize,
    pub name: String,
    pub node: NodeId,
    pub kind: FileType,
    /// Set when the node is the root of a grafted mount.
    pub mount: Option<(MountId, String)>,
}

/// Look up every entry below the root, depth first.
///
/// Each visited node gets one lookup; hand the result to [`forget`] to
/// return them.
pub fn walk(conn: &FileSystemConnector, max_depth: Option<usize>) -> ConnectorResult<Vec<Visit>> {
    let root = conn.root();
    let backend = Arc::clone(conn.mount_of(root)?.backend());
    let mut visits = Vec::new();
    walk_dir(conn, root.node_id(), &backend, Path::new(""), 0, max_depth, &mut visits)?;
    Ok(visits)
}

fn walk_dir(
    conn: &FileSystemConnector,
    dir: NodeId,
    backend: &Arc<dyn NodeFileSystem>,
    path: &Path,
    depth: usize,
    max_depth: Option<usize>,
    visits: &mut Vec<Visit>,
) -> ConnectorResult<()> {
    let mut entries = backend.readdir(path)?;
    // Mount points need not exist in the parent backend.
    for (name, child) in conn.children(dir)? {
        let name = name.to_string_lossy().into_owned();
        if conn.is_mount_point(child) && !entries.iter().any(|e| e.name == name) {
            entries.push(DirEntry::directory(name));
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    for entry in entries {
        let grafted = conn
            .children(dir)?
            .into_iter()
            .find(|(name, child)| *name == *entry.name && conn.is_mount_point(*child));

        let (child_backend, child_path) = match &grafted {
            Some((_, child)) => {
                let root = conn.inode(*child)?;
                let mount = conn.mount_of(&root)?;
                (Arc::clone(mount.backend()), PathBuf::new())
            }
            None => (Arc::clone(backend), path.join(&entry.name)),
        };
        let attr = child_backend.getattr(&child_path)?;
        let (_, inode) = conn.create_child(dir, OsStr::new(&entry.name), &attr)?;

        let mount = grafted.is_some().then(|| {
            (inode.mount_id(), child_backend.name().to_string())
        });
        visits.push(Visit {
            depth,
            name: entry.name,
            node: inode.node_id(),
            kind: attr.kind,
            mount,
        });

        if attr.is_dir() && max_depth.is_none_or(|max| depth + 1 < max) {
            walk_dir(
                conn,
                inode.node_id(),
                &child_backend,
                &child_path,
                depth + 1,
                max_depth,
                visits,
            )?;
        }
    }
    Ok(())
}

/// Return the lookups a walk took, deepest first.
pub fn forget(conn: &FileSystemConnector, visits: &[Visit]) -> ConnectorResult<()> {
    for visit in visits.iter().rev() {
        conn.forget_update(visit.node, 1)?;
    }
    Ok(())
}

/// Render visits as an indented listing.
pub fn render(conn: &FileSystemConnector, visits: &[Visit]) -> String {
    let mut out = String::from("/\n");
    for visit in visits {
        let indent = "  ".repeat(visit.depth + 1);
        let suffix = if visit.kind.is_dir() { "/" } else { "" };
        let lookups = conn.lookup_count(visit.node).unwrap_or_default();
        let _ = write!(out, "{indent}{}{suffix}  {} lookups={lookups}", visit.name, visit.node);
        if let Some((id, backend)) = &visit.mount {
            let _ = write!(out, "  [mount {id} {backend}]");
        }
        out.push('\n');
    }
    out
}
