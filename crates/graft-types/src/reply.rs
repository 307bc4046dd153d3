//! Records exchanged with the kernel protocol layer.

use std::ffi::OsString;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::attr::FileAttr;
use crate::ids::NodeId;

/// Reply to a successful (or negative) lookup.
///
/// A negative entry has `node_id == None`; the kernel caches the miss for
/// `entry_valid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryOut {
    pub node_id: Option<NodeId>,
    pub generation: u64,
    pub attr: Option<FileAttr>,
    pub entry_valid: Duration,
    pub attr_valid: Duration,
}

/// Ask the kernel to drop cached data of one inode.
///
/// `offset`/`length` select a byte range; a zero length with zero offset
/// invalidates attributes only, a negative length means "to end of file".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyInvalInode {
    pub node_id: NodeId,
    pub offset: i64,
    pub length: i64,
}

/// Ask the kernel to drop a cached directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyInvalEntry {
    pub parent: NodeId,
    pub name: OsString,
}
