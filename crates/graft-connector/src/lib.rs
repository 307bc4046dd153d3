//! Graft connector.
//!
//! Sits between a FUSE-style kernel protocol and pluggable backend
//! filesystems. It keeps the tree of inodes the kernel knows about,
//! translates 64-bit node ids to inodes, applies lookup/forget reference
//! counting, and grafts independent backends onto directories.
//!
//! Key components:
//!
//! - [`FileSystemConnector`] - The inode tree, mount table and notifier
//! - [`HandleMap`] - Generation-checked handle registry
//! - [`NodeFileSystem`] - Trait backends implement
//! - [`KernelNotifier`] - Outbound invalidation channel
//! - [`MemoryFileSystem`] - In-memory backend (testing, CLI)
//!
//! ## Design Decisions
//!
//! - **Per-mount tree locks**: each mount's structural state sits behind
//!   its own `RwLock`; walking into a sub-mount hands the lock over.
//! - **Arena handles**: node ids are `generation << 32 | slot`, so a
//!   forgotten id can never alias a newer inode.
//! - **Collection on forget**: inodes are released only when the kernel
//!   drops its last reference and nothing else pins them.

pub mod backends;
mod backend;
mod connector;
mod error;
mod handle;
mod inode;
mod mount;
mod notify;
mod options;
mod path;

pub use backend::NodeFileSystem;
pub use backends::MemoryFileSystem;
pub use connector::FileSystemConnector;
pub use error::{ConnectorError, ConnectorResult};
pub use handle::{HandleMap, Handled};
pub use inode::Inode;
pub use mount::{FileSystemMount, MountInfo, OpenedFile};
pub use notify::{KernelNotifier, Notification, NullNotifier, RecordingNotifier};
pub use options::{ConfigError, ConnectorConfig, FileSystemOptions, current_owner, secs};
pub use path::split_path;

pub use graft_types::{
    DirEntry, EntryOut, FileAttr, FileType, MountId, NodeId, NotifyInvalEntry, NotifyInvalInode,
    Owner,
};
