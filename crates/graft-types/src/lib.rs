//! Shared value types for graft.
//!
//! A leaf crate: node and mount identifiers, the attribute records backends
//! hand out, and the reply/notification records the connector exchanges
//! with the kernel protocol layer.
//!
//! | Type                 | Purpose                                     |
//! |----------------------|---------------------------------------------|
//! | [`NodeId`]           | Kernel-visible inode id (root is `1`)       |
//! | [`MountId`]          | In-process mount index                      |
//! | [`FileAttr`]         | Backend attribute record                    |
//! | [`EntryOut`]         | Lookup reply with cache validity            |
//! | [`NotifyInvalInode`] | Inode/content invalidation                  |
//! | [`NotifyInvalEntry`] | Directory entry invalidation                |

pub mod attr;
pub mod ids;
pub mod reply;

pub use attr::{DirEntry, FileAttr, FileType, Owner};
pub use ids::{MountId, NodeId};
pub use reply::{EntryOut, NotifyInvalEntry, NotifyInvalInode};
