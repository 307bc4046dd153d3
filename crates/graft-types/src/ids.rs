//! Typed identifiers for inodes and mounts.
//!
//! `NodeId` is the 64-bit value the kernel sees for every live inode. The
//! root is the reserved constant `1`; every other id is minted by the
//! connector's handle registry and is only meaningful while the inode it
//! names is registered. `MountId` never leaves the process: it is the index
//! an inode uses to find the mount (and tree lock) it belongs to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kernel-visible inode identifier.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

/// In-process mount identifier.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MountId(u64);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Wrap a raw value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw 64-bit value.
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $T {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$T> for u64 {
            fn from(id: $T) -> u64 {
                id.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", $name, self.0)
            }
        }
    };
}

impl_typed_id!(NodeId, "NodeId");
impl_typed_id!(MountId, "MountId");

impl NodeId {
    /// The kernel's fixed id for the filesystem root.
    pub const ROOT: NodeId = NodeId(1);

    /// Returns true for the reserved root id.
    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl MountId {
    /// The mount that owns the global root.
    pub const ROOT: MountId = MountId(0);
}
