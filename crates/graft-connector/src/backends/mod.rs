//! Backends.
//!
//! Backends implement [`NodeFileSystem`](crate::NodeFileSystem) for
//! different storage types.

mod memory;

pub use memory::MemoryFileSystem;
