//! Kernel notification channel.
//!
//! The connector pushes cache invalidations to the kernel through a
//! [`KernelNotifier`]. The session layer installs the real one when the
//! kernel handshake completes; until then notifications go to
//! [`NullNotifier`].

use std::io;

use parking_lot::Mutex;

use graft_types::{NotifyInvalEntry, NotifyInvalInode};

/// Outbound half of the kernel protocol.
pub trait KernelNotifier: Send + Sync {
    /// Invalidate an inode's attributes and a byte range of its data.
    fn inode_notify(&self, out: &NotifyInvalInode) -> io::Result<()>;

    /// Invalidate a directory entry.
    fn entry_notify(&self, out: &NotifyInvalEntry) -> io::Result<()>;
}

/// Notifier used before a kernel session exists. Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl KernelNotifier for NullNotifier {
    fn inode_notify(&self, _out: &NotifyInvalInode) -> io::Result<()> {
        Ok(())
    }

    fn entry_notify(&self, _out: &NotifyInvalEntry) -> io::Result<()> {
        Ok(())
    }
}

/// One recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Inode(NotifyInvalInode),
    Entry(NotifyInvalEntry),
}

/// Notifier that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything recorded so far.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Number of notifications recorded so far.
    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KernelNotifier for RecordingNotifier {
    fn inode_notify(&self, out: &NotifyInvalInode) -> io::Result<()> {
        self.sent.lock().push(Notification::Inode(*out));
        Ok(())
    }

    fn entry_notify(&self, out: &NotifyInvalEntry) -> io::Result<()> {
        self.sent.lock().push(Notification::Entry(out.clone()));
        Ok(())
    }
}
