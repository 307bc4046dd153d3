//! Handle registry.
//!
//! Maps kernel-visible 64-bit handles to the objects they name. Storage is
//! an arena of slots: a handle is `generation << 32 | index`, so decoding
//! is a bounds-checked slot access plus a generation compare. A slot's
//! generation is bumped when its handle is forgotten, which makes every
//! earlier handle for that slot stale even after the slot is reused.
//!
//! Generations start at 1, so no handle is ever `0` or the root id `1`.
//!
//! In checked mode the registry also asks the decoded object for the
//! handle it believes it has and treats any disagreement, or any stale
//! handle, as an internal invariant violation. In fast mode a stale handle
//! is an ordinary [`ConnectorError::StaleHandle`].

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ConnectorError, ConnectorResult};

const INDEX_BITS: u32 = 32;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// An object that knows the handle it was registered under.
pub trait Handled {
    fn handle(&self) -> u64;
}

struct Slot<T> {
    generation: u32,
    value: Option<Arc<T>>,
}

struct Slots<T> {
    entries: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Slots<T> {
    fn occupied(&self, handle: u64) -> Option<&Arc<T>> {
        let (index, generation) = split(handle);
        self.entries
            .get(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_ref())
    }
}

fn split(handle: u64) -> (u32, u32) {
    ((handle & INDEX_MASK) as u32, (handle >> INDEX_BITS) as u32)
}

fn join(index: u32, generation: u32) -> u64 {
    (u64::from(generation) << INDEX_BITS) | u64::from(index)
}

/// Concurrent handle → object registry.
pub struct HandleMap<T> {
    slots: RwLock<Slots<T>>,
    checked: bool,
}

impl<T> HandleMap<T> {
    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.slots.read().live
    }

    /// Returns true if no handle is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> std::fmt::Debug for HandleMap<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleMap")
            .field("live", &self.len())
            .field("checked", &self.checked)
            .finish()
    }
}

impl<T: Handled> HandleMap<T> {
    /// Create an empty registry.
    pub fn new(checked: bool) -> Self {
        Self {
            slots: RwLock::new(Slots {
                entries: Vec::new(),
                free: Vec::new(),
                live: 0,
            }),
            checked,
        }
    }

    /// Whether decode results are cross-checked.
    pub fn is_checked(&self) -> bool {
        self.checked
    }

    /// Allocate a handle and store the object `build` makes for it.
    ///
    /// `build` runs under the registry lock and must not call back into it.
    pub fn register_with(&self, build: impl FnOnce(u64) -> T) -> Arc<T> {
        let mut slots = self.slots.write();
        let index = match slots.free.pop() {
            Some(index) => index,
            None => {
                slots.entries.push(Slot {
                    generation: 1,
                    value: None,
                });
                (slots.entries.len() - 1) as u32
            }
        };
        let slot = &mut slots.entries[index as usize];
        let value = Arc::new(build(join(index, slot.generation)));
        slot.value = Some(Arc::clone(&value));
        slots.live += 1;
        value
    }

    /// Resolve a handle without releasing it.
    pub fn decode(&self, handle: u64) -> ConnectorResult<Arc<T>> {
        let slots = self.slots.read();
        let value = slots.occupied(handle).ok_or_else(|| self.stale(handle))?;
        self.cross_check(handle, value)?;
        Ok(Arc::clone(value))
    }

    /// Release a handle; the slot is recycled under a new generation.
    pub fn forget(&self, handle: u64) -> ConnectorResult<Arc<T>> {
        let mut slots = self.slots.write();
        match slots.occupied(handle) {
            Some(value) => self.cross_check(handle, value)?,
            None => return Err(self.stale(handle)),
        }

        let (index, _) = split(handle);
        let slot = &mut slots.entries[index as usize];
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1).max(1);
        slots.free.push(index);
        slots.live -= 1;
        value.ok_or_else(|| ConnectorError::invariant(format!("slot of {handle:#x} emptied")))
    }

    /// Returns true if the handle currently names an object.
    pub fn contains(&self, handle: u64) -> bool {
        self.slots.read().occupied(handle).is_some()
    }

    fn cross_check(&self, handle: u64, value: &T) -> ConnectorResult<()> {
        if self.checked && value.handle() != handle {
            return Err(ConnectorError::invariant(format!(
                "handle {handle:#x} decodes to an object registered as {:#x}",
                value.handle()
            )));
        }
        Ok(())
    }

    fn stale(&self, handle: u64) -> ConnectorError {
        if self.checked {
            ConnectorError::invariant(format!("handle {handle:#x} is stale or unknown"))
        } else {
            ConnectorError::StaleHandle(handle)
        }
    }
}
