//! Handle-to-context registry.
//!
//! Driver objects reach us as opaque 64-bit handle values. Each tracked
//! object type gets one `HandleRegistry`, which maps the raw handle value to
//! a context owned by a generational arena. Storing generational IDs instead
//! of pointers means a lookup after destruction returns `None` even if the
//! driver recycles the handle value for a new object.
//!
//! The lock is a single mutex per registry and is held only for the map
//! operation itself, never across a driver call. Lookups happen once per
//! lifecycle event and once per present, so contention is a non-issue.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Opaque identifier for an arena slot. Stale IDs (freed slot, or slot
/// reused by a later insert) fail the generation check on access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId {
    index: u32,
    generation: u32,
}

struct Slot<T> {
    generation: u32,
    value: Option<Arc<T>>,
}

/// Generational arena of owned contexts.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new(), free: Vec::new() }
    }

    pub fn insert(&mut self, value: Arc<T>) -> ContextId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.value = Some(value);
                ContextId { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, value: Some(value) });
                ContextId { index, generation: 0 }
            }
        }
    }

    pub fn get(&self, id: ContextId) -> Option<Arc<T>> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.clone()
    }

    pub fn remove(&mut self, id: ContextId) -> Option<Arc<T>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        // Bump so stale IDs to this slot stop resolving.
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct Inner<T> {
    arena: Arena<T>,
    by_handle: HashMap<u64, ContextId>,
}

/// One registry per tracked object type (instance, device, queue, command
/// buffer, swapchain). A handle maps to at most one live context.
pub struct HandleRegistry<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> HandleRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                arena: Arena::new(),
                by_handle: HashMap::new(),
            }),
        }
    }

    /// Register `context` under `handle`. Re-registering a live handle
    /// replaces the mapping (the previous context is dropped); the driver
    /// never hands out the same handle twice without destroying it first,
    /// so this only happens on handle-value reuse.
    pub fn register(&self, handle: u64, context: Arc<T>) -> ContextId {
        let mut inner = self.inner.lock();
        let id = inner.arena.insert(context);
        if let Some(old) = inner.by_handle.insert(handle, id) {
            inner.arena.remove(old);
        }
        id
    }

    /// Map an additional handle value to an already-registered context
    /// (e.g. physical devices resolving to their instance context).
    pub fn alias(&self, handle: u64, id: ContextId) {
        let mut inner = self.inner.lock();
        inner.by_handle.insert(handle, id);
    }

    pub fn lookup(&self, handle: u64) -> Option<Arc<T>> {
        let inner = self.inner.lock();
        let id = *inner.by_handle.get(&handle)?;
        inner.arena.get(id)
    }

    /// The context id currently mapped to `handle`, for aliasing.
    pub fn id_of(&self, handle: u64) -> Option<ContextId> {
        self.inner.lock().by_handle.get(&handle).copied()
    }

    /// Remove the mapping and return the context. Unregistering an absent
    /// handle is a no-op returning `None`; the boundary APIs are legal to
    /// call with already-freed objects.
    pub fn unregister(&self, handle: u64) -> Option<Arc<T>> {
        let mut inner = self.inner.lock();
        let id = inner.by_handle.remove(&handle)?;
        inner.arena.remove(id)
    }

    /// Remove every mapping whose context matches `predicate`, for bulk
    /// release when an owning object (device, command pool) goes away.
    /// Returns the number of contexts dropped.
    pub fn sweep(&self, predicate: impl Fn(&T) -> bool) -> usize {
        let mut inner = self.inner.lock();
        let doomed: Vec<(u64, ContextId)> = inner
            .by_handle
            .iter()
            .filter(|(_, id)| inner.arena.get(**id).is_some_and(|ctx| predicate(&ctx)))
            .map(|(handle, id)| (*handle, *id))
            .collect();
        let mut dropped = 0;
        for (handle, id) in doomed {
            inner.by_handle.remove(&handle);
            if inner.arena.remove(id).is_some() {
                dropped += 1;
            }
        }
        dropped
    }

    /// Drop an alias without touching the context it points at.
    pub fn unalias(&self, handle: u64) {
        let mut inner = self.inner.lock();
        inner.by_handle.remove(&handle);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().arena.is_empty()
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
