//! Generational field storage.
//!
//! Agents never hold a field directly; they hold a [`FieldHandle`] — a
//! slot index plus the slot's generation at issue time. Resolving a handle
//! whose generation no longer matches yields `None`, so an agent whose
//! field was destroyed simply reads "absent" on its next tick and falls
//! back, with no dangling reference and no blocking wait.
//!
//! A slot dies when its cache reference is gone **and** no agent
//! references it, or when the scheduler explicitly invalidates it (a
//! discarded or demand-gated request). Freeing bumps the slot generation,
//! which is what makes every outstanding handle stale at once.

use crate::field::FlowField;
use std::fmt;
use std::sync::Arc;

/// Handle to a field slot. Cheap to copy, safe to hold across ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct FieldHandle {
    index: u32,
    generation: u32,
}

impl FieldHandle {
    /// Rebuild a handle from its parts. Exists for tests and serialization
    /// shims; normal code only receives handles from a [`FieldStore`].
    pub fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation at issue time.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for FieldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldHandle(slot={}, gen={})", self.index, self.generation)
    }
}

/// What currently occupies a slot.
#[derive(Clone, Debug, Default)]
enum SlotState {
    /// Nothing; the slot is on the free list.
    #[default]
    Empty,
    /// A request was enqueued but no field exists yet.
    Pending,
    /// A generated field, shared by reference.
    Ready(Arc<FlowField>),
}

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    state: SlotState,
    agent_refs: u32,
    cache_held: bool,
}

/// Slot map owning every live [`FlowField`].
///
/// Single-writer: only the scheduling phase mutates the store. The `Arc`s
/// it hands out are what the parallel movement phase reads.
#[derive(Debug, Default)]
pub struct FieldStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl FieldStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for an in-flight request and return its handle.
    ///
    /// The handle resolves to `None` until [`fulfil`](Self::fulfil) runs.
    pub fn allocate_pending(&mut self) -> FieldHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.state = SlotState::Pending;
            slot.agent_refs = 0;
            slot.cache_held = false;
            FieldHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                state: SlotState::Pending,
                agent_refs: 0,
                cache_held: false,
            });
            FieldHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Place a generated field into its pending slot.
    ///
    /// Returns `false` when the handle is stale (the request outlived its
    /// slot); the caller then stores the field via
    /// [`insert_ready`](Self::insert_ready) instead.
    pub fn fulfil(&mut self, handle: FieldHandle, field: Arc<FlowField>) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => {
                slot.state = SlotState::Ready(field);
                true
            }
            None => false,
        }
    }

    /// Store an already-generated field in a fresh slot.
    pub fn insert_ready(&mut self, field: Arc<FlowField>) -> FieldHandle {
        let handle = self.allocate_pending();
        let fulfilled = self.fulfil(handle, field);
        debug_assert!(fulfilled);
        handle
    }

    /// Resolve a handle to its field. `None` for stale, pending, or empty
    /// slots.
    pub fn get(&self, handle: FieldHandle) -> Option<&Arc<FlowField>> {
        match &self.slot(handle)?.state {
            SlotState::Ready(field) => Some(field),
            _ => None,
        }
    }

    /// Whether the handle points at a live, not-yet-generated slot.
    pub fn is_pending(&self, handle: FieldHandle) -> bool {
        matches!(
            self.slot(handle).map(|s| &s.state),
            Some(SlotState::Pending)
        )
    }

    /// Record one agent reference. Returns `false` for stale handles.
    pub fn add_agent_ref(&mut self, handle: FieldHandle) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => {
                slot.agent_refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drop one agent reference. Stale handles are a no-op. Frees the
    /// slot when this was the last reference to an uncached, generated
    /// field.
    pub fn release_agent_ref(&mut self, handle: FieldHandle) {
        let Some(slot) = self.slot_mut(handle) else {
            return;
        };
        slot.agent_refs = slot.agent_refs.saturating_sub(1);
        let dead = slot.agent_refs == 0
            && !slot.cache_held
            && matches!(slot.state, SlotState::Ready(_));
        if dead {
            self.free_slot(handle.index);
        }
    }

    /// Record the cache's reference. Returns `false` for stale handles.
    pub fn acquire_cache(&mut self, handle: FieldHandle) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => {
                slot.cache_held = true;
                true
            }
            None => false,
        }
    }

    /// Drop the cache's reference (entry evicted). Frees the slot when no
    /// agent still references it; otherwise the slot lives until the last
    /// agent releases.
    pub fn release_cache(&mut self, handle: FieldHandle) {
        let Some(slot) = self.slot_mut(handle) else {
            return;
        };
        slot.cache_held = false;
        if slot.agent_refs == 0 {
            self.free_slot(handle.index);
        }
    }

    /// Force-free a slot regardless of references.
    ///
    /// Used when a request is discarded or demand-gated: the generation
    /// bump makes every assigned handle read as absent next tick, which
    /// re-triggers the demand loop.
    pub fn invalidate(&mut self, handle: FieldHandle) {
        if self.slot(handle).is_some() {
            self.free_slot(handle.index);
        }
    }

    /// Iterate over every generated field and its current handle.
    pub fn iter_ready(&self) -> impl Iterator<Item = (FieldHandle, &Arc<FlowField>)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match &slot.state {
            SlotState::Ready(field) => Some((
                FieldHandle {
                    index: i as u32,
                    generation: slot.generation,
                },
                field,
            )),
            _ => None,
        })
    }

    /// Number of generated fields currently alive.
    pub fn live_fields(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.state, SlotState::Ready(_)))
            .count()
    }

    /// Number of reserved-but-ungenerated slots.
    pub fn pending_fields(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.state, SlotState::Pending))
            .count()
    }

    fn slot(&self, handle: FieldHandle) -> Option<&Slot> {
        let slot = self.slots.get(handle.index as usize)?;
        (slot.generation == handle.generation && !matches!(slot.state, SlotState::Empty))
            .then_some(slot)
    }

    fn slot_mut(&mut self, handle: FieldHandle) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        (slot.generation == handle.generation && !matches!(slot.state, SlotState::Empty))
            .then_some(slot)
    }

    fn free_slot(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.state = SlotState::Empty;
        slot.agent_refs = 0;
        slot.cache_held = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
    }
}
