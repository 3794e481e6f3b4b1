//! Entity handles and their allocation.
//!
//! An [`EntityId`] packs a *generation* in the high 32 bits and a slot
//! *index* in the low 32 bits. Removing an entity bumps the generation of its
//! slot, so every handle still pointing at the old occupant stops resolving.
//! Collision sets hold plain `EntityId`s for exactly this reason: a handle to
//! a removed entity can be looked up safely and simply finds nothing.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational, non-owning entity handle.
///
/// Layout: `[generation: u32 | index: u32]`. Handles order by slot index
/// first, then generation, which is the iteration order of
/// [`EntityCollection`](crate::collection::EntityCollection).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    #[inline]
    /// Build a handle from its slot index and generation.
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    #[inline]
    /// Slot index. Reused after removal, so never an identity on its own.
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    /// How many times the slot had been recycled when this handle was made.
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` representation, as written to snapshots.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    #[inline]
    /// Inverse of [`to_raw`](Self::to_raw).
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.index(), self.generation()).cmp(&(other.index(), other.generation()))
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out [`EntityId`]s and recycles the slots of removed entities.
///
/// Recycled slots are reused oldest-first. The allocator never reads a clock
/// or an RNG, so the same sequence of spawns and removals always yields the
/// same handles.
#[derive(Debug, Clone, Default)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    recycled: VecDeque<u32>,
}

impl EntityAllocator {
    /// An allocator with no slots in use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle, reusing the oldest freed slot when one exists.
    pub fn allocate(&mut self) -> EntityId {
        match self.recycled.pop_front() {
            Some(index) => {
                let slot = index as usize;
                self.alive[slot] = true;
                EntityId::new(index, self.generations[slot])
            }
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                self.alive.push(true);
                EntityId::new(index, 0)
            }
        }
    }

    /// Free a handle. Returns `false` when it was already stale.
    pub fn free(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let slot = id.index() as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.recycled.push_back(id.index());
        true
    }

    /// `true` while `id` is the current generation of a live slot.
    pub fn is_alive(&self, id: EntityId) -> bool {
        let slot = id.index() as usize;
        slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == id.generation()
    }

    /// Number of live handles.
    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// Owned copy of `(generations, alive, recycled)` for snapshots.
    pub fn snapshot_state(&self) -> (Vec<u32>, Vec<bool>, Vec<u32>) {
        (
            self.generations.clone(),
            self.alive.clone(),
            self.recycled.iter().copied().collect(),
        )
    }

    /// Rebuild an allocator from [`snapshot_state`](Self::snapshot_state)
    /// output. Callers validate consistency first.
    pub fn from_snapshot_state(generations: Vec<u32>, alive: Vec<bool>, recycled: Vec<u32>) -> Self {
        Self {
            generations,
            alive,
            recycled: VecDeque::from(recycled),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
