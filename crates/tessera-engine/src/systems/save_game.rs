//! The save path: a transient-free copy of the collection for persistence.
//!
//! This system does nothing during a tick. The engine calls
//! [`SaveGameSystem::save`] on demand; the persistence layer owns all I/O.

use tessera_ecs::prelude::*;

use super::{System, TickReport};
use crate::input::InputSet;
use crate::snapshot::GameSnapshot;

#[derive(Debug, Default)]
pub struct SaveGameSystem;

impl SaveGameSystem {
    /// The saver. It holds no state of its own.
    pub fn new() -> Self {
        Self
    }

    /// Deep copy of every entity with engine-managed components stripped.
    ///
    /// The whole collection is saved, allocator included, so a restore
    /// reproduces the same handles.
    pub fn save(&self, entities: &EntityCollection, level: &str, tick: u64) -> GameSnapshot {
        GameSnapshot::new(level, tick, entities.capture_persistent())
    }
}

impl System for SaveGameSystem {
    fn name(&self) -> &'static str {
        "SaveGame"
    }

    fn required_components(&self) -> &[ComponentKind] {
        &[]
    }

    fn update(&mut self, _entities: &mut EntityCollection, _inputs: &InputSet, _report: &mut TickReport) {}
}
