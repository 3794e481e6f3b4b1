//! Serializable snapshots of an [`EntityCollection`].
//!
//! A [`CollectionSnapshot`] carries the allocator state alongside every
//! entity, so restoring it reproduces the exact handles that were live at
//! capture time (collision sets captured with transient state keep pointing
//! at the right entities).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::collection::EntityCollection;
use crate::entity::{EntityAllocator, EntityId};
use crate::store::Entity;
use crate::EcsError;

/// Allocator state: per-slot generations, alive flags, recycle queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatorSnapshot {
    pub generations: Vec<u32>,
    pub alive: Vec<bool>,
    pub recycled: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: EntityId,
    pub components: Entity,
}

/// A complete copy of a collection, sorted by handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub allocator: AllocatorSnapshot,
    pub entities: Vec<EntitySnapshot>,
}

impl CollectionSnapshot {
    /// The captured copy of entity `id`, if it was live at capture time.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|snap| snap.entity_id == id)
            .map(|snap| &snap.components)
    }

    /// Number of captured entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// `true` when the collection was empty at capture time.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityCollection {
    /// Copy every entity with all of its components.
    pub fn capture_snapshot(&self) -> CollectionSnapshot {
        self.capture_with(Entity::clone)
    }

    /// Copy every entity with transient components stripped.
    pub fn capture_persistent(&self) -> CollectionSnapshot {
        self.capture_with(Entity::without_transient)
    }

    fn capture_with(&self, copy: impl Fn(&Entity) -> Entity) -> CollectionSnapshot {
        let (generations, alive, recycled) = self.allocator.snapshot_state();
        let entities = self
            .entities
            .iter()
            .map(|(id, entity)| EntitySnapshot {
                entity_id: *id,
                components: copy(entity),
            })
            .collect();
        CollectionSnapshot {
            allocator: AllocatorSnapshot {
                generations,
                alive,
                recycled,
            },
            entities,
        }
    }

    /// Rebuild a collection from a snapshot, keeping every handle.
    ///
    /// The snapshot is validated before anything is built, so a corrupt
    /// snapshot never yields a half-restored collection.
    pub fn restore(snapshot: &CollectionSnapshot) -> Result<Self, EcsError> {
        Self::restore_checked(snapshot).inspect_err(|err| {
            tracing::warn!(
                entities = snapshot.entities.len(),
                slots = snapshot.allocator.alive.len(),
                error = %err,
                "refusing to restore snapshot"
            );
        })
    }

    fn restore_checked(snapshot: &CollectionSnapshot) -> Result<Self, EcsError> {
        validate_allocator(snapshot)?;

        let mut entities = BTreeMap::new();
        for snap in &snapshot.entities {
            let slot = snap.entity_id.index() as usize;
            if snapshot.allocator.generations[slot] != snap.entity_id.generation() {
                return Err(EcsError::CorruptSnapshot {
                    details: format!(
                        "entity {} has generation {} but slot {} is at generation {}",
                        snap.entity_id,
                        snap.entity_id.generation(),
                        slot,
                        snapshot.allocator.generations[slot]
                    ),
                });
            }
            if entities.insert(snap.entity_id, snap.components.clone()).is_some() {
                return Err(EcsError::CorruptSnapshot {
                    details: format!("entity {} appears twice", snap.entity_id),
                });
            }
        }

        let allocator = EntityAllocator::from_snapshot_state(
            snapshot.allocator.generations.clone(),
            snapshot.allocator.alive.clone(),
            snapshot.allocator.recycled.clone(),
        );
        Ok(Self {
            allocator,
            entities,
        })
    }
}

fn validate_allocator(snapshot: &CollectionSnapshot) -> Result<(), EcsError> {
    let alloc = &snapshot.allocator;
    let corrupt = |details: String| Err(EcsError::CorruptSnapshot { details });

    if alloc.generations.len() != alloc.alive.len() {
        return corrupt(format!(
            "{} generations vs {} alive flags",
            alloc.generations.len(),
            alloc.alive.len()
        ));
    }

    let mut seen = HashSet::new();
    for &slot in &alloc.recycled {
        match alloc.alive.get(slot as usize) {
            None => return corrupt(format!("recycled slot {slot} out of bounds")),
            Some(true) => return corrupt(format!("recycled slot {slot} is marked alive")),
            Some(false) => {}
        }
        if !seen.insert(slot) {
            return corrupt(format!("recycled slot {slot} listed twice"));
        }
    }

    let occupied: HashSet<u32> = snapshot.entities.iter().map(|e| e.entity_id.index()).collect();
    for (slot, &is_alive) in alloc.alive.iter().enumerate() {
        let has_entity = occupied.contains(&(slot as u32));
        if is_alive != has_entity {
            return corrupt(format!(
                "slot {slot} alive={is_alive} but entity present={has_entity}"
            ));
        }
    }
    if occupied.iter().any(|&slot| slot as usize >= alloc.alive.len()) {
        return corrupt("entity refers to a slot past the allocator".to_owned());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind::*;

    fn world_with_collision() -> (EntityCollection, EntityId, EntityId) {
        let mut world = EntityCollection::new();
        let a = world.spawn(Entity::builder().with(Score, 10.0).build().unwrap());
        let b = world.spawn(Entity::builder().with(Lives, 2.0).build().unwrap());
        world.get_mut(a).unwrap().insert_reference(RightCollided, b).unwrap();
        (world, a, b)
    }

    #[test]
    fn persistent_capture_strips_transient() {
        let (world, a, _) = world_with_collision();
        let full = world.capture_snapshot();
        let persistent = world.capture_persistent();
        assert!(full.get(a).unwrap().has_kind(RightCollided));
        assert!(!persistent.get(a).unwrap().has_kind(RightCollided));
        assert_eq!(persistent.get(a).unwrap().number(Score), Some(10.0));
    }

    #[test]
    fn restore_keeps_handles_and_allocator() {
        let (mut world, a, b) = world_with_collision();
        world.remove(b);
        let snap = world.capture_snapshot();

        let mut restored = EntityCollection::restore(&snap).unwrap();
        assert!(restored.contains(a));
        assert!(!restored.contains(b));
        // Next spawn recycles b's slot exactly as the original would.
        let mut original = world.clone();
        assert_eq!(restored.spawn(Entity::new()), original.spawn(Entity::new()));
    }

    #[test]
    fn snapshot_json_round_trip() {
        let (world, _, _) = world_with_collision();
        let snap = world.capture_snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: CollectionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn restore_rejects_alive_slot_without_entity() {
        let (world, _, _) = world_with_collision();
        let mut snap = world.capture_snapshot();
        snap.entities.pop();
        assert!(matches!(
            EntityCollection::restore(&snap),
            Err(EcsError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn restore_rejects_recycled_live_slot() {
        let (world, a, _) = world_with_collision();
        let mut snap = world.capture_snapshot();
        snap.allocator.recycled.push(a.index());
        assert!(EntityCollection::restore(&snap).is_err());
    }
}
