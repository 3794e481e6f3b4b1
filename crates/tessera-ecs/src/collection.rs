//! The live entity collection shared by every system in a tick.

use std::collections::BTreeMap;

use crate::component::ComponentKind;
use crate::entity::{EntityAllocator, EntityId};
use crate::store::Entity;

/// All live entities, keyed by handle and iterated in handle order.
///
/// Systems receive this collection by `&mut` one after another, so structural
/// changes made by one system are visible to every later system in the same
/// tick. A handle whose entity has been removed resolves to `None` everywhere.
#[derive(Debug, Clone, Default)]
pub struct EntityCollection {
    pub(crate) allocator: EntityAllocator,
    pub(crate) entities: BTreeMap<EntityId, Entity>,
}

impl EntityCollection {
    /// Create an empty collection with a fresh allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `entity` and give it a fresh handle.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = self.allocator.allocate();
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity, returning it. Stale handles yield `None`.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.allocator.free(id);
        Some(entity)
    }

    /// Check whether `id` refers to a live entity.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Borrow a live entity.
    ///
    /// Returns `None` for a removed or never-allocated handle, so stale
    /// collision references are skipped rather than dereferenced.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutably borrow a live entity. `None` for stale handles.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Handles of every live entity, in iteration order. Systems that change
    /// structure while iterating walk this list instead of the map.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Handles of entities carrying every kind in `kinds`.
    pub fn ids_with(&self, kinds: &[ComponentKind]) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, entity)| entity.has(kinds))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Live entities in handle order.
    ///
    /// The order is fixed by the handles alone, which is what keeps pairwise
    /// collision detection and event evaluation deterministic.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().map(|(id, e)| (*id, e))
    }

    /// Mutable iteration in handle order. Structure cannot change meanwhile.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut Entity)> {
        self.entities.iter_mut().map(|(id, e)| (*id, e))
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// `true` when no entity is live.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Strip every transient component from every entity.
    pub fn clear_transient(&mut self) {
        for entity in self.entities.values_mut() {
            entity.clear_transient();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ComponentKind::*;

    fn scored(score: f64) -> Entity {
        Entity::builder().with(Score, score).build().unwrap()
    }

    #[test]
    fn spawn_and_get() {
        let mut world = EntityCollection::new();
        let a = world.spawn(scored(1.0));
        let b = world.spawn(scored(2.0));
        assert_ne!(a, b);
        assert_eq!(world.get(b).and_then(|e| e.number(Score)), Some(2.0));
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn removed_handles_never_resolve_again() {
        let mut world = EntityCollection::new();
        let a = world.spawn(scored(1.0));
        assert!(world.remove(a).is_some());
        assert!(world.remove(a).is_none());

        // The slot is recycled but the old handle stays dead.
        let b = world.spawn(scored(5.0));
        assert_eq!(b.index(), a.index());
        assert!(world.get(a).is_none());
        assert!(world.contains(b));
    }

    #[test]
    fn ids_with_filters_on_all_kinds() {
        let mut world = EntityCollection::new();
        let plain = world.spawn(scored(1.0));
        let mut rich = scored(2.0);
        rich.set(Lives, 3.0).unwrap();
        let rich = world.spawn(rich);

        assert_eq!(world.ids_with(&[Score]), vec![plain, rich]);
        assert_eq!(world.ids_with(&[Score, Lives]), vec![rich]);
    }

    #[test]
    fn clear_transient_leaves_gameplay_state() {
        let mut world = EntityCollection::new();
        let a = world.spawn(scored(1.0));
        let b = world.spawn(scored(2.0));
        world.get_mut(a).unwrap().insert_reference(AnyCollided, b).unwrap();

        world.clear_transient();
        let a = world.get(a).unwrap();
        assert!(!a.has_kind(AnyCollided));
        assert_eq!(a.number(Score), Some(1.0));
    }
}
