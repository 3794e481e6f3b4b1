//! The per-entity component store.
//!
//! An [`Entity`] owns at most one value per [`ComponentKind`]. Storage is a
//! small ordered map so iteration, serialization and hashing are always in
//! kind order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentKind, ComponentValue, ValueType};
use crate::entity::EntityId;
use crate::EcsError;

/// Width added to every duplicate made with [`Entity::duplicate`].
///
/// Stacked duplicates of the same template are nudged apart this way.
pub const DUPLICATE_WIDTH_INCREMENT: f64 = 1.0;

/// The components owned by one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<ComponentKind, ComponentValue>",
    into = "BTreeMap<ComponentKind, ComponentValue>"
)]
pub struct Entity {
    components: BTreeMap<ComponentKind, ComponentValue>,
}

impl Entity {
    /// Create an entity with no components.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a chained [`EntityBuilder`].
    ///
    /// Prefer this over repeated [`set`](Self::set) calls when a fixture or
    /// level needs several components: the builder defers the first type
    /// error to [`EntityBuilder::build`].
    pub fn builder() -> EntityBuilder {
        EntityBuilder::default()
    }

    /// Build an entity from authored `name -> JSON` pairs.
    ///
    /// Each name is resolved with [`ComponentKind::from_name`] and each value
    /// converted with [`ComponentValue::from_json`], so the shape of the JSON
    /// must match the kind (numbers for positions, strings for names, arrays
    /// of raw handles for collision sets).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownComponent`] for a name outside the closed
    /// set of kinds and [`EcsError::ValueTypeMismatch`] for a value of the
    /// wrong JSON type.
    pub fn from_json_components<'a, I>(components: I) -> Result<Self, EcsError>
    where
        I: IntoIterator<Item = (&'a String, &'a serde_json::Value)>,
    {
        let mut entity = Entity::new();
        for (name, raw) in components {
            let kind = ComponentKind::from_name(name)?;
            let value = ComponentValue::from_json(kind, raw)?;
            entity.components.insert(kind, value);
        }
        Ok(entity)
    }

    /// Attach a component, replacing any existing one of the same kind.
    ///
    /// Last write wins and no error is raised for the replacement. The
    /// component was already type-checked when it was built with
    /// [`Component::new`].
    pub fn add(&mut self, component: Component) {
        let (kind, value) = component.into_parts();
        self.components.insert(kind, value);
    }

    /// Type-checked shorthand for `add(Component::new(kind, value)?)`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ValueTypeMismatch`] when `value` does not fit
    /// `kind`, and [`EcsError::NonFiniteNumber`] for an infinite or NaN
    /// number. The entity is unchanged on error.
    pub fn set(&mut self, kind: ComponentKind, value: impl Into<ComponentValue>) -> Result<(), EcsError> {
        self.add(Component::new(kind, value)?);
        Ok(())
    }

    /// `true` only if every listed kind is present.
    ///
    /// An empty list is trivially satisfied, which is what a system with no
    /// requirements relies on.
    pub fn has(&self, kinds: &[ComponentKind]) -> bool {
        kinds.iter().all(|kind| self.components.contains_key(kind))
    }

    /// Check whether a single kind is present.
    pub fn has_kind(&self, kind: ComponentKind) -> bool {
        self.components.contains_key(&kind)
    }

    /// The stored value, or `None` when the kind is missing.
    ///
    /// No defaults are synthesized here; filling gaps is the job of
    /// [`equip_default`](Self::equip_default), called by conditions and
    /// numeric actions before they read.
    pub fn get(&self, kind: ComponentKind) -> Option<&ComponentValue> {
        self.components.get(&kind)
    }

    /// The numeric value of `kind`.
    ///
    /// `None` when the kind is missing or holds a non-numeric value.
    pub fn number(&self, kind: ComponentKind) -> Option<f64> {
        self.get(kind).and_then(ComponentValue::as_number)
    }

    /// The text value of `kind` (names, groups, asset references).
    ///
    /// `None` when the kind is missing or holds a non-text value.
    pub fn text(&self, kind: ComponentKind) -> Option<&str> {
        self.get(kind).and_then(ComponentValue::as_text)
    }

    /// The boolean value of `kind`.
    ///
    /// `None` when the kind is missing or holds a non-flag value.
    pub fn flag(&self, kind: ComponentKind) -> Option<bool> {
        self.get(kind).and_then(ComponentValue::as_flag)
    }

    /// The set of entities stored under a collided kind.
    ///
    /// The handles are non-owning: an entity removed since the set was built
    /// simply no longer resolves in the collection.
    pub fn entities(&self, kind: ComponentKind) -> Option<&BTreeSet<EntityId>> {
        self.get(kind).and_then(ComponentValue::as_entities)
    }

    /// Remove the listed kinds. Missing kinds are ignored.
    pub fn remove(&mut self, kinds: &[ComponentKind]) {
        for kind in kinds {
            self.components.remove(kind);
        }
    }

    /// Equip `kind` with its default value if it is missing.
    ///
    /// Returns `true` when a component was added.
    pub fn equip_default(&mut self, kind: ComponentKind) -> bool {
        if self.components.contains_key(&kind) {
            return false;
        }
        self.components.insert(kind, kind.default_value());
        true
    }

    /// Add `other` to the entity set stored under `kind`, creating the set if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ValueTypeMismatch`] if `kind` does not hold entity
    /// sets. The entity is left untouched in that case.
    pub fn insert_reference(&mut self, kind: ComponentKind, other: EntityId) -> Result<(), EcsError> {
        if kind.value_type() != ValueType::EntitySet {
            return Err(EcsError::ValueTypeMismatch {
                kind,
                expected: kind.value_type(),
                found: ValueType::EntitySet.to_string(),
            });
        }
        match self.components.entry(kind).or_insert_with(|| kind.default_value()) {
            ComponentValue::Entities(set) => {
                set.insert(other);
                Ok(())
            }
            found => Err(EcsError::ValueTypeMismatch {
                kind,
                expected: kind.value_type(),
                found: found.value_type().to_string(),
            }),
        }
    }

    /// Kinds present on this entity, in kind order.
    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.components.keys().copied()
    }

    /// `(kind, value)` pairs in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentKind, &ComponentValue)> {
        self.components.iter().map(|(k, v)| (*k, v))
    }

    /// Number of components held.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// `true` when the entity holds no components at all.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Deep copy used when a template is instantiated.
    ///
    /// Every value is copied as-is except `Width`, which grows by
    /// [`DUPLICATE_WIDTH_INCREMENT`].
    pub fn duplicate(&self) -> Entity {
        let mut copy = self.clone();
        if let Some(ComponentValue::Number(width)) = copy.components.get_mut(&ComponentKind::Width) {
            *width += DUPLICATE_WIDTH_INCREMENT;
        }
        copy
    }

    /// Deep copy with every transient kind stripped.
    ///
    /// This is the form an entity takes in a save: collision sets are
    /// frame-scoped and never persisted.
    pub fn without_transient(&self) -> Entity {
        Entity {
            components: self
                .components
                .iter()
                .filter(|(kind, _)| !kind.is_transient())
                .map(|(kind, value)| (*kind, value.clone()))
                .collect(),
        }
    }

    /// Drop every transient kind in place.
    pub fn clear_transient(&mut self) {
        self.components.retain(|kind, _| !kind.is_transient());
    }
}

impl TryFrom<BTreeMap<ComponentKind, ComponentValue>> for Entity {
    type Error = EcsError;

    fn try_from(components: BTreeMap<ComponentKind, ComponentValue>) -> Result<Self, Self::Error> {
        let mut entity = Entity::new();
        for (kind, value) in components {
            entity.add(Component::new(kind, value)?);
        }
        Ok(entity)
    }
}

impl From<Entity> for BTreeMap<ComponentKind, ComponentValue> {
    fn from(entity: Entity) -> Self {
        entity.components
    }
}

// ---------------------------------------------------------------------------
// EntityBuilder
// ---------------------------------------------------------------------------

/// Chained construction of an [`Entity`]; the first type error wins.
#[derive(Debug, Default)]
pub struct EntityBuilder {
    entity: Entity,
    error: Option<EcsError>,
}

impl EntityBuilder {
    /// Set `kind` to `value`.
    ///
    /// After the first type error every further call is ignored and the error
    /// is reported by [`build`](Self::build).
    pub fn with(mut self, kind: ComponentKind, value: impl Into<ComponentValue>) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.entity.set(kind, value) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Position and extent in one call.
    pub fn rect(self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.with(ComponentKind::XPosition, x)
            .with(ComponentKind::YPosition, y)
            .with(ComponentKind::Width, width)
            .with(ComponentKind::Height, height)
    }

    /// Both velocity components in one call.
    pub fn velocity(self, dx: f64, dy: f64) -> Self {
        self.with(ComponentKind::XVelocity, dx)
            .with(ComponentKind::YVelocity, dy)
    }

    /// Finish the entity.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a [`with`](Self::with) call.
    pub fn build(self) -> Result<Entity, EcsError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.entity),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
