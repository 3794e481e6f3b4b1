//! Tessera ECS -- entities, typed component slots and the live collection.
//!
//! Component kinds form a closed enum ([`ComponentKind`](component::ComponentKind))
//! and values a tagged union ([`ComponentValue`](component::ComponentValue)),
//! so an entity is just a small ordered map from kind to value. Entities live
//! in an [`EntityCollection`](collection::EntityCollection) under generational
//! handles; a handle to a removed entity never resolves again.
//!
//! # Quick Start
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! let mut world = EntityCollection::new();
//! let hero = Entity::builder()
//!     .rect(10.0, 0.0, 4.0, 4.0)
//!     .with(ComponentKind::Name, "hero")
//!     .build()
//!     .unwrap();
//! let id = world.spawn(hero);
//!
//! let hero = world.get(id).unwrap();
//! assert!(hero.has(&[ComponentKind::XPosition, ComponentKind::Width]));
//! assert_eq!(hero.text(ComponentKind::Name), Some("hero"));
//! ```

#![deny(unsafe_code)]

pub mod collection;
pub mod component;
pub mod entity;
pub mod snapshot;
pub mod store;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by component and collection operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EcsError {
    /// A component kind name that is not part of [`component::ComponentKind`].
    #[error("unknown component kind '{name}'. Known kinds: [{registered}]")]
    UnknownComponent { name: String, registered: String },

    /// A value whose type does not match its kind.
    #[error("component {kind} holds a {expected} value, got {found}")]
    ValueTypeMismatch {
        kind: component::ComponentKind,
        expected: component::ValueType,
        found: String,
    },

    /// A number that is infinite or NaN. Such values cannot survive a JSON
    /// save, so no component may hold one.
    #[error("component {kind} cannot hold the non-finite number {value}")]
    NonFiniteNumber { kind: component::ComponentKind, value: f64 },

    /// The entity does not exist (removed or never allocated).
    #[error("entity {entity} does not exist")]
    StaleEntity { entity: entity::EntityId },

    /// A snapshot whose allocator state and entity list disagree.
    #[error("corrupt snapshot: {details}")]
    CorruptSnapshot { details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::collection::EntityCollection;
    pub use crate::component::{Component, ComponentKind, ComponentValue, ValueType};
    pub use crate::entity::EntityId;
    pub use crate::snapshot::{CollectionSnapshot, EntitySnapshot};
    pub use crate::store::{Entity, EntityBuilder, DUPLICATE_WIDTH_INCREMENT};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
