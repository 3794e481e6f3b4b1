//! Tessera Engine -- the simulation core of a 2-D game engine.
//!
//! This crate builds on [`tessera_ecs`] to provide the per-frame driver: an
//! ordered pipeline of systems (movement, directional collision, authored
//! events) that mutates one shared entity collection per tick, plus the
//! level loader, the declarative condition/action model and the save path.
//!
//! # Quick Start
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! let level = Level::from_json_str(r#"{
//!     "name": "yard",
//!     "width": 100,
//!     "height": 100,
//!     "entities": [
//!         {"Name": "grunt", "Group": "Enemy", "Score": 150, "Lives": 3, "CameraFocus": true}
//!     ],
//!     "events": [{
//!         "name": "wear_down",
//!         "entity_type": "Enemy",
//!         "conditions": [{"kind": "Compare", "component": "Score", "op": ">", "value": 100}],
//!         "actions": [{"kind": "Add", "component": "Lives", "delta": -1}]
//!     }]
//! }"#).unwrap();
//!
//! let mut engine = Engine::from_level(level).unwrap();
//! let entities = engine.update_state(&InputSet::new());
//! let (_, grunt) = entities.iter().next().unwrap();
//! assert_eq!(grunt.number(ComponentKind::Lives), Some(2.0));
//! ```

#![deny(unsafe_code)]

pub mod action;
pub mod condition;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod input;
pub mod level;
pub mod snapshot;
pub mod systems;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use tessera_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use tessera_ecs::prelude::*;

    pub use crate::action::{Action, ActionOutcome};
    pub use crate::condition::{CollisionSide, CompareOp, Condition, ConditionContext};
    pub use crate::config::{CollisionConfig, EngineConfig, SystemSpec};
    pub use crate::engine::{Engine, TickDiagnostics};
    pub use crate::error::{ActionError, EngineError};
    pub use crate::event::{Event, EventSpec, RuleSpec};
    pub use crate::input::InputSet;
    pub use crate::level::{Level, LevelDescription};
    pub use crate::snapshot::GameSnapshot;
    pub use crate::systems::{ActionFailure, Axis, Contact, System, SystemKind, TickReport};
}
