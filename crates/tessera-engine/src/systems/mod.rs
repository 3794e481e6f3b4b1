//! The system pipeline.
//!
//! A system declares the component kinds an entity must carry for the system
//! to touch it, and updates the shared [`EntityCollection`] once per tick.
//! Systems are named in configuration and resolved by
//! [`SystemKind::from_name`]; the set is closed and grows at compile time.
//!
//! Two systems get extra treatment from the [`Engine`](crate::engine::Engine):
//! collision is also asked to separate overlapping entities once every other
//! system has run, and save-game never runs in the tick loop at all.

pub mod boundary;
pub mod collision;
pub mod event_handler;
pub mod movement;
pub mod save_game;

use std::fmt;

use tessera_ecs::prelude::*;

use crate::error::{ActionError, EngineError};
use crate::input::InputSet;

pub use boundary::BoundarySystem;
pub use collision::{Axis, CollisionSystem, Contact};
pub use event_handler::EventHandlerSystem;
pub use movement::MovementSystem;
pub use save_game::SaveGameSystem;

// ---------------------------------------------------------------------------
// System trait
// ---------------------------------------------------------------------------

/// One stage of the per-tick pipeline.
pub trait System {
    fn name(&self) -> &'static str;

    /// Kinds an entity must carry, all of them, to be updated by this system.
    fn required_components(&self) -> &[ComponentKind];

    /// Advance this system by one tick.
    ///
    /// Structural changes (spawned or removed entities) are visible to every
    /// system that runs later in the same tick. Recoverable problems go into
    /// `report`; they never abort the tick.
    fn update(&mut self, entities: &mut EntityCollection, inputs: &InputSet, report: &mut TickReport);
}

// ---------------------------------------------------------------------------
// SystemKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SystemKind {
    Movement,
    Collision,
    EventHandler,
    Boundary,
    SaveGame,
}

impl SystemKind {
    pub const ALL: [SystemKind; 5] = [
        SystemKind::Movement,
        SystemKind::Collision,
        SystemKind::EventHandler,
        SystemKind::Boundary,
        SystemKind::SaveGame,
    ];

    /// The configuration name of this system.
    pub fn name(self) -> &'static str {
        match self {
            SystemKind::Movement => "Movement",
            SystemKind::Collision => "Collision",
            SystemKind::EventHandler => "EventHandler",
            SystemKind::Boundary => "Boundary",
            SystemKind::SaveGame => "SaveGame",
        }
    }

    /// Resolve a configuration name.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownSystem`], listing the known names, for
    /// anything else.
    pub fn from_name(name: &str) -> Result<Self, EngineError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| EngineError::UnknownSystem {
                name: name.to_owned(),
                known: Self::ALL.map(SystemKind::name).join(", "),
            })
    }

    /// Kinds the system always needs, before configured extras.
    pub fn base_requirements(self) -> &'static [ComponentKind] {
        use ComponentKind::*;
        match self {
            SystemKind::Movement => &[XPosition, YPosition, XVelocity, YVelocity],
            SystemKind::Collision => &[XPosition, YPosition, Width, Height, Collision],
            SystemKind::Boundary => &[XPosition, YPosition, Width, Height],
            SystemKind::EventHandler | SystemKind::SaveGame => &[],
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Base requirements of `kind` plus the configured extra kind names,
/// deduplicated and in kind order.
pub fn resolve_requirements(kind: SystemKind, extra: &[String]) -> Result<Vec<ComponentKind>, EngineError> {
    let mut required: Vec<ComponentKind> = kind.base_requirements().to_vec();
    for name in extra {
        required.push(ComponentKind::from_name(name)?);
    }
    required.sort();
    required.dedup();
    Ok(required)
}

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

/// An action that could not be applied. The rest of its event still ran.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionFailure {
    pub event: String,
    pub entity: EntityId,
    pub action: &'static str,
    pub error: ActionError,
}

/// Side results a tick produces besides the mutated collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub action_failures: Vec<ActionFailure>,
    /// Level requested by a `ChangeLevel` action. The last request wins.
    pub level_request: Option<String>,
}
