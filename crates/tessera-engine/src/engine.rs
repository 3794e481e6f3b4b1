//! The engine: owns the live entity collection and drives the pipeline.
//!
//! Each call to [`Engine::update_state`] is one tick:
//!
//! 1. Last tick's collision tags are stripped, so no system ever reads them,
//!    whatever its priority relative to collision detection.
//! 2. Every configured system runs in ascending priority order against the
//!    same collection. Structural changes are visible to later systems.
//! 3. The collision system separates the pairs it detected this tick.
//! 4. The tick counter advances and diagnostics are recorded.
//!
//! Nothing in a tick reads the clock or draws random numbers (timings only
//! feed [`TickDiagnostics`]), so the same collection, inputs and events
//! always produce the same result.
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! let level = Level::new("corridor", 100.0, 20.0)
//!     .with_entity(
//!         Entity::builder()
//!             .rect(10.0, 0.0, 4.0, 4.0)
//!             .velocity(2.0, 0.0)
//!             .with(ComponentKind::Collision, true)
//!             .build()
//!             .unwrap(),
//!     )
//!     .with_entity(
//!         Entity::builder()
//!             .rect(18.0, 0.0, 4.0, 4.0)
//!             .with(ComponentKind::Collision, true)
//!             .build()
//!             .unwrap(),
//!     );
//! let mut engine = Engine::new(level, &EngineConfig::default()).unwrap();
//! for _ in 0..4 {
//!     engine.update_state(&InputSet::new());
//! }
//! assert_eq!(engine.tick_count(), 4);
//! assert_eq!(engine.collision_contacts().len(), 1);
//! ```

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tessera_ecs::prelude::*;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::input::InputSet;
use crate::level::Level;
use crate::snapshot::{self, GameSnapshot};
use crate::systems::{
    resolve_requirements, ActionFailure, BoundarySystem, CollisionSystem, Contact, EventHandlerSystem,
    MovementSystem, SaveGameSystem, System, SystemKind, TickReport,
};

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// What happened during the last tick, besides the state change itself.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per system, in execution order.
    pub system_times: Vec<(String, Duration)>,
    /// Time spent separating collided entities.
    pub adjust_time: Duration,
    pub total_time: Duration,
    /// Actions skipped because they did not fit their entity.
    pub action_failures: Vec<ActionFailure>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A pipeline slot. Collision lives in its own field because the engine also
/// calls it after the loop; its slot only marks when it runs.
enum Stage {
    Collision,
    System(Box<dyn System>),
}

pub struct Engine {
    level_name: String,
    room_width: f64,
    room_height: f64,
    background: Option<String>,
    music: Option<String>,
    entities: EntityCollection,
    pipeline: BTreeMap<u32, Stage>,
    collision: Option<CollisionSystem>,
    save_game: SaveGameSystem,
    tick_counter: u64,
    last_diagnostics: TickDiagnostics,
    level_request: Option<String>,
}

impl Engine {
    /// Build the pipeline described by `config` and load `level` into it.
    ///
    /// # Errors
    ///
    /// Fails on an unknown system or component kind name, on two systems
    /// sharing a priority, on a second collision system, and on requirements
    /// given to the save-game system (it always saves the whole collection).
    pub fn new(level: Level, config: &EngineConfig) -> Result<Self, EngineError> {
        let mut pipeline = BTreeMap::new();
        let mut claimed: BTreeMap<u32, &str> = BTreeMap::new();
        let mut collision = None;

        for spec in &config.pipeline {
            let kind = SystemKind::from_name(&spec.system)?;
            if let Some(first) = claimed.insert(spec.priority, kind.name()) {
                return Err(EngineError::DuplicatePriority {
                    priority: spec.priority,
                    first: first.to_owned(),
                    second: kind.name().to_owned(),
                });
            }
            let required = resolve_requirements(kind, &spec.requires)?;

            let stage = match kind {
                SystemKind::Movement => Stage::System(Box::new(MovementSystem::new(required))),
                SystemKind::Collision => {
                    if collision.is_some() {
                        return Err(EngineError::InvalidConfig(
                            "at most one Collision system may be configured".to_owned(),
                        ));
                    }
                    collision = Some(CollisionSystem::new(required, config.collision.tie_axis));
                    Stage::Collision
                }
                SystemKind::EventHandler => Stage::System(Box::new(EventHandlerSystem::new(
                    level.events.clone(),
                    level.templates.clone(),
                    required,
                ))),
                SystemKind::Boundary => {
                    Stage::System(Box::new(BoundarySystem::new(level.width, level.height, required)))
                }
                SystemKind::SaveGame => {
                    if !spec.requires.is_empty() {
                        return Err(EngineError::InvalidConfig(
                            "SaveGame saves the whole collection and takes no requirements".to_owned(),
                        ));
                    }
                    continue;
                }
            };
            pipeline.insert(spec.priority, stage);
        }

        level.check_camera_contract();

        let Level {
            name,
            width,
            height,
            background,
            music,
            entities: initial,
            ..
        } = level;
        let mut entities = EntityCollection::new();
        for entity in initial {
            entities.spawn(entity);
        }

        info!(
            level = %name,
            entities = entities.len(),
            systems = pipeline.len(),
            "engine created"
        );

        Ok(Self {
            level_name: name,
            room_width: width,
            room_height: height,
            background,
            music,
            entities,
            pipeline,
            collision,
            save_game: SaveGameSystem::new(),
            tick_counter: 0,
            last_diagnostics: TickDiagnostics::default(),
            level_request: None,
        })
    }

    /// Engine with the default pipeline: Movement, Collision, EventHandler.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new). The default configuration itself is
    /// always valid.
    pub fn from_level(level: Level) -> Result<Self, EngineError> {
        Self::new(level, &EngineConfig::default())
    }

    /// Run one tick and return the resulting collection.
    ///
    /// `inputs` is the set of input codes active for this tick. The returned
    /// collection carries the collision tags found during the tick; they are
    /// dropped again when the next tick starts.
    ///
    /// Action failures never abort the tick. They are logged, collected in
    /// [`last_diagnostics`](Self::last_diagnostics), and the remaining actions
    /// still run.
    pub fn update_state(&mut self, inputs: &InputSet) -> &EntityCollection {
        let tick_start = Instant::now();
        let mut report = TickReport::default();
        self.entities.clear_transient();
        let mut system_times = Vec::with_capacity(self.pipeline.len());

        for stage in self.pipeline.values_mut() {
            let start = Instant::now();
            let name = match stage {
                Stage::Collision => {
                    let Some(collision) = self.collision.as_mut() else {
                        continue;
                    };
                    collision.update(&mut self.entities, inputs, &mut report);
                    collision.name()
                }
                Stage::System(system) => {
                    system.update(&mut self.entities, inputs, &mut report);
                    system.name()
                }
            };
            system_times.push((name.to_owned(), start.elapsed()));
        }

        let adjust_start = Instant::now();
        if let Some(collision) = self.collision.as_mut() {
            collision.adjust_collided_entities(&mut self.entities);
        }
        let adjust_time = adjust_start.elapsed();

        self.tick_counter += 1;
        if let Some(level) = report.level_request {
            self.level_request = Some(level);
        }

        debug!(
            tick = self.tick_counter,
            entities = self.entities.len(),
            failures = report.action_failures.len(),
            "tick complete"
        );

        self.last_diagnostics = TickDiagnostics {
            system_times,
            adjust_time,
            total_time: tick_start.elapsed(),
            action_failures: report.action_failures,
        };
        &self.entities
    }

    /// Run `count` ticks with the same inputs.
    ///
    /// Diagnostics and contacts afterwards describe the last of them only.
    pub fn run_ticks(&mut self, count: u64, inputs: &InputSet) {
        for _ in 0..count {
            self.update_state(inputs);
        }
    }

    // -- save / restore -----------------------------------------------------

    /// Transient-free snapshot of the current state for persistence.
    ///
    /// The snapshot is a deep copy: mutating it never touches the live
    /// collection. It carries the allocator state, so restoring it yields
    /// exactly the handles that were live, and a BLAKE3 hash that
    /// [`restore_snapshot`](Self::restore_snapshot) verifies. The engine does
    /// no I/O; writing the snapshot out is the caller's business.
    pub fn save_game(&self) -> GameSnapshot {
        self.save_game.save(&self.entities, &self.level_name, self.tick_counter)
    }

    /// Replace the live state with a saved one.
    ///
    /// The snapshot must verify and belong to this engine's level. Nothing is
    /// changed when it does not. On success the tick counter rewinds to the
    /// snapshot's tick, and contacts and any pending level request from
    /// before the restore are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SnapshotHashMismatch`] for a tampered snapshot,
    /// [`EngineError::InvalidConfig`] for a snapshot of another level, and
    /// [`EngineError::Ecs`] when its allocator state is corrupt.
    pub fn restore_snapshot(&mut self, saved: &GameSnapshot) -> Result<(), EngineError> {
        saved.verify()?;
        if saved.level != self.level_name {
            return Err(EngineError::InvalidConfig(format!(
                "snapshot belongs to level '{}', engine runs '{}'",
                saved.level, self.level_name
            )));
        }
        self.entities = EntityCollection::restore(&saved.world)?;
        self.tick_counter = saved.tick;
        self.level_request = None;
        if let Some(collision) = self.collision.as_mut() {
            collision.reset();
        }
        info!(level = %self.level_name, tick = saved.tick, entities = self.entities.len(), "snapshot restored");
        Ok(())
    }

    /// BLAKE3 digest of the live collection, transient tags included.
    ///
    /// Two engines fed the same level and inputs produce the same digest
    /// after every tick, which is what determinism checks compare.
    pub fn state_hash(&self) -> String {
        snapshot::state_hash(&self.entities)
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Add an entity to the live collection and return its handle.
    ///
    /// The entity takes part from the next system to run; called between
    /// ticks, that is the next tick's first system.
    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        self.entities.spawn(entity)
    }

    /// Remove an entity and hand it back.
    ///
    /// Stale handles are ignored with a warning and yield `None`. Collision
    /// sets still naming the removed entity are not rewritten; the handle
    /// simply no longer resolves.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let removed = self.entities.remove(id);
        if removed.is_none() {
            warn!(entity = %id, "remove of an entity that does not exist");
        }
        removed
    }

    // -- accessors ----------------------------------------------------------

    /// Read access to the live collection.
    ///
    /// Mutation goes through the engine ([`add_entity`](Self::add_entity),
    /// [`remove_entity`](Self::remove_entity) and the systems).
    pub fn entities(&self) -> &EntityCollection {
        &self.entities
    }

    /// Name of the level this engine was built from.
    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    /// Level width, as authored. Boundary clamps to `0..room_width`.
    pub fn room_width(&self) -> f64 {
        self.room_width
    }

    /// Level height, as authored. Boundary clamps to `0..room_height`.
    pub fn room_height(&self) -> f64 {
        self.room_height
    }

    /// Background asset reference, passed through for the renderer.
    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    /// Music asset reference, passed through for the audio layer.
    pub fn music(&self) -> Option<&str> {
        self.music.as_deref()
    }

    /// Ticks run since construction, or since the restored snapshot's tick.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Timings and action failures of the most recent tick.
    ///
    /// Empty before the first tick.
    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    /// Level most recently requested by a `ChangeLevel` action, if any.
    ///
    /// The engine never switches levels itself. The request stays pending,
    /// and a later request replaces it, until the runner takes it with
    /// [`take_level_request`](Self::take_level_request).
    pub fn requested_level(&self) -> Option<&str> {
        self.level_request.as_deref()
    }

    /// Hand the pending level request to the runner, clearing it.
    pub fn take_level_request(&mut self) -> Option<String> {
        self.level_request.take()
    }

    /// Contacts detected during the last tick.
    ///
    /// Empty when no collision system is configured, before the first tick,
    /// and right after a restore.
    pub fn collision_contacts(&self) -> &[Contact] {
        match &self.collision {
            Some(collision) => collision.contacts(),
            None => &[],
        }
    }

    /// Names of the systems that run each tick, in execution order.
    ///
    /// A configured `SaveGame` entry is not listed: saving happens only
    /// through [`save_game`](Self::save_game).
    pub fn system_names(&self) -> Vec<&'static str> {
        self.pipeline
            .values()
            .map(|stage| match stage {
                Stage::Collision => SystemKind::Collision.name(),
                Stage::System(system) => system.name(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemSpec;
    use ComponentKind::*;

    fn corridor() -> Level {
        Level::new("corridor", 100.0, 20.0)
            .with_entity(
                Entity::builder()
                    .rect(10.0, 0.0, 4.0, 4.0)
                    .velocity(2.0, 0.0)
                    .with(Collision, true)
                    .with(CameraFocus, true)
                    .build()
                    .unwrap(),
            )
            .with_entity(
                Entity::builder()
                    .rect(18.0, 0.0, 4.0, 4.0)
                    .with(Collision, true)
                    .build()
                    .unwrap(),
            )
    }

    #[test]
    fn default_pipeline_skips_save_game() {
        let level = corridor();
        let engine = Engine::from_level(level).unwrap();
        assert_eq!(engine.system_names(), vec!["Movement", "Collision", "EventHandler"]);
        assert_eq!(engine.room_width(), 100.0);
        assert_eq!(engine.room_height(), 20.0);
        assert_eq!(engine.entities().len(), 2);
    }

    #[test]
    fn ticks_advance_and_record_diagnostics() {
        let level = corridor();
        let mut engine = Engine::from_level(level).unwrap();
        engine.run_ticks(3, &InputSet::new());
        assert_eq!(engine.tick_count(), 3);
        let names: Vec<&str> = engine
            .last_diagnostics()
            .system_times
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, vec!["Movement", "Collision", "EventHandler"]);
        assert!(engine.last_diagnostics().action_failures.is_empty());
    }

    #[test]
    fn priorities_order_execution_not_declaration() {
        let level = corridor();
        let config = EngineConfig {
            pipeline: vec![
                SystemSpec::new(5, "Collision"),
                SystemSpec::new(1, "Movement"),
            ],
            ..Default::default()
        };
        let engine = Engine::new(level, &config).unwrap();
        assert_eq!(engine.system_names(), vec!["Movement", "Collision"]);
    }

    #[test]
    fn construction_errors() {
        let dup = EngineConfig::default().with_system(1, "Boundary");
        assert!(matches!(
            Engine::new(corridor(), &dup),
            Err(EngineError::DuplicatePriority { priority: 1, .. })
        ));

        let unknown = EngineConfig::default().with_system(7, "Gravity");
        assert!(matches!(
            Engine::new(corridor(), &unknown),
            Err(EngineError::UnknownSystem { .. })
        ));

        let two_collisions = EngineConfig::default().with_system(7, "Collision");
        assert!(matches!(
            Engine::new(corridor(), &two_collisions),
            Err(EngineError::InvalidConfig(_))
        ));

        let mut bad_requires = EngineConfig::default();
        bad_requires.pipeline[0].requires.push("Mass".to_owned());
        assert!(matches!(
            Engine::new(corridor(), &bad_requires),
            Err(EngineError::Ecs(EcsError::UnknownComponent { .. }))
        ));

        let mut save_requires = EngineConfig::default();
        save_requires.pipeline[3].requires.push("Score".to_owned());
        assert!(matches!(
            Engine::new(corridor(), &save_requires),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn restore_forgets_contacts_from_before() {
        let mut engine = Engine::from_level(corridor()).unwrap();
        let saved = engine.save_game();
        engine.run_ticks(3, &InputSet::new());
        assert_eq!(engine.collision_contacts().len(), 1);

        engine.restore_snapshot(&saved).unwrap();
        assert_eq!(engine.tick_count(), 0);
        assert!(engine.collision_contacts().is_empty());
    }

    #[test]
    fn add_and_remove_entities() {
        let level = corridor();
        let mut engine = Engine::from_level(level).unwrap();
        let id = engine.add_entity(Entity::builder().with(Name, "late").build().unwrap());
        assert_eq!(engine.entities().len(), 3);
        assert!(engine.remove_entity(id).is_some());
        assert!(engine.remove_entity(id).is_none());
        assert_eq!(engine.entities().len(), 2);
    }

    #[test]
    fn restore_rejects_other_levels_and_rewinds() {
        let level = corridor();
        let mut engine = Engine::from_level(level).unwrap();
        engine.run_ticks(1, &InputSet::new());
        let saved = engine.save_game();
        let hash_at_save = engine.state_hash();
        engine.run_ticks(5, &InputSet::new());

        let foreign = GameSnapshot::new("elsewhere", saved.tick, saved.world.clone());
        assert!(matches!(
            engine.restore_snapshot(&foreign),
            Err(EngineError::InvalidConfig(_))
        ));
        assert_eq!(engine.tick_count(), 6);

        engine.restore_snapshot(&saved).unwrap();
        assert_eq!(engine.tick_count(), 1);
        // No tags existed at tick 1, so the stripped save is the full state.
        assert_eq!(engine.state_hash(), hash_at_save);
    }
}
