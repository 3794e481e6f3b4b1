//! Levels: the static scene an [`Engine`](crate::engine::Engine) starts from.
//!
//! A level is produced by authoring tools as JSON ([`LevelDescription`]) and
//! resolved into typed entities and events ([`Level`]). Every kind name,
//! condition and action is checked at this point, so a level that loads
//! never fails at tick time for structural reasons.
//!
//! ```
//! use tessera_engine::level::Level;
//!
//! let level = Level::from_json_str(r#"{
//!     "name": "intro",
//!     "width": 320,
//!     "height": 240,
//!     "entities": [
//!         {"Name": "hero", "Group": "Player", "XPosition": 10, "YPosition": 0, "CameraFocus": true}
//!     ]
//! }"#).unwrap();
//! assert_eq!(level.entities.len(), 1);
//! assert!(level.check_camera_contract());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_ecs::prelude::*;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::event::{Event, EventSpec};

/// Authored component map: kind name to JSON value.
pub type ComponentMap = BTreeMap<String, serde_json::Value>;

/// Authored, unresolved form of a [`Level`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescription {
    pub name: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub music: Option<String>,
    #[serde(default)]
    pub entities: Vec<ComponentMap>,
    #[serde(default)]
    pub templates: BTreeMap<String, ComponentMap>,
    #[serde(default)]
    pub events: Vec<EventSpec>,
}

/// A resolved level: entities, spawnable templates, events and geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub background: Option<String>,
    pub music: Option<String>,
    pub entities: Vec<Entity>,
    pub templates: BTreeMap<String, Entity>,
    pub events: Vec<Event>,
}

impl Level {
    /// An empty level of the given size.
    pub fn new(name: &str, width: f64, height: f64) -> Self {
        Self {
            name: name.to_owned(),
            width,
            height,
            background: None,
            music: None,
            entities: Vec::new(),
            templates: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// Add an entity, loaded into the engine in insertion order.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Register a template that `Spawn` actions can duplicate by name.
    pub fn with_template(mut self, name: &str, template: Entity) -> Self {
        self.templates.insert(name.to_owned(), template);
        self
    }

    /// Add an event. Events are evaluated in insertion order.
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Parse and translate an authored JSON level.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Json`] for malformed JSON and the errors of
    /// [`from_description`](Self::from_description) otherwise.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let description: LevelDescription = serde_json::from_str(json)?;
        Self::from_description(&description)
    }

    /// Resolve every entity, template and event of `description`.
    pub fn from_description(description: &LevelDescription) -> Result<Self, EngineError> {
        let entities = description
            .entities
            .iter()
            .map(|components| Entity::from_json_components(components))
            .collect::<Result<Vec<_>, _>>()?;
        let templates = description
            .templates
            .iter()
            .map(|(name, components)| Ok((name.clone(), Entity::from_json_components(components)?)))
            .collect::<Result<BTreeMap<_, _>, EngineError>>()?;
        let events = description
            .events
            .iter()
            .map(Event::from_spec)
            .collect::<Result<Vec<_>, _>>()?;

        let level = Self {
            name: description.name.clone(),
            width: description.width,
            height: description.height,
            background: description.background.clone(),
            music: description.music.clone(),
            entities,
            templates,
            events,
        };
        level.validate_templates()?;

        info!(
            level = %level.name,
            entities = level.entities.len(),
            templates = level.templates.len(),
            events = level.events.len(),
            "level loaded"
        );
        Ok(level)
    }

    /// Every `Spawn` action must name a template of this level.
    pub fn validate_templates(&self) -> Result<(), EngineError> {
        for event in &self.events {
            for template in event.spawned_templates() {
                if !self.templates.contains_key(template) {
                    return Err(EngineError::UnknownTemplate {
                        event: event.name.clone(),
                        template: template.to_owned(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of entities flagged as camera focus.
    pub fn camera_focus_count(&self) -> usize {
        self.entities
            .iter()
            .filter(|e| e.flag(ComponentKind::CameraFocus) == Some(true))
            .count()
    }

    /// Authoring guarantees exactly one camera-focused entity per level. The
    /// core only reports a violation; it does not depend on the contract.
    pub fn check_camera_contract(&self) -> bool {
        let count = self.camera_focus_count();
        if count != 1 {
            warn!(level = %self.name, count, "level should have exactly one camera-focus entity");
        }
        count == 1
    }
}
