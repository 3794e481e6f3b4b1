//! Engine configuration: the system pipeline and collision tuning.
//!
//! ```
//! use tessera_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{
//!     "pipeline": [
//!         { "priority": 0, "system": "Movement" },
//!         { "priority": 1, "system": "Collision", "requires": ["Group"] },
//!         { "priority": 2, "system": "EventHandler" }
//!     ]
//! }"#).unwrap();
//! assert_eq!(config.pipeline.len(), 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::systems::collision::Axis;

/// One pipeline slot: which system runs at which priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSpec {
    /// Lower priorities run first. Must be unique across the pipeline.
    pub priority: u32,
    /// System name, resolved by [`SystemKind::from_name`](crate::systems::SystemKind::from_name).
    pub system: String,
    /// Extra component kinds (by name) an entity needs for this system to
    /// touch it, on top of the system's own requirements.
    #[serde(default)]
    pub requires: Vec<String>,
}

impl SystemSpec {
    /// A pipeline entry with no extra requirements.
    pub fn new(priority: u32, system: &str) -> Self {
        Self {
            priority,
            system: system.to_owned(),
            requires: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Axis that wins when both overlaps are equal.
    pub tie_axis: Axis,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            tie_axis: Axis::Horizontal,
        }
    }
}

/// Everything the [`Engine`](crate::engine::Engine) needs besides the level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pipeline: Vec<SystemSpec>,
    pub collision: CollisionConfig,
}

impl Default for EngineConfig {
    /// Movement, then collision, then events; save-game on demand only.
    fn default() -> Self {
        Self {
            pipeline: vec![
                SystemSpec::new(0, "Movement"),
                SystemSpec::new(1, "Collision"),
                SystemSpec::new(2, "EventHandler"),
                SystemSpec::new(100, "SaveGame"),
            ],
            collision: CollisionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    ///
    /// System names and requirements are only resolved when an
    /// [`Engine`](crate::engine::Engine) is built from the config.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Json`] for malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Append a system, builder style.
    pub fn with_system(mut self, priority: u32, system: &str) -> Self {
        self.pipeline.push(SystemSpec::new(priority, system));
        self
    }
}
