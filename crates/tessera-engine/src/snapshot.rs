//! Save snapshots with BLAKE3 hashing.
//!
//! A [`GameSnapshot`] is what the save path hands to persistence: the level
//! name, the tick it was taken at, and a transient-free copy of the entity
//! collection, sealed with a BLAKE3 digest of its canonical JSON form.
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! let level = Level::new("demo", 100.0, 100.0)
//!     .with_entity(Entity::builder().rect(0.0, 0.0, 2.0, 2.0).velocity(1.0, 0.0).build().unwrap());
//! let mut engine = Engine::from_level(level).unwrap();
//! engine.update_state(&InputSet::new());
//!
//! let saved = engine.save_game();
//! assert_eq!(saved.tick, 1);
//! assert_eq!(saved.hash.len(), 64);
//! assert!(saved.verify().is_ok());
//!
//! let json = saved.to_json().unwrap();
//! assert_eq!(GameSnapshot::from_json(&json).unwrap(), saved);
//! ```

use serde::{Deserialize, Serialize};
use tessera_ecs::prelude::*;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub level: String,
    pub tick: u64,
    pub world: CollectionSnapshot,
    /// BLAKE3 hex digest (64 lowercase hex chars) of level, tick and world.
    pub hash: String,
}

impl GameSnapshot {
    /// Seal a captured collection, computing its hash.
    ///
    /// The hash covers the level name and tick as well as the world, so
    /// editing any of them afterwards makes [`verify`](Self::verify) fail.
    pub fn new(level: &str, tick: u64, world: CollectionSnapshot) -> Self {
        let hash = compute_hash(level, tick, &world);
        Self {
            level: level.to_owned(),
            tick,
            world,
            hash,
        }
    }

    /// Recompute the digest and compare it with the recorded one.
    pub fn verify(&self) -> Result<(), EngineError> {
        let recomputed = compute_hash(&self.level, self.tick, &self.world);
        if recomputed != self.hash {
            return Err(EngineError::SnapshotHashMismatch {
                recorded: self.hash.clone(),
                recomputed,
            });
        }
        Ok(())
    }

    /// Serialize for the persistence layer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and verify a snapshot.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.verify()?;
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Hashing helpers
// ---------------------------------------------------------------------------

fn compute_hash(level: &str, tick: u64, world: &CollectionSnapshot) -> String {
    #[derive(Serialize)]
    struct HashableState<'a> {
        level: &'a str,
        tick: u64,
        world: &'a CollectionSnapshot,
    }

    hash_json(&HashableState { level, tick, world })
}

/// BLAKE3 hex digest of the full live collection, transient tags included.
///
/// Two collections hash equal exactly when their canonical JSON forms are
/// byte-equal, which is what determinism checks compare.
pub fn state_hash(entities: &EntityCollection) -> String {
    hash_json(&entities.capture_snapshot())
}

fn hash_json<T: Serialize>(value: &T) -> String {
    let json_bytes = serde_json::to_vec(value).expect("entity state should always be JSON-serializable");
    blake3::hash(&json_bytes).to_hex().to_string()
}
