//! Engine error types.
//!
//! [`EngineError`] covers configuration problems: a malformed pipeline or
//! level can never run, so these surface from construction and loading.
//! [`ActionError`] covers a single action misfiring against a single entity;
//! those are recorded and logged during the tick, never propagated.

use tessera_ecs::prelude::*;

/// Fatal configuration and level-loading errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown system '{name}'. Known systems: [{known}]")]
    UnknownSystem { name: String, known: String },

    #[error("unknown condition kind '{name}'. Known conditions: [{known}]")]
    UnknownCondition { name: String, known: String },

    #[error("unknown action kind '{name}'. Known actions: [{known}]")]
    UnknownAction { name: String, known: String },

    /// A condition or action spec whose parameters do not fit its kind.
    #[error("invalid '{kind}' rule: {details}")]
    InvalidRule { kind: String, details: String },

    #[error("systems '{first}' and '{second}' both declare priority {priority}")]
    DuplicatePriority {
        priority: u32,
        first: String,
        second: String,
    },

    #[error("event '{event}' spawns unknown template '{template}'")]
    UnknownTemplate { event: String, template: String },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("snapshot hash mismatch: recorded {recorded} but recomputed {recomputed}")]
    SnapshotHashMismatch { recorded: String, recomputed: String },

    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why one action could not be applied to one entity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("component {kind} holds {found} values, action needs {expected}")]
    TypeMismatch {
        kind: ComponentKind,
        expected: ValueType,
        found: ValueType,
    },

    #[error("component {kind} is managed by the engine and cannot be changed by actions")]
    TransientComponent { kind: ComponentKind },

    #[error("component {kind} is missing")]
    MissingComponent { kind: ComponentKind },

    #[error("unknown template '{template}'")]
    UnknownTemplate { template: String },

    #[error(transparent)]
    Ecs(#[from] EcsError),
}
