//! Conditions: pure predicates over one entity and the active inputs.
//!
//! Conditions are authored as `{ "kind": "<Name>", ...params }` specs and
//! resolved once, at level load, by [`Condition::from_spec`]. Evaluation never
//! changes state; the only mutation allowed is [`Condition::equip`], which
//! gives the entity a default-valued component the predicate reads, so a
//! missing optional component never fails a rule by itself.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tessera_ecs::prelude::*;

use crate::error::EngineError;
use crate::event::RuleSpec;
use crate::input::InputSet;

// ---------------------------------------------------------------------------
// CompareOp / CollisionSide
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl CompareOp {
    /// Apply the comparison as `lhs <op> rhs`.
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Less => lhs < rhs,
            CompareOp::LessOrEqual => lhs <= rhs,
            CompareOp::Greater => lhs > rhs,
            CompareOp::GreaterOrEqual => lhs >= rhs,
            CompareOp::Equal => lhs == rhs,
            CompareOp::NotEqual => lhs != rhs,
        }
    }
}

/// Which collision set a [`Condition::Collided`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionSide {
    Left,
    Right,
    Top,
    Bottom,
    Any,
}

impl CollisionSide {
    /// The collided component kind this side reads.
    pub fn kind(self) -> ComponentKind {
        match self {
            CollisionSide::Left => ComponentKind::LeftCollided,
            CollisionSide::Right => ComponentKind::RightCollided,
            CollisionSide::Top => ComponentKind::TopCollided,
            CollisionSide::Bottom => ComponentKind::BottomCollided,
            CollisionSide::Any => ComponentKind::AnyCollided,
        }
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Read-only state a condition may consult besides its own entity.
pub struct ConditionContext<'a> {
    pub entities: &'a EntityCollection,
    pub inputs: &'a InputSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Numeric comparison against a constant, e.g. `Score > 100`.
    Compare {
        kind: ComponentKind,
        op: CompareOp,
        value: f64,
    },
    Equals {
        kind: ComponentKind,
        value: ComponentValue,
    },
    Flag {
        kind: ComponentKind,
        expected: bool,
    },
    /// The entity is currently colliding on `side`, optionally with at least
    /// one live entity of `group`.
    Collided {
        side: CollisionSide,
        group: Option<String>,
    },
    /// Every listed key is in the active input set.
    Input { keys: BTreeSet<String> },
    Not(Box<Condition>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CompareParams {
    component: String,
    op: CompareOp,
    value: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EqualsParams {
    component: String,
    value: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FlagParams {
    component: String,
    #[serde(default = "flag_default")]
    expected: bool,
}

fn flag_default() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CollidedParams {
    side: CollisionSide,
    #[serde(default)]
    group: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct InputParams {
    keys: BTreeSet<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NotParams {
    condition: RuleSpec,
}

impl Condition {
    pub const KINDS: [&'static str; 6] = ["Compare", "Equals", "Flag", "Collided", "Input", "Not"];

    /// Resolve an authored spec into a condition.
    pub fn from_spec(spec: &RuleSpec) -> Result<Self, EngineError> {
        match spec.kind.as_str() {
            "Compare" => {
                let p: CompareParams = spec.parse_params()?;
                let kind = value_kind(spec, &p.component, ValueType::Number)?;
                Ok(Condition::Compare {
                    kind,
                    op: p.op,
                    value: p.value,
                })
            }
            "Equals" => {
                let p: EqualsParams = spec.parse_params()?;
                let kind = ComponentKind::from_name(&p.component)?;
                reject_transient(spec, kind)?;
                let value = ComponentValue::from_json(kind, &p.value)?;
                Ok(Condition::Equals { kind, value })
            }
            "Flag" => {
                let p: FlagParams = spec.parse_params()?;
                let kind = value_kind(spec, &p.component, ValueType::Flag)?;
                Ok(Condition::Flag {
                    kind,
                    expected: p.expected,
                })
            }
            "Collided" => {
                let p: CollidedParams = spec.parse_params()?;
                Ok(Condition::Collided {
                    side: p.side,
                    group: p.group,
                })
            }
            "Input" => {
                let p: InputParams = spec.parse_params()?;
                Ok(Condition::Input { keys: p.keys })
            }
            "Not" => {
                let p: NotParams = spec.parse_params()?;
                Ok(Condition::Not(Box::new(Condition::from_spec(&p.condition)?)))
            }
            other => Err(EngineError::UnknownCondition {
                name: other.to_owned(),
                known: Self::KINDS.join(", "),
            }),
        }
    }

    /// Equip the component this condition reads, if it is missing.
    pub fn equip(&self, entity: &mut Entity) {
        match self {
            Condition::Compare { kind, .. }
            | Condition::Equals { kind, .. }
            | Condition::Flag { kind, .. } => {
                entity.equip_default(*kind);
            }
            Condition::Not(inner) => inner.equip(entity),
            Condition::Collided { .. } | Condition::Input { .. } => {}
        }
    }

    /// Evaluate against `entity` without mutating it.
    ///
    /// Call [`equip`](Self::equip) first so a missing optional component
    /// reads as its default instead of failing the condition. Collision sets
    /// are resolved through `ctx.entities`; handles that no longer resolve
    /// are ignored.
    pub fn evaluate(&self, entity: &Entity, ctx: &ConditionContext<'_>) -> bool {
        match self {
            Condition::Compare { kind, op, value } => entity
                .number(*kind)
                .is_some_and(|current| op.holds(current, *value)),
            Condition::Equals { kind, value } => entity.get(*kind) == Some(value),
            Condition::Flag { kind, expected } => entity.flag(*kind) == Some(*expected),
            Condition::Collided { side, group } => {
                let Some(others) = entity.entities(side.kind()) else {
                    return false;
                };
                others.iter().any(|other| match ctx.entities.get(*other) {
                    None => false,
                    Some(collider) => match group {
                        None => true,
                        Some(group) => collider.text(ComponentKind::Group) == Some(group.as_str()),
                    },
                })
            }
            Condition::Input { keys } => ctx.inputs.is_superset_of(keys),
            Condition::Not(inner) => !inner.evaluate(entity, ctx),
        }
    }
}

fn value_kind(spec: &RuleSpec, name: &str, expected: ValueType) -> Result<ComponentKind, EngineError> {
    let kind = ComponentKind::from_name(name)?;
    reject_transient(spec, kind)?;
    if kind.value_type() != expected {
        return Err(EngineError::InvalidRule {
            kind: spec.kind.clone(),
            details: format!("{kind} holds {} values, not {expected}", kind.value_type()),
        });
    }
    Ok(kind)
}

fn reject_transient(spec: &RuleSpec, kind: ComponentKind) -> Result<(), EngineError> {
    if kind.is_transient() {
        return Err(EngineError::InvalidRule {
            kind: spec.kind.clone(),
            details: format!("{kind} is engine-managed; use a Collided condition"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
