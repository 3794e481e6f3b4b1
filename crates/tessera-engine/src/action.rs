//! Actions: mutations of one entity, or requests for engine-level effects.
//!
//! Component actions change the acting entity in place. Structural actions
//! (removing the entity, spawning a template, changing level) cannot be
//! carried out by the entity alone; they come back as an [`ActionOutcome`]
//! that the event handler applies once the event's action list is done.

use std::collections::BTreeMap;

use serde::Deserialize;
use tessera_ecs::prelude::*;

use crate::error::{ActionError, EngineError};
use crate::event::RuleSpec;

/// What the event handler must do after an action ran.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Applied,
    RemoveEntity,
    Spawn(Entity),
    ChangeLevel(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Overwrite with an absolute value.
    Set {
        kind: ComponentKind,
        value: ComponentValue,
    },
    /// Apply a signed numeric delta.
    Add { kind: ComponentKind, delta: f64 },
    /// Multiply a numeric component, e.g. `-1` to bounce.
    Scale { kind: ComponentKind, factor: f64 },
    Toggle { kind: ComponentKind },
    RemoveComponent { kind: ComponentKind },
    RemoveEntity,
    /// Duplicate a level template, offset from the acting entity's position.
    Spawn { template: String, dx: f64, dy: f64 },
    ChangeLevel { level: String },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SetParams {
    component: String,
    value: ComponentValue,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AddParams {
    component: String,
    delta: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ScaleParams {
    component: String,
    factor: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ComponentParams {
    component: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SpawnParams {
    template: String,
    #[serde(default)]
    dx: f64,
    #[serde(default)]
    dy: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ChangeLevelParams {
    level: String,
}

impl Action {
    pub const KINDS: [&'static str; 8] = [
        "Set",
        "Add",
        "Scale",
        "Toggle",
        "RemoveComponent",
        "RemoveEntity",
        "Spawn",
        "ChangeLevel",
    ];

    /// Resolve an authored spec into an action.
    ///
    /// Only the shape of the rule is checked here. Whether the action fits
    /// the entity it eventually runs against is decided per entity at tick
    /// time, in [`apply`](Self::apply).
    pub fn from_spec(spec: &RuleSpec) -> Result<Self, EngineError> {
        let action = match spec.kind.as_str() {
            "Set" => {
                let p: SetParams = spec.parse_params()?;
                Action::Set {
                    kind: ComponentKind::from_name(&p.component)?,
                    value: p.value,
                }
            }
            "Add" => {
                let p: AddParams = spec.parse_params()?;
                Action::Add {
                    kind: ComponentKind::from_name(&p.component)?,
                    delta: p.delta,
                }
            }
            "Scale" => {
                let p: ScaleParams = spec.parse_params()?;
                Action::Scale {
                    kind: ComponentKind::from_name(&p.component)?,
                    factor: p.factor,
                }
            }
            "Toggle" => {
                let p: ComponentParams = spec.parse_params()?;
                Action::Toggle {
                    kind: ComponentKind::from_name(&p.component)?,
                }
            }
            "RemoveComponent" => {
                let p: ComponentParams = spec.parse_params()?;
                Action::RemoveComponent {
                    kind: ComponentKind::from_name(&p.component)?,
                }
            }
            "RemoveEntity" => {
                let _: NoParams = spec.parse_params()?;
                Action::RemoveEntity
            }
            "Spawn" => {
                let p: SpawnParams = spec.parse_params()?;
                Action::Spawn {
                    template: p.template,
                    dx: p.dx,
                    dy: p.dy,
                }
            }
            "ChangeLevel" => {
                let p: ChangeLevelParams = spec.parse_params()?;
                Action::ChangeLevel { level: p.level }
            }
            other => {
                return Err(EngineError::UnknownAction {
                    name: other.to_owned(),
                    known: Self::KINDS.join(", "),
                })
            }
        };
        Ok(action)
    }

    /// The authored `kind` name of this action, as used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Action::Set { .. } => "Set",
            Action::Add { .. } => "Add",
            Action::Scale { .. } => "Scale",
            Action::Toggle { .. } => "Toggle",
            Action::RemoveComponent { .. } => "RemoveComponent",
            Action::RemoveEntity => "RemoveEntity",
            Action::Spawn { .. } => "Spawn",
            Action::ChangeLevel { .. } => "ChangeLevel",
        }
    }

    /// Apply the action to `entity`.
    ///
    /// On error the entity is left exactly as it was.
    pub fn apply(
        &self,
        entity: &mut Entity,
        templates: &BTreeMap<String, Entity>,
    ) -> Result<ActionOutcome, ActionError> {
        match self {
            Action::Set { kind, value } => {
                writable(*kind, value.value_type())?;
                entity.set(*kind, value.clone())?;
            }
            Action::Add { kind, delta } => {
                writable(*kind, ValueType::Number)?;
                // A missing component counts as its default; nothing is
                // stored unless the sum itself is storable.
                let current = entity
                    .number(*kind)
                    .or_else(|| kind.default_value().as_number())
                    .ok_or(ActionError::MissingComponent { kind: *kind })?;
                entity.set(*kind, current + delta)?;
            }
            Action::Scale { kind, factor } => {
                writable(*kind, ValueType::Number)?;
                let current = entity
                    .number(*kind)
                    .ok_or(ActionError::MissingComponent { kind: *kind })?;
                entity.set(*kind, current * factor)?;
            }
            Action::Toggle { kind } => {
                writable(*kind, ValueType::Flag)?;
                entity.equip_default(*kind);
                let current = entity
                    .flag(*kind)
                    .ok_or(ActionError::MissingComponent { kind: *kind })?;
                entity.set(*kind, !current)?;
            }
            Action::RemoveComponent { kind } => {
                if kind.is_transient() {
                    return Err(ActionError::TransientComponent { kind: *kind });
                }
                entity.remove(&[*kind]);
            }
            Action::RemoveEntity => return Ok(ActionOutcome::RemoveEntity),
            Action::Spawn { template, dx, dy } => {
                let source = templates
                    .get(template)
                    .ok_or_else(|| ActionError::UnknownTemplate {
                        template: template.clone(),
                    })?;
                let mut spawned = source.duplicate();
                if let Some(x) = entity.number(ComponentKind::XPosition) {
                    spawned.set(ComponentKind::XPosition, x + dx)?;
                }
                if let Some(y) = entity.number(ComponentKind::YPosition) {
                    spawned.set(ComponentKind::YPosition, y + dy)?;
                }
                return Ok(ActionOutcome::Spawn(spawned));
            }
            Action::ChangeLevel { level } => return Ok(ActionOutcome::ChangeLevel(level.clone())),
        }
        Ok(ActionOutcome::Applied)
    }
}

/// Actions may only write non-transient kinds of the type they produce.
fn writable(kind: ComponentKind, produces: ValueType) -> Result<(), ActionError> {
    if kind.is_transient() {
        return Err(ActionError::TransientComponent { kind });
    }
    if kind.value_type() != produces {
        return Err(ActionError::TypeMismatch {
            kind,
            expected: produces,
            found: kind.value_type(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ComponentKind::*;

    fn spec(value: serde_json::Value) -> RuleSpec {
        serde_json::from_value(value).unwrap()
    }

    fn no_templates() -> BTreeMap<String, Entity> {
        BTreeMap::new()
    }

    #[test]
    fn add_applies_signed_delta() {
        let action = Action::from_spec(&spec(json!({"kind": "Add", "component": "Lives", "delta": -1}))).unwrap();
        let mut enemy = Entity::builder().with(Lives, 3.0).build().unwrap();
        assert_eq!(action.apply(&mut enemy, &no_templates()), Ok(ActionOutcome::Applied));
        assert_eq!(enemy.number(Lives), Some(2.0));
    }

    #[test]
    fn add_equips_missing_component() {
        let action = Action::Add {
            kind: Score,
            delta: 10.0,
        };
        let mut e = Entity::new();
        action.apply(&mut e, &no_templates()).unwrap();
        assert_eq!(e.number(Score), Some(10.0));
    }

    #[test]
    fn scale_needs_existing_component() {
        let bounce = Action::Scale {
            kind: XVelocity,
            factor: -1.0,
        };
        let mut still = Entity::new();
        assert_eq!(
            bounce.apply(&mut still, &no_templates()),
            Err(ActionError::MissingComponent { kind: XVelocity })
        );
        assert!(still.is_empty());

        let mut ball = Entity::builder().velocity(2.0, 1.0).build().unwrap();
        bounce.apply(&mut ball, &no_templates()).unwrap();
        assert_eq!(ball.number(XVelocity), Some(-2.0));
    }

    #[test]
    fn type_mismatch_leaves_entity_untouched() {
        let mut e = Entity::builder().with(Name, "hero").build().unwrap();
        let before = e.clone();
        let add = Action::Add {
            kind: Name,
            delta: 1.0,
        };
        assert!(matches!(
            add.apply(&mut e, &no_templates()),
            Err(ActionError::TypeMismatch { kind: Name, .. })
        ));
        let set = Action::from_spec(&spec(json!({"kind": "Set", "component": "Score", "value": "lots"}))).unwrap();
        assert!(set.apply(&mut e, &no_templates()).is_err());
        assert_eq!(e, before);
    }

    #[test]
    fn overflowing_results_are_refused() {
        let mut e = Entity::builder().with(Score, 1e308).with(XVelocity, 1e308).build().unwrap();
        let before = e.clone();

        let add = Action::Add {
            kind: Score,
            delta: 1e308,
        };
        assert_eq!(
            add.apply(&mut e, &no_templates()),
            Err(ActionError::Ecs(EcsError::NonFiniteNumber {
                kind: Score,
                value: f64::INFINITY
            }))
        );
        let scale = Action::Scale {
            kind: XVelocity,
            factor: 10.0,
        };
        assert!(matches!(
            scale.apply(&mut e, &no_templates()),
            Err(ActionError::Ecs(EcsError::NonFiniteNumber { kind: XVelocity, .. }))
        ));
        let set = Action::Set {
            kind: Score,
            value: ComponentValue::Number(f64::NAN),
        };
        assert!(set.apply(&mut e, &no_templates()).is_err());
        assert_eq!(e, before);

        // A refused add does not leave a default behind either.
        let mut blank = Entity::new();
        let huge = Action::Add {
            kind: Lives,
            delta: f64::INFINITY,
        };
        assert!(huge.apply(&mut blank, &no_templates()).is_err());
        assert!(!blank.has_kind(Lives));
    }

    #[test]
    fn transient_components_are_off_limits() {
        let mut e = Entity::new();
        let set = Action::Set {
            kind: AnyCollided,
            value: ComponentValue::Entities(Default::default()),
        };
        assert_eq!(
            set.apply(&mut e, &no_templates()),
            Err(ActionError::TransientComponent { kind: AnyCollided })
        );
    }

    #[test]
    fn toggle_flips_and_equips() {
        let toggle = Action::Toggle { kind: Visible };
        let mut e = Entity::new();
        toggle.apply(&mut e, &no_templates()).unwrap();
        // Visible defaults to true, so the first toggle hides.
        assert_eq!(e.flag(Visible), Some(false));
        toggle.apply(&mut e, &no_templates()).unwrap();
        assert_eq!(e.flag(Visible), Some(true));
    }

    #[test]
    fn spawn_duplicates_template_at_offset() {
        let mut templates = BTreeMap::new();
        templates.insert(
            "bullet".to_owned(),
            Entity::builder().rect(0.0, 0.0, 2.0, 2.0).build().unwrap(),
        );
        let action = Action::from_spec(&spec(json!({"kind": "Spawn", "template": "bullet", "dx": 5}))).unwrap();
        let mut shooter = Entity::builder().rect(10.0, 20.0, 4.0, 4.0).build().unwrap();

        let ActionOutcome::Spawn(bullet) = action.apply(&mut shooter, &templates).unwrap() else {
            panic!("expected a spawn");
        };
        assert_eq!(bullet.number(XPosition), Some(15.0));
        assert_eq!(bullet.number(YPosition), Some(20.0));
        assert_eq!(bullet.number(Width), Some(2.0 + DUPLICATE_WIDTH_INCREMENT));

        let missing = Action::Spawn {
            template: "rocket".into(),
            dx: 0.0,
            dy: 0.0,
        };
        assert!(matches!(
            missing.apply(&mut shooter, &templates),
            Err(ActionError::UnknownTemplate { .. })
        ));
    }

    #[test]
    fn structural_actions_report_outcomes() {
        let mut e = Entity::new();
        assert_eq!(
            Action::RemoveEntity.apply(&mut e, &no_templates()),
            Ok(ActionOutcome::RemoveEntity)
        );
        let change = Action::from_spec(&spec(json!({"kind": "ChangeLevel", "level": "castle"}))).unwrap();
        assert_eq!(
            change.apply(&mut e, &no_templates()),
            Ok(ActionOutcome::ChangeLevel("castle".into()))
        );
    }

    #[test]
    fn unknown_action_kind() {
        assert!(matches!(
            Action::from_spec(&spec(json!({"kind": "Explode"}))),
            Err(EngineError::UnknownAction { .. })
        ));
        assert!(matches!(
            Action::from_spec(&spec(json!({"kind": "RemoveEntity", "now": true}))),
            Err(EngineError::InvalidRule { .. })
        ));
    }
}
