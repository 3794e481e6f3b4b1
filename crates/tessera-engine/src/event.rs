//! Events: authored rules of the form *filter + conditions + actions*.
//!
//! An [`Event`] applies to every entity whose `Group` equals the event's
//! `entity_type`. For each such entity the conditions are checked in order,
//! stopping at the first failure; only when all hold do the actions run, in
//! declared order.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::condition::Condition;
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// RuleSpec
// ---------------------------------------------------------------------------

/// Authored form of a condition or action: a kind name plus free-form
/// parameters, e.g. `{"kind": "Compare", "component": "Score", "op": ">", "value": 100}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub kind: String,
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl RuleSpec {
    /// A rule of the given `kind` with no parameters yet.
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            params: serde_json::Map::new(),
        }
    }

    /// Add a parameter, builder style.
    pub fn param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_owned(), value.into());
        self
    }

    pub(crate) fn parse_params<T: DeserializeOwned>(&self) -> Result<T, EngineError> {
        serde_json::from_value(serde_json::Value::Object(self.params.clone())).map_err(|e| {
            EngineError::InvalidRule {
                kind: self.kind.clone(),
                details: e.to_string(),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Authored form of an [`Event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSpec {
    pub name: String,
    pub entity_type: String,
    #[serde(default)]
    pub conditions: Vec<RuleSpec>,
    #[serde(default)]
    pub actions: Vec<RuleSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    /// Matched against each entity's `Group`.
    pub entity_type: String,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
}

impl Event {
    /// An event applying to entities whose `Group` is `entity_type`.
    ///
    /// With no conditions it fires for every matching entity every tick.
    pub fn new(name: &str, entity_type: &str) -> Self {
        Self {
            name: name.to_owned(),
            entity_type: entity_type.to_owned(),
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Append a condition. Conditions are checked in the order added.
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Append an action. Actions run in the order added.
    pub fn then(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Build an event from its authored form.
    ///
    /// # Errors
    ///
    /// Fails on the first condition or action that names an unknown kind or
    /// carries malformed parameters.
    pub fn from_spec(spec: &EventSpec) -> Result<Self, EngineError> {
        let conditions = spec
            .conditions
            .iter()
            .map(Condition::from_spec)
            .collect::<Result<Vec<_>, _>>()?;
        let actions = spec
            .actions
            .iter()
            .map(Action::from_spec)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: spec.name.clone(),
            entity_type: spec.entity_type.clone(),
            conditions,
            actions,
        })
    }

    /// Templates this event may spawn.
    pub fn spawned_templates(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().filter_map(|action| match action {
            Action::Spawn { template, .. } => Some(template.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::CompareOp;
    use tessera_ecs::prelude::*;

    #[test]
    fn event_spec_resolves_rules_in_order() {
        let spec: EventSpec = serde_json::from_str(
            r#"{
                "name": "enemy_hurt",
                "entity_type": "Enemy",
                "conditions": [{"kind": "Compare", "component": "Score", "op": ">", "value": 100}],
                "actions": [
                    {"kind": "Add", "component": "Lives", "delta": -1},
                    {"kind": "Spawn", "template": "spark"}
                ]
            }"#,
        )
        .unwrap();
        let event = Event::from_spec(&spec).unwrap();
        assert_eq!(event.entity_type, "Enemy");
        assert_eq!(
            event.conditions,
            vec![Condition::Compare {
                kind: ComponentKind::Score,
                op: CompareOp::Greater,
                value: 100.0
            }]
        );
        assert_eq!(event.actions.len(), 2);
        assert_eq!(event.spawned_templates().collect::<Vec<_>>(), vec!["spark"]);
    }

    #[test]
    fn one_bad_rule_fails_the_event() {
        let spec = EventSpec {
            name: "broken".into(),
            entity_type: "Enemy".into(),
            conditions: vec![RuleSpec::new("Input").param("keys", serde_json::json!(["SPACE"]))],
            actions: vec![RuleSpec::new("Dance")],
        };
        assert!(matches!(
            Event::from_spec(&spec),
            Err(EngineError::UnknownAction { .. })
        ));
    }
}
