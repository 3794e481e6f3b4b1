//! Component kinds and their value payloads.
//!
//! The set of component kinds is closed: every kind is a variant of
//! [`ComponentKind`] and carries exactly one [`ValueType`]. Values travel as
//! the tagged union [`ComponentValue`], and a [`Component`] can only be built
//! when its value matches its kind's type, so no caller ever needs an
//! unchecked cast.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::EcsError;

// ---------------------------------------------------------------------------
// ValueType
// ---------------------------------------------------------------------------

/// The payload type a component kind stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Number,
    Text,
    Flag,
    /// A set of non-owning entity handles (collision bookkeeping).
    EntitySet,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Number => "number",
            ValueType::Text => "text",
            ValueType::Flag => "flag",
            ValueType::EntitySet => "entity set",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// ComponentKind
// ---------------------------------------------------------------------------

/// Every kind of component an entity can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    XPosition,
    YPosition,
    XVelocity,
    YVelocity,
    Width,
    Height,
    Name,
    Group,
    /// Participates in collision detection when `true`.
    Collision,
    /// Overrides whether collision resolution may displace the entity.
    Movable,
    Score,
    Lives,
    Health,
    CameraFocus,
    Sprite,
    Opacity,
    Visible,
    LeftCollided,
    RightCollided,
    TopCollided,
    BottomCollided,
    AnyCollided,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 22] = [
        ComponentKind::XPosition,
        ComponentKind::YPosition,
        ComponentKind::XVelocity,
        ComponentKind::YVelocity,
        ComponentKind::Width,
        ComponentKind::Height,
        ComponentKind::Name,
        ComponentKind::Group,
        ComponentKind::Collision,
        ComponentKind::Movable,
        ComponentKind::Score,
        ComponentKind::Lives,
        ComponentKind::Health,
        ComponentKind::CameraFocus,
        ComponentKind::Sprite,
        ComponentKind::Opacity,
        ComponentKind::Visible,
        ComponentKind::LeftCollided,
        ComponentKind::RightCollided,
        ComponentKind::TopCollided,
        ComponentKind::BottomCollided,
        ComponentKind::AnyCollided,
    ];

    /// Kinds the engine recomputes every tick and never persists.
    pub const TRANSIENT: [ComponentKind; 5] = [
        ComponentKind::LeftCollided,
        ComponentKind::RightCollided,
        ComponentKind::TopCollided,
        ComponentKind::BottomCollided,
        ComponentKind::AnyCollided,
    ];

    /// The authored name of the kind, identical to the variant name.
    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::XPosition => "XPosition",
            ComponentKind::YPosition => "YPosition",
            ComponentKind::XVelocity => "XVelocity",
            ComponentKind::YVelocity => "YVelocity",
            ComponentKind::Width => "Width",
            ComponentKind::Height => "Height",
            ComponentKind::Name => "Name",
            ComponentKind::Group => "Group",
            ComponentKind::Collision => "Collision",
            ComponentKind::Movable => "Movable",
            ComponentKind::Score => "Score",
            ComponentKind::Lives => "Lives",
            ComponentKind::Health => "Health",
            ComponentKind::CameraFocus => "CameraFocus",
            ComponentKind::Sprite => "Sprite",
            ComponentKind::Opacity => "Opacity",
            ComponentKind::Visible => "Visible",
            ComponentKind::LeftCollided => "LeftCollided",
            ComponentKind::RightCollided => "RightCollided",
            ComponentKind::TopCollided => "TopCollided",
            ComponentKind::BottomCollided => "BottomCollided",
            ComponentKind::AnyCollided => "AnyCollided",
        }
    }

    /// The payload type every value of this kind must have.
    pub fn value_type(self) -> ValueType {
        use ComponentKind::*;
        match self {
            XPosition | YPosition | XVelocity | YVelocity | Width | Height | Score | Lives
            | Health | Opacity => ValueType::Number,
            Name | Group | Sprite => ValueType::Text,
            Collision | Movable | CameraFocus | Visible => ValueType::Flag,
            LeftCollided | RightCollided | TopCollided | BottomCollided | AnyCollided => {
                ValueType::EntitySet
            }
        }
    }

    /// `true` for the collided kinds.
    ///
    /// Transient kinds are rebuilt every tick, stripped from saves, and
    /// cannot be written by actions.
    pub fn is_transient(self) -> bool {
        self.value_type() == ValueType::EntitySet
    }

    /// The value a condition equips when the kind is missing.
    pub fn default_value(self) -> ComponentValue {
        match self {
            ComponentKind::Opacity => ComponentValue::Number(1.0),
            ComponentKind::Visible => ComponentValue::Flag(true),
            kind => match kind.value_type() {
                ValueType::Number => ComponentValue::Number(0.0),
                ValueType::Text => ComponentValue::Text(String::new()),
                ValueType::Flag => ComponentValue::Flag(false),
                ValueType::EntitySet => ComponentValue::Entities(BTreeSet::new()),
            },
        }
    }

    /// Resolve a kind from its authored name.
    pub fn from_name(name: &str) -> Result<Self, EcsError> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| EcsError::UnknownComponent {
                name: name.to_owned(),
                registered: Self::ALL.map(ComponentKind::name).join(", "),
            })
    }
}

impl FromStr for ComponentKind {
    type Err = EcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ComponentValue
// ---------------------------------------------------------------------------

/// Tagged union of component payloads.
///
/// Serialized untagged, so authored JSON reads naturally: `12.5`, `"Enemy"`,
/// `true`, or an array of raw entity handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentValue {
    Flag(bool),
    Number(f64),
    Text(String),
    Entities(BTreeSet<EntityId>),
}

impl ComponentValue {
    /// The payload type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            ComponentValue::Number(_) => ValueType::Number,
            ComponentValue::Text(_) => ValueType::Text,
            ComponentValue::Flag(_) => ValueType::Flag,
            ComponentValue::Entities(_) => ValueType::EntitySet,
        }
    }

    /// The number, if this is a numeric value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ComponentValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ComponentValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if this is a flag value.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ComponentValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// The handle set, if this is a collided value.
    pub fn as_entities(&self) -> Option<&BTreeSet<EntityId>> {
        match self {
            ComponentValue::Entities(set) => Some(set),
            _ => None,
        }
    }

    /// Convert an authored JSON value into the payload `kind` expects.
    pub fn from_json(kind: ComponentKind, value: &serde_json::Value) -> Result<Self, EcsError> {
        let converted = match kind.value_type() {
            ValueType::Number => value.as_f64().map(ComponentValue::Number),
            ValueType::Text => value.as_str().map(|s| ComponentValue::Text(s.to_owned())),
            ValueType::Flag => value.as_bool().map(ComponentValue::Flag),
            ValueType::EntitySet => value.as_array().and_then(|items| {
                items
                    .iter()
                    .map(|item| item.as_u64().map(EntityId::from_raw))
                    .collect::<Option<BTreeSet<_>>>()
                    .map(ComponentValue::Entities)
            }),
        };
        converted.ok_or_else(|| EcsError::ValueTypeMismatch {
            kind,
            expected: kind.value_type(),
            found: json_type_name(value).to_owned(),
        })
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "flag",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "text",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl From<f64> for ComponentValue {
    fn from(n: f64) -> Self {
        ComponentValue::Number(n)
    }
}

impl From<bool> for ComponentValue {
    fn from(b: bool) -> Self {
        ComponentValue::Flag(b)
    }
}

impl From<&str> for ComponentValue {
    fn from(s: &str) -> Self {
        ComponentValue::Text(s.to_owned())
    }
}

impl From<String> for ComponentValue {
    fn from(s: String) -> Self {
        ComponentValue::Text(s)
    }
}

impl From<BTreeSet<EntityId>> for ComponentValue {
    fn from(set: BTreeSet<EntityId>) -> Self {
        ComponentValue::Entities(set)
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A `(kind, value)` pair whose value is known to match the kind's type.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    kind: ComponentKind,
    value: ComponentValue,
}

impl Component {
    /// Pair `kind` with `value`, checking that they fit.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ValueTypeMismatch`] when the value's type is not
    /// the kind's, and [`EcsError::NonFiniteNumber`] for an infinite or NaN
    /// number (it could not be written to a save and read back).
    pub fn new(kind: ComponentKind, value: impl Into<ComponentValue>) -> Result<Self, EcsError> {
        let value = value.into();
        if value.value_type() != kind.value_type() {
            return Err(EcsError::ValueTypeMismatch {
                kind,
                expected: kind.value_type(),
                found: value.value_type().to_string(),
            });
        }
        if let ComponentValue::Number(number) = &value {
            if !number.is_finite() {
                return Err(EcsError::NonFiniteNumber { kind, value: *number });
            }
        }
        Ok(Self { kind, value })
    }

    /// The kind's default-valued component.
    pub fn default_for(kind: ComponentKind) -> Self {
        Self {
            kind,
            value: kind.default_value(),
        }
    }

    /// The component's kind.
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// The component's value.
    pub fn value(&self) -> &ComponentValue {
        &self.value
    }

    /// Split into kind and value.
    pub fn into_parts(self) -> (ComponentKind, ComponentValue) {
        (self.kind, self.value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_resolves_from_its_name() {
        for kind in ComponentKind::ALL {
            assert_eq!(ComponentKind::from_name(kind.name()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_name_lists_known_kinds() {
        let err = ComponentKind::from_name("Mana").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Mana"));
        assert!(msg.contains("Score"));
    }

    #[test]
    fn only_collided_kinds_are_transient() {
        for kind in ComponentKind::ALL {
            assert_eq!(
                kind.is_transient(),
                ComponentKind::TRANSIENT.contains(&kind),
                "{kind}"
            );
        }
    }

    #[test]
    fn defaults_match_value_types() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.default_value().value_type(), kind.value_type(), "{kind}");
        }
        assert_eq!(ComponentKind::Opacity.default_value(), ComponentValue::Number(1.0));
    }

    #[test]
    fn component_rejects_mismatched_value() {
        assert!(Component::new(ComponentKind::Score, 10.0).is_ok());
        let err = Component::new(ComponentKind::Score, "ten").unwrap_err();
        assert!(matches!(err, EcsError::ValueTypeMismatch { kind: ComponentKind::Score, .. }));
    }

    #[test]
    fn component_rejects_non_finite_numbers() {
        for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let err = Component::new(ComponentKind::Score, bad).unwrap_err();
            assert!(matches!(err, EcsError::NonFiniteNumber { kind: ComponentKind::Score, .. }));
        }
        assert!(Component::new(ComponentKind::Score, f64::MAX).is_ok());
    }

    #[test]
    fn json_conversion_checks_kind() {
        let v = ComponentValue::from_json(ComponentKind::Group, &serde_json::json!("Enemy")).unwrap();
        assert_eq!(v.as_text(), Some("Enemy"));
        assert!(ComponentValue::from_json(ComponentKind::Group, &serde_json::json!(3)).is_err());

        let refs =
            ComponentValue::from_json(ComponentKind::AnyCollided, &serde_json::json!([1, 2])).unwrap();
        assert_eq!(refs.as_entities().map(|s| s.len()), Some(2));
    }

    #[test]
    fn untagged_serialization_is_plain_json() {
        assert_eq!(serde_json::to_string(&ComponentValue::Number(2.5)).unwrap(), "2.5");
        assert_eq!(serde_json::to_string(&ComponentValue::Flag(true)).unwrap(), "true");
        let back: ComponentValue = serde_json::from_str("\"hero\"").unwrap();
        assert_eq!(back, ComponentValue::Text("hero".into()));
    }
}
