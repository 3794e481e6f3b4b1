//! Straight-line integration: position += velocity, once per tick.

use tessera_ecs::prelude::*;

use super::{System, TickReport};
use crate::input::InputSet;

pub struct MovementSystem {
    required: Vec<ComponentKind>,
}

impl MovementSystem {
    /// Integrator over entities carrying every kind in `required`.
    pub fn new(required: Vec<ComponentKind>) -> Self {
        Self { required }
    }
}

impl Default for MovementSystem {
    fn default() -> Self {
        Self::new(super::SystemKind::Movement.base_requirements().to_vec())
    }
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "Movement"
    }

    fn required_components(&self) -> &[ComponentKind] {
        &self.required
    }

    fn update(&mut self, entities: &mut EntityCollection, _inputs: &InputSet, _report: &mut TickReport) {
        use ComponentKind::*;
        for (_, entity) in entities.iter_mut() {
            if !entity.has(&self.required) {
                continue;
            }
            let (Some(x), Some(y), Some(dx), Some(dy)) = (
                entity.number(XPosition),
                entity.number(YPosition),
                entity.number(XVelocity),
                entity.number(YVelocity),
            ) else {
                continue;
            };
            // Both kinds are numeric, so these sets cannot fail.
            let _ = entity.set(XPosition, x + dx);
            let _ = entity.set(YPosition, y + dy);
        }
    }
}
