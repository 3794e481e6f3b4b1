//! Keeps entities inside the room.
//!
//! An entity poking out of `0..width` or `0..height` is moved back flush with
//! the edge, and the velocity component carrying it outward is zeroed.

use tessera_ecs::prelude::*;

use super::{System, TickReport};
use crate::input::InputSet;

pub struct BoundarySystem {
    width: f64,
    height: f64,
    required: Vec<ComponentKind>,
}

impl BoundarySystem {
    /// Keep entities carrying `required` inside a `width` x `height` room.
    pub fn new(width: f64, height: f64, required: Vec<ComponentKind>) -> Self {
        Self {
            width,
            height,
            required,
        }
    }
}

impl System for BoundarySystem {
    fn name(&self) -> &'static str {
        "Boundary"
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
            clamp_axis(entity, XPosition, Width, XVelocity, self.width);
            clamp_axis(entity, YPosition, Height, YVelocity, self.height);
        }
    }
}

fn clamp_axis(entity: &mut Entity, position: ComponentKind, extent: ComponentKind, velocity: ComponentKind, limit: f64) {
    let (Some(pos), Some(size)) = (entity.number(position), entity.number(extent)) else {
        return;
    };
    let speed = entity.number(velocity);
    let (clamped, outward) = if pos < 0.0 {
        (0.0, speed.is_some_and(|v| v < 0.0))
    } else if pos + size > limit {
        ((limit - size).max(0.0), speed.is_some_and(|v| v > 0.0))
    } else {
        return;
    };
    let _ = entity.set(position, clamped);
    if outward {
        let _ = entity.set(velocity, 0.0);
    }
}
