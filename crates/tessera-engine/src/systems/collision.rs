//! Directional collision detection and separation.
//!
//! Detection runs as an ordinary pipeline stage. Every tick it strips the
//! previous tick's collision tags, tests each unordered pair of collidable
//! entities for axis-aligned overlap, and tags both sides:
//!
//! - boxes whose edges touch count as colliding (overlap zero); boxes without
//!   area never collide;
//! - the axis with the smaller overlap is the collision axis (ties go to the
//!   configured [`Axis`]);
//! - on the horizontal axis the entity further left is hit on its right and
//!   the other on its left; on the vertical axis (y grows downward) the
//!   upper entity is hit on its bottom and the lower on its top;
//! - both are tagged `AnyCollided`, and every tag holds the *set* of
//!   entities causing it.
//!
//! Separation happens later, in [`CollisionSystem::adjust_collided_entities`],
//! once movement for the tick is final. Each recorded contact is re-measured
//! against current positions and the movable side is pushed out along the
//! contact axis.

use serde::{Deserialize, Serialize};
use tessera_ecs::prelude::*;
use tracing::debug;

use super::{System, TickReport};
use crate::input::InputSet;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Axis-aligned bounding box read from an entity's position and extent.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Aabb {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Aabb {
    fn of(entity: &Entity) -> Option<Self> {
        Some(Self {
            x: entity.number(ComponentKind::XPosition)?,
            y: entity.number(ComponentKind::YPosition)?,
            width: entity.number(ComponentKind::Width)?,
            height: entity.number(ComponentKind::Height)?,
        })
    }

    fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    fn center(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.x + self.width / 2.0,
            Axis::Vertical => self.y + self.height / 2.0,
        }
    }

    /// Penetration depth on `axis`: zero when the spans touch, negative when
    /// they are apart.
    fn overlap(&self, other: &Aabb, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => (self.x + self.width).min(other.x + other.width) - self.x.max(other.x),
            Axis::Vertical => (self.y + self.height).min(other.y + other.height) - self.y.max(other.y),
        }
    }
}

/// One detected overlap. `first` is the entity on the low side of `axis`
/// (left, or top), so separating pushes it toward negative coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub first: EntityId,
    pub second: EntityId,
    pub axis: Axis,
    pub overlap: f64,
}

/// An entity is movable when its `Movable` flag says so or, lacking the
/// flag, when it carries a velocity.
pub fn is_movable(entity: &Entity) -> bool {
    match entity.flag(ComponentKind::Movable) {
        Some(movable) => movable,
        None => entity.has_kind(ComponentKind::XVelocity) || entity.has_kind(ComponentKind::YVelocity),
    }
}

// ---------------------------------------------------------------------------
// CollisionSystem
// ---------------------------------------------------------------------------

pub struct CollisionSystem {
    required: Vec<ComponentKind>,
    tie_axis: Axis,
    contacts: Vec<Contact>,
}

impl CollisionSystem {
    /// Detector for entities carrying every kind in `required`; equal
    /// overlaps on both axes resolve along `tie_axis`.
    pub fn new(required: Vec<ComponentKind>, tie_axis: Axis) -> Self {
        Self {
            required,
            tie_axis,
            contacts: Vec::new(),
        }
    }

    /// Contacts found by the most recent [`update`](System::update).
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Forget every recorded contact, e.g. once the collection they were
    /// measured on has been replaced.
    pub fn reset(&mut self) {
        self.contacts.clear();
    }

    /// Find every overlapping pair and tag both entities.
    pub fn detect(&mut self, entities: &mut EntityCollection) {
        entities.clear_transient();
        self.contacts.clear();

        let boxes: Vec<(EntityId, Aabb)> = entities
            .iter()
            .filter(|(_, e)| e.has(&self.required) && e.flag(ComponentKind::Collision) == Some(true))
            .filter_map(|(id, e)| Aabb::of(e).map(|aabb| (id, aabb)))
            .filter(|(_, aabb)| aabb.has_area())
            .collect();

        for (i, (a, a_box)) in boxes.iter().enumerate() {
            for (b, b_box) in &boxes[i + 1..] {
                if let Some(contact) = self.classify(*a, a_box, *b, b_box) {
                    self.contacts.push(contact);
                }
            }
        }

        for contact in &self.contacts {
            debug!(
                first = %contact.first,
                second = %contact.second,
                axis = ?contact.axis,
                overlap = contact.overlap,
                "collision"
            );
            tag(entities, contact);
        }
    }

    fn classify(&self, a: EntityId, a_box: &Aabb, b: EntityId, b_box: &Aabb) -> Option<Contact> {
        let overlap_x = a_box.overlap(b_box, Axis::Horizontal);
        let overlap_y = a_box.overlap(b_box, Axis::Vertical);
        if overlap_x < 0.0 || overlap_y < 0.0 {
            return None;
        }
        let (axis, overlap) = if overlap_x < overlap_y {
            (Axis::Horizontal, overlap_x)
        } else if overlap_y < overlap_x {
            (Axis::Vertical, overlap_y)
        } else {
            (self.tie_axis, overlap_x)
        };
        let (first, second) = if a_box.center(axis) <= b_box.center(axis) {
            (a, b)
        } else {
            (b, a)
        };
        Some(Contact {
            first,
            second,
            axis,
            overlap,
        })
    }

    /// Push apart every pair detected this tick that still overlaps.
    ///
    /// Each contact is re-measured first, so pairs already separated by an
    /// earlier adjustment (or whose entities were removed) are skipped, as
    /// are pairs that merely touch. When
    /// both sides are movable each moves half the overlap; when neither is,
    /// they are left interpenetrating.
    pub fn adjust_collided_entities(&mut self, entities: &mut EntityCollection) {
        for contact in &self.contacts {
            let (Some(first), Some(second)) = (entities.get(contact.first), entities.get(contact.second)) else {
                continue;
            };
            let (Some(first_box), Some(second_box)) = (Aabb::of(first), Aabb::of(second)) else {
                continue;
            };
            if first_box.overlap(&second_box, Axis::Horizontal) <= 0.0
                || first_box.overlap(&second_box, Axis::Vertical) <= 0.0
            {
                // Apart, or only touching: nothing to push out.
                continue;
            }
            let overlap = first_box.overlap(&second_box, contact.axis);
            let (first_share, second_share) = match (is_movable(first), is_movable(second)) {
                (true, true) => (overlap / 2.0, overlap / 2.0),
                (true, false) => (overlap, 0.0),
                (false, true) => (0.0, overlap),
                (false, false) => continue,
            };
            let kind = match contact.axis {
                Axis::Horizontal => ComponentKind::XPosition,
                Axis::Vertical => ComponentKind::YPosition,
            };
            shift(entities, contact.first, kind, -first_share);
            shift(entities, contact.second, kind, second_share);
        }
    }
}

impl System for CollisionSystem {
    fn name(&self) -> &'static str {
        "Collision"
    }

    fn required_components(&self) -> &[ComponentKind] {
        &self.required
    }

    fn update(&mut self, entities: &mut EntityCollection, _inputs: &InputSet, _report: &mut TickReport) {
        self.detect(entities);
    }
}

fn tag(entities: &mut EntityCollection, contact: &Contact) {
    let (first_side, second_side) = match contact.axis {
        Axis::Horizontal => (ComponentKind::RightCollided, ComponentKind::LeftCollided),
        Axis::Vertical => (ComponentKind::BottomCollided, ComponentKind::TopCollided),
    };
    for (id, side, other) in [
        (contact.first, first_side, contact.second),
        (contact.second, second_side, contact.first),
    ] {
        if let Some(entity) = entities.get_mut(id) {
            // Collided kinds always hold entity sets.
            let _ = entity.insert_reference(side, other);
            let _ = entity.insert_reference(ComponentKind::AnyCollided, other);
        }
    }
}

fn shift(entities: &mut EntityCollection, id: EntityId, kind: ComponentKind, delta: f64) {
    if delta == 0.0 {
        return;
    }
    if let Some(entity) = entities.get_mut(id) {
        if let Some(current) = entity.number(kind) {
            let _ = entity.set(kind, current + delta);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
