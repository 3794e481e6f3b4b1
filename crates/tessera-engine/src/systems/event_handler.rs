//! Runs authored [`Event`]s against the entities they target.
//!
//! Events run in declaration order. For each event the target list is taken
//! fresh from the collection, so entities spawned or removed by an earlier
//! event are seen (or skipped) by later ones. Per target:
//!
//! 1. Conditions are equipped and evaluated one at a time; the first failure
//!    ends the event for that entity with nothing applied.
//! 2. All actions run in order. A failing action is logged and recorded in
//!    the [`TickReport`] and the remaining actions still run.
//! 3. Structural outcomes are applied afterwards: spawns are added to the
//!    collection, a removal drops the entity, a level change is reported.

use std::collections::BTreeMap;

use tessera_ecs::prelude::*;
use tracing::{debug, info, warn};

use super::{ActionFailure, System, TickReport};
use crate::action::ActionOutcome;
use crate::condition::ConditionContext;
use crate::event::Event;
use crate::input::InputSet;

pub struct EventHandlerSystem {
    events: Vec<Event>,
    templates: BTreeMap<String, Entity>,
    required: Vec<ComponentKind>,
}

impl EventHandlerSystem {
    /// Handler for the level's `events`, spawning from `templates`.
    ///
    /// Only entities carrying every kind in `required` are considered.
    pub fn new(events: Vec<Event>, templates: BTreeMap<String, Entity>, required: Vec<ComponentKind>) -> Self {
        Self {
            events,
            templates,
            required,
        }
    }

    /// Events in evaluation order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    fn targets(&self, entities: &EntityCollection, entity_type: &str) -> Vec<EntityId> {
        entities
            .iter()
            .filter(|(_, e)| e.has(&self.required) && e.text(ComponentKind::Group) == Some(entity_type))
            .map(|(id, _)| id)
            .collect()
    }
}

impl System for EventHandlerSystem {
    fn name(&self) -> &'static str {
        "EventHandler"
    }

    fn required_components(&self) -> &[ComponentKind] {
        &self.required
    }

    fn update(&mut self, entities: &mut EntityCollection, inputs: &InputSet, report: &mut TickReport) {
        for event in &self.events {
            for id in self.targets(entities, &event.entity_type) {
                if !conditions_hold(event, id, entities, inputs) {
                    continue;
                }
                run_actions(event, id, entities, &self.templates, report);
            }
        }
    }
}

fn conditions_hold(event: &Event, id: EntityId, entities: &mut EntityCollection, inputs: &InputSet) -> bool {
    for condition in &event.conditions {
        let Some(entity) = entities.get_mut(id) else {
            return false;
        };
        condition.equip(entity);

        let ctx = ConditionContext {
            entities: &*entities,
            inputs,
        };
        let holds = entities
            .get(id)
            .is_some_and(|entity| condition.evaluate(entity, &ctx));
        if !holds {
            return false;
        }
    }
    true
}

fn run_actions(
    event: &Event,
    id: EntityId,
    entities: &mut EntityCollection,
    templates: &BTreeMap<String, Entity>,
    report: &mut TickReport,
) {
    let Some(entity) = entities.get_mut(id) else {
        return;
    };

    let mut outcomes = Vec::new();
    for action in &event.actions {
        match action.apply(entity, templates) {
            Ok(outcome) => outcomes.push(outcome),
            Err(error) => {
                warn!(
                    event = %event.name,
                    entity = %id,
                    action = action.kind_name(),
                    %error,
                    "action skipped"
                );
                report.action_failures.push(ActionFailure {
                    event: event.name.clone(),
                    entity: id,
                    action: action.kind_name(),
                    error,
                });
            }
        }
    }

    let mut remove = false;
    for outcome in outcomes {
        match outcome {
            ActionOutcome::Applied => {}
            ActionOutcome::RemoveEntity => remove = true,
            ActionOutcome::Spawn(spawned) => {
                let new_id = entities.spawn(spawned);
                debug!(event = %event.name, parent = %id, entity = %new_id, "spawned");
            }
            ActionOutcome::ChangeLevel(level) => {
                info!(event = %event.name, entity = %id, %level, "level change requested");
                report.level_request = Some(level);
            }
        }
    }
    if remove {
        entities.remove(id);
        debug!(event = %event.name, entity = %id, "removed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
