//! End-to-end scenarios: levels loaded, engines ticked, outcomes checked.

use tessera_engine::prelude::*;
use ComponentKind::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ids_of(entities: &EntityCollection, name: &str) -> EntityId {
    entities
        .iter()
        .find(|(_, e)| e.text(Name) == Some(name))
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("no entity named {name}"))
}

fn collided(entities: &EntityCollection, id: EntityId, side: ComponentKind) -> Vec<EntityId> {
    entities
        .get(id)
        .and_then(|e| e.entities(side))
        .map(|set| set.iter().copied().collect())
        .unwrap_or_default()
}

fn approach_level() -> Level {
    Level::new("approach", 100.0, 20.0)
        .with_entity(
            Entity::builder()
                .with(Name, "a")
                .rect(10.0, 0.0, 4.0, 4.0)
                .velocity(2.0, 0.0)
                .with(Collision, true)
                .with(CameraFocus, true)
                .build()
                .unwrap(),
        )
        .with_entity(
            Entity::builder()
                .with(Name, "b")
                .rect(18.0, 0.0, 4.0, 4.0)
                .with(Collision, true)
                .build()
                .unwrap(),
        )
}

// ---------------------------------------------------------------------------
// Collision
// ---------------------------------------------------------------------------

#[test]
fn moving_box_stops_against_stationary_box() {
    let mut engine = Engine::from_level(approach_level()).unwrap();
    let inputs = InputSet::new();
    let a = ids_of(engine.entities(), "a");
    let b = ids_of(engine.entities(), "b");

    // Tick 1 brings A to x=12, still clear of B.
    engine.update_state(&inputs);
    assert!(collided(engine.entities(), a, RightCollided).is_empty());
    assert!(collided(engine.entities(), b, LeftCollided).is_empty());

    // Tick 2 brings A's right edge to 18, B's left edge: touching is a hit
    // but there is nothing to push out. Ticks 3 and 4 push A into B by 2 and
    // the adjustment pushes it back to the touching position.
    for _ in 0..3 {
        let entities = engine.update_state(&inputs);
        assert_eq!(collided(entities, a, RightCollided), vec![b]);
        assert_eq!(collided(entities, b, LeftCollided), vec![a]);
        assert_eq!(collided(entities, a, AnyCollided), vec![b]);
        assert_eq!(collided(entities, b, AnyCollided), vec![a]);

        let a_box = entities.get(a).unwrap();
        assert_eq!(a_box.number(XPosition), Some(14.0));
        let right_edge = a_box.number(XPosition).unwrap() + a_box.number(Width).unwrap();
        let left_edge_b = entities.get(b).unwrap().number(XPosition).unwrap();
        assert!(right_edge <= left_edge_b);
    }
    assert_eq!(engine.tick_count(), 4);
    assert_eq!(engine.entities().get(a).unwrap().number(XPosition), Some(14.0));
    assert_eq!(engine.entities().get(b).unwrap().number(XPosition), Some(18.0));
}

#[test]
fn collision_tags_vanish_once_apart() {
    let mut engine = Engine::from_level(approach_level()).unwrap();
    let inputs = InputSet::new();
    engine.run_ticks(3, &inputs);
    let a = ids_of(engine.entities(), "a");
    assert!(!collided(engine.entities(), a, AnyCollided).is_empty());

    // Reverse A; the next tick it is already clear of B.
    let reversed = engine
        .entities()
        .get(a)
        .cloned()
        .map(|mut e| {
            e.set(XVelocity, -5.0).unwrap();
            e
        })
        .unwrap();
    engine.remove_entity(a);
    let a = engine.add_entity(reversed);
    engine.update_state(&inputs);
    assert!(engine.entities().get(a).unwrap().entities(AnyCollided).is_none());
}

#[test]
fn bounce_event_reverses_velocity_on_wall_contact() {
    let level = Level::from_json_str(
        r#"{
            "name": "court",
            "width": 100,
            "height": 50,
            "entities": [
                {"Name": "ball", "Group": "Ball", "CameraFocus": true, "XPosition": 90, "YPosition": 10,
                 "Width": 4, "Height": 4, "XVelocity": 3, "YVelocity": 0, "Collision": true},
                {"Name": "wall", "Group": "Wall", "XPosition": 96, "YPosition": 0,
                 "Width": 4, "Height": 50, "Collision": true}
            ],
            "events": [{
                "name": "bounce",
                "entity_type": "Ball",
                "conditions": [{"kind": "Collided", "side": "Right", "group": "Wall"}],
                "actions": [{"kind": "Scale", "component": "XVelocity", "factor": -1}]
            }]
        }"#,
    )
    .unwrap();
    let mut engine = Engine::from_level(level).unwrap();
    let inputs = InputSet::new();

    // Tick 1: 90 -> 93, overlaps the wall by 1, bounces.
    engine.update_state(&inputs);
    let ball = ids_of(engine.entities(), "ball");
    let state = engine.entities().get(ball).unwrap();
    assert_eq!(state.number(XVelocity), Some(-3.0));
    assert_eq!(state.number(XPosition), Some(92.0));

    // Tick 2: moving away, no contact.
    engine.update_state(&inputs);
    let state = engine.entities().get(ball).unwrap();
    assert_eq!(state.number(XPosition), Some(89.0));
    assert!(!state.has_kind(RightCollided));
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn rich_enemies_lose_a_life() {
    let level = Level::new("barracks", 100.0, 100.0)
        .with_entity(
            Entity::builder()
                .with(Name, "rich")
                .with(Group, "Enemy")
                .with(Score, 150.0)
                .with(Lives, 3.0)
                .build()
                .unwrap(),
        )
        .with_entity(
            Entity::builder()
                .with(Name, "poor")
                .with(Group, "Enemy")
                .with(Score, 50.0)
                .with(Lives, 3.0)
                .build()
                .unwrap(),
        )
        .with_event(
            Event::new("wear_down", "Enemy")
                .when(Condition::Compare {
                    kind: Score,
                    op: CompareOp::Greater,
                    value: 100.0,
                })
                .then(Action::Add {
                    kind: Lives,
                    delta: -1.0,
                }),
        );

    let mut engine = Engine::from_level(level).unwrap();
    let entities = engine.update_state(&InputSet::new());
    assert_eq!(entities.get(ids_of(entities, "rich")).unwrap().number(Lives), Some(2.0));
    assert_eq!(entities.get(ids_of(entities, "poor")).unwrap().number(Lives), Some(3.0));
}

#[test]
fn spawn_remove_and_level_change_through_json() {
    let level = Level::from_json_str(
        r#"{
            "name": "range",
            "width": 200,
            "height": 200,
            "entities": [
                {"Name": "gun", "Group": "Turret", "CameraFocus": true, "XPosition": 50, "YPosition": 50,
                 "Width": 4, "Height": 4},
                {"Name": "target", "Group": "Target", "Health": 0}
            ],
            "templates": {
                "shell": {"Group": "Shell", "Width": 1, "Height": 1, "XVelocity": 0, "YVelocity": -4}
            },
            "events": [
                {
                    "name": "fire",
                    "entity_type": "Turret",
                    "conditions": [{"kind": "Input", "keys": ["SPACE"]}],
                    "actions": [{"kind": "Spawn", "template": "shell", "dx": 1, "dy": -2}]
                },
                {
                    "name": "destroyed",
                    "entity_type": "Target",
                    "conditions": [{"kind": "Compare", "component": "Health", "op": "<=", "value": 0}],
                    "actions": [
                        {"kind": "RemoveEntity"},
                        {"kind": "ChangeLevel", "level": "victory"}
                    ]
                }
            ]
        }"#,
    )
    .unwrap();
    let mut engine = Engine::from_level(level).unwrap();

    engine.update_state(&InputSet::new());
    assert_eq!(engine.entities().len(), 1);
    assert_eq!(engine.requested_level(), Some("victory"));
    assert_eq!(engine.take_level_request().as_deref(), Some("victory"));
    assert_eq!(engine.requested_level(), None);

    let fire: InputSet = ["SPACE"].into_iter().collect();
    let entities = engine.update_state(&fire);
    assert_eq!(entities.len(), 2);
    let (_, shell) = entities
        .iter()
        .find(|(_, e)| e.text(Group) == Some("Shell"))
        .unwrap();
    assert_eq!(shell.number(XPosition), Some(51.0));
    assert_eq!(shell.number(YPosition), Some(48.0));
    assert_eq!(shell.number(Width), Some(1.0 + DUPLICATE_WIDTH_INCREMENT));

    // Next tick the shell moves with its own velocity.
    let entities = engine.update_state(&InputSet::new());
    let (_, shell) = entities
        .iter()
        .find(|(_, e)| e.text(Group) == Some("Shell"))
        .unwrap();
    assert_eq!(shell.number(YPosition), Some(44.0));
}

#[test]
fn misfiring_actions_are_reported_not_fatal() {
    let level = Level::new("lab", 10.0, 10.0)
        .with_entity(
            Entity::builder()
                .with(Group, "Probe")
                .with(Name, "p1")
                .build()
                .unwrap(),
        )
        .with_event(
            Event::new("probe", "Probe")
                .then(Action::Set {
                    kind: Score,
                    value: ComponentValue::Text("high".into()),
                })
                .then(Action::Toggle { kind: Visible }),
        );
    let mut engine = Engine::from_level(level).unwrap();
    let entities = engine.update_state(&InputSet::new());
    let id = ids_of(entities, "p1");
    assert_eq!(entities.get(id).unwrap().flag(Visible), Some(false));
    assert!(!entities.get(id).unwrap().has_kind(Score));

    let failures = &engine.last_diagnostics().action_failures;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].event, "probe");
    assert_eq!(failures[0].entity, id);
    assert!(matches!(failures[0].error, ActionError::TypeMismatch { kind: Score, .. }));
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn boundary_from_json_config() {
    let config = EngineConfig::from_json_str(
        r#"{
            "pipeline": [
                {"priority": 0, "system": "Movement"},
                {"priority": 5, "system": "Boundary"}
            ]
        }"#,
    )
    .unwrap();
    let level = Level::new("box", 20.0, 20.0).with_entity(
        Entity::builder()
            .with(Name, "runner")
            .with(CameraFocus, true)
            .rect(15.0, 5.0, 4.0, 4.0)
            .velocity(3.0, 0.0)
            .build()
            .unwrap(),
    );
    let mut engine = Engine::new(level, &config).unwrap();
    assert_eq!(engine.system_names(), vec!["Movement", "Boundary"]);

    let entities = engine.update_state(&InputSet::new());
    let runner = entities.get(ids_of(entities, "runner")).unwrap();
    assert_eq!(runner.number(XPosition), Some(16.0));
    assert_eq!(runner.number(XVelocity), Some(0.0));
    assert!(engine.collision_contacts().is_empty());
}

#[test]
fn collision_requirements_narrow_the_candidates() {
    let config = EngineConfig::from_json_str(
        r#"{"pipeline": [{"priority": 0, "system": "Collision", "requires": ["Group"]}]}"#,
    )
    .unwrap();
    let level = Level::new("narrow", 50.0, 50.0)
        .with_entity(
            Entity::builder()
                .rect(0.0, 0.0, 4.0, 4.0)
                .with(Collision, true)
                .with(Group, "Solid")
                .build()
                .unwrap(),
        )
        .with_entity(Entity::builder().rect(1.0, 1.0, 4.0, 4.0).with(Collision, true).build().unwrap());
    let mut engine = Engine::new(level, &config).unwrap();
    engine.update_state(&InputSet::new());
    assert!(engine.collision_contacts().is_empty());
}

#[test]
fn systems_ahead_of_collision_never_see_last_ticks_tags() {
    let config = EngineConfig {
        pipeline: vec![SystemSpec::new(0, "EventHandler"), SystemSpec::new(1, "Collision")],
        ..Default::default()
    };
    let crate_at = |x: f64| {
        Entity::builder()
            .with(Group, "Crate")
            .rect(x, 0.0, 4.0, 4.0)
            .with(Collision, true)
            .build()
            .unwrap()
    };
    let level = Level::new("stack", 20.0, 20.0)
        .with_entity(crate_at(0.0))
        .with_entity(crate_at(2.0))
        .with_event(
            Event::new("bumped", "Crate")
                .when(Condition::Collided {
                    side: CollisionSide::Any,
                    group: None,
                })
                .then(Action::Add {
                    kind: Score,
                    delta: 1.0,
                }),
        );
    let mut engine = Engine::new(level, &config).unwrap();

    // Neither crate moves, so they overlap at the end of every tick, but the
    // handler runs first and must find the tags already gone.
    for _ in 0..3 {
        let entities = engine.update_state(&InputSet::new());
        for (_, crate_box) in entities.iter() {
            assert!(crate_box.has_kind(AnyCollided));
            assert!(!crate_box.has_kind(Score));
        }
    }
}
