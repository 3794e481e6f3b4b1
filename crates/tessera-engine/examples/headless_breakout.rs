//! Headless breakout -- a JSON-authored level played by a scripted paddle.
//!
//! Run with:
//!   cargo run --example headless_breakout -p tessera-engine
//!
//! Set `RUST_LOG=tessera_engine=debug` to watch collisions tick by tick.

use tessera_engine::prelude::*;

const TICKS: u64 = 600;

const LEVEL: &str = r#"{
    "name": "breakout",
    "width": 160,
    "height": 120,
    "background": "starfield.png",
    "music": "chiptune.ogg",
    "entities": [
        {"Name": "paddle", "Group": "Paddle", "XPosition": 70, "YPosition": 110, "Width": 20, "Height": 4,
         "XVelocity": 0, "YVelocity": 0, "Collision": true, "Movable": false},
        {"Name": "ball", "Group": "Ball", "CameraFocus": true, "XPosition": 78, "YPosition": 90,
         "Width": 3, "Height": 3, "XVelocity": 2, "YVelocity": -2, "Collision": true},
        {"Name": "left wall", "Group": "Wall", "XPosition": -10, "YPosition": 0, "Width": 10, "Height": 120, "Collision": true},
        {"Name": "right wall", "Group": "Wall", "XPosition": 160, "YPosition": 0, "Width": 10, "Height": 120, "Collision": true},
        {"Name": "ceiling", "Group": "Wall", "XPosition": 0, "YPosition": -10, "Width": 160, "Height": 10, "Collision": true},
        {"Group": "Brick", "XPosition": 10, "YPosition": 20, "Width": 30, "Height": 8, "Collision": true, "Score": 10},
        {"Group": "Brick", "XPosition": 50, "YPosition": 20, "Width": 30, "Height": 8, "Collision": true, "Score": 10},
        {"Group": "Brick", "XPosition": 90, "YPosition": 20, "Width": 30, "Height": 8, "Collision": true, "Score": 20},
        {"Group": "Brick", "XPosition": 130, "YPosition": 20, "Width": 20, "Height": 8, "Collision": true, "Score": 10}
    ],
    "events": [
        {"name": "steer_left", "entity_type": "Paddle",
         "conditions": [{"kind": "Input", "keys": ["LEFT"]}],
         "actions": [{"kind": "Set", "component": "XVelocity", "value": -3}]},
        {"name": "steer_right", "entity_type": "Paddle",
         "conditions": [{"kind": "Input", "keys": ["RIGHT"]}],
         "actions": [{"kind": "Set", "component": "XVelocity", "value": 3}]},
        {"name": "idle", "entity_type": "Paddle",
         "conditions": [
            {"kind": "Not", "condition": {"kind": "Input", "keys": ["LEFT"]}},
            {"kind": "Not", "condition": {"kind": "Input", "keys": ["RIGHT"]}}
         ],
         "actions": [{"kind": "Set", "component": "XVelocity", "value": 0}]},
        {"name": "score", "entity_type": "Ball",
         "conditions": [{"kind": "Collided", "side": "Any", "group": "Brick"}],
         "actions": [{"kind": "Add", "component": "Score", "delta": 10}]},
        {"name": "bounce_vertical_top", "entity_type": "Ball",
         "conditions": [{"kind": "Collided", "side": "Top"}],
         "actions": [{"kind": "Set", "component": "YVelocity", "value": 2}]},
        {"name": "bounce_vertical_bottom", "entity_type": "Ball",
         "conditions": [{"kind": "Collided", "side": "Bottom"}],
         "actions": [{"kind": "Set", "component": "YVelocity", "value": -2}]},
        {"name": "bounce_left", "entity_type": "Ball",
         "conditions": [{"kind": "Collided", "side": "Left"}],
         "actions": [{"kind": "Set", "component": "XVelocity", "value": 2}]},
        {"name": "bounce_right", "entity_type": "Ball",
         "conditions": [{"kind": "Collided", "side": "Right"}],
         "actions": [{"kind": "Set", "component": "XVelocity", "value": -2}]},
        {"name": "shatter", "entity_type": "Brick",
         "conditions": [{"kind": "Collided", "side": "Any", "group": "Ball"}],
         "actions": [{"kind": "RemoveEntity"}]},
        {"name": "missed", "entity_type": "Ball",
         "conditions": [{"kind": "Compare", "component": "YPosition", "op": ">", "value": 120}],
         "actions": [{"kind": "ChangeLevel", "level": "game_over"}]}
    ]
}"#;

const CONFIG: &str = r#"{
    "pipeline": [
        {"priority": 0, "system": "Movement"},
        {"priority": 1, "system": "Boundary", "requires": ["Movable"]},
        {"priority": 2, "system": "Collision"},
        {"priority": 3, "system": "EventHandler"},
        {"priority": 100, "system": "SaveGame"}
    ]
}"#;

fn find<'a>(entities: &'a EntityCollection, group: &str) -> Option<&'a Entity> {
    entities
        .iter()
        .map(|(_, e)| e)
        .find(|e| e.text(ComponentKind::Group) == Some(group))
}

fn center_x(entity: &Entity) -> f64 {
    entity.number(ComponentKind::XPosition).unwrap_or(0.0) + entity.number(ComponentKind::Width).unwrap_or(0.0) / 2.0
}

/// Steer the paddle under the ball.
fn scripted_inputs(entities: &EntityCollection) -> InputSet {
    let mut inputs = InputSet::new();
    if let (Some(paddle), Some(ball)) = (find(entities, "Paddle"), find(entities, "Ball")) {
        let offset = center_x(ball) - center_x(paddle);
        if offset < -2.0 {
            inputs.press("LEFT");
        } else if offset > 2.0 {
            inputs.press("RIGHT");
        }
    }
    inputs
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let level = Level::from_json_str(LEVEL)?;
    let config = EngineConfig::from_json_str(CONFIG)?;
    let mut engine = Engine::new(level, &config)?;
    println!(
        "level '{}' ({}x{}), systems: {:?}",
        engine.level_name(),
        engine.room_width(),
        engine.room_height(),
        engine.system_names()
    );

    let mut collisions = 0usize;
    for _ in 0..TICKS {
        let inputs = scripted_inputs(engine.entities());
        engine.update_state(&inputs);
        collisions += engine.collision_contacts().len();

        if let Some(next) = engine.take_level_request() {
            println!("tick {}: level change requested -> {next}", engine.tick_count());
            break;
        }
        if find(engine.entities(), "Brick").is_none() {
            println!("tick {}: all bricks cleared", engine.tick_count());
            break;
        }
    }

    let score = find(engine.entities(), "Ball")
        .and_then(|ball| ball.number(ComponentKind::Score))
        .unwrap_or(0.0);
    let bricks = engine
        .entities()
        .iter()
        .filter(|(_, e)| e.text(ComponentKind::Group) == Some("Brick"))
        .count();
    println!(
        "after {} ticks: score {score}, {bricks} bricks left, {collisions} contacts seen",
        engine.tick_count()
    );
    println!("state hash: {}", engine.state_hash());

    let saved = engine.save_game();
    println!("save: {} entities, {} bytes of JSON, hash {}", saved.world.len(), saved.to_json()?.len(), saved.hash);
    Ok(())
}
