use std::path::Path;

use phork::engine::{Failure, GRUE_DEATH, GRUE_WARNING, Output, ScriptedDice};
use phork::world::{GameObject, Location, ObjectAttrs, ObjectKind, RoomFlags};
use phork::{EngineConfig, GameState, Phase, fallback_world, load_world_from_file};

fn sample_game(config: EngineConfig, roll: f64) -> GameState {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("public/phork.toml");
    let world = load_world_from_file(&path).expect("sample world loads");
    GameState::new(world, config).with_dice(Box::new(ScriptedDice::constant(roll)))
}

#[test]
fn troll_goes_down_in_four_rounds_with_steady_rolls() {
    let mut g = sample_game(EngineConfig::default(), 0.5);
    g.world.player.room = "troll_room".to_string();

    for round in 1..=3 {
        let (out, _) = g.step("attack troll");
        assert!(out.contains("You wound the troll!"), "round {round}: {}", out.text());
        assert!(out.contains("The troll wounds you!"));
        assert_eq!(g.world.npcs["troll"].health, 4 - round);
    }

    let (out, _) = g.step("attack troll");
    assert!(out.contains("You kill the troll!"));
    assert!(out.contains("The way across the bridge is clear."));
    assert_eq!(out.score_delta, 5);
    assert!(!g.world.npcs["troll"].alive);
    assert_eq!(g.world.player.health, 2);
    assert_eq!(g.world.turn, 4);

    let (out, _) = g.step("east");
    assert!(!out.failed());
    assert_eq!(g.world.player.room, "loud_room");
}

#[test]
fn attacking_with_a_missing_weapon_changes_nothing() {
    let mut g = sample_game(EngineConfig::default(), 0.5);
    g.world.player.room = "troll_room".to_string();

    let (out, _) = g.step("attack troll with sword");
    assert_eq!(out.failure, Some(Failure::Resolution));
    assert_eq!(g.world.npcs["troll"].health, 4);
    assert_eq!(g.world.turn, 0);
}

fn dark_kitchen_run() -> (Vec<String>, GameState) {
    let mut world = fallback_world();
    world.set_room_flag("kitchen", RoomFlags::DARK);
    let config = EngineConfig {
        dark_death_turns: 2,
        ..EngineConfig::default()
    };
    let mut g = GameState::new(world, config).with_dice(Box::new(ScriptedDice::constant(0.5)));

    let mut transcript = Vec::new();
    for cmd in ["east", "wait"] {
        let (out, _): (Output, bool) = g.step(cmd);
        transcript.push(out.text());
    }
    (transcript, g)
}

#[test]
fn grue_warns_then_strikes() {
    let (transcript, g) = dark_kitchen_run();

    assert!(transcript[0].contains("It is pitch black."));
    assert!(transcript[0].contains(GRUE_WARNING));
    assert!(!transcript[0].contains(GRUE_DEATH));

    assert!(transcript[1].contains(GRUE_DEATH));
    assert!(transcript[1].contains("You have died."));
    assert_eq!(g.phase, Phase::Dead);
    assert_eq!(g.world.score, -5);
    assert_eq!(g.world.player.deaths, 1);
}

#[test]
fn the_dark_is_deterministic() {
    let (first, _) = dark_kitchen_run();
    let (second, _) = dark_kitchen_run();
    assert_eq!(first, second);
}

fn standing_in_the_dark_kitchen() -> GameState {
    let mut world = fallback_world();
    world.set_room_flag("kitchen", RoomFlags::DARK);
    world.player.room = "kitchen".to_string();
    world.objects.insert(
        "lamp".to_string(),
        GameObject {
            id: "lamp".to_string(),
            name: "lamp".to_string(),
            aliases: Vec::new(),
            description: String::new(),
            text: None,
            kind: ObjectKind::Simple,
            attrs: ObjectAttrs {
                light: true,
                ..ObjectAttrs::default()
            },
            location: Location::Inventory,
        },
    );
    let config = EngineConfig {
        dark_death_turns: 2,
        ..EngineConfig::default()
    };
    GameState::new(world, config).with_dice(Box::new(ScriptedDice::constant(0.5)))
}

#[test]
fn looking_twice_in_the_dark_is_fatal() {
    let mut g = standing_in_the_dark_kitchen();

    let (out, _) = g.step("look");
    assert!(out.contains(GRUE_WARNING));
    assert_eq!(g.phase, Phase::Playing);

    let (out, _) = g.step("look");
    assert!(out.contains(GRUE_DEATH));
    assert_eq!(g.phase, Phase::Dead);
}

#[test]
fn lighting_up_resets_the_grue_counter() {
    let mut g = standing_in_the_dark_kitchen();

    g.step("look");
    assert_eq!(g.world.dark_turns, 1);
    g.step("light lamp");
    assert_eq!(g.world.dark_turns, 0);

    for _ in 0..4 {
        let (out, _) = g.step("look");
        assert!(!out.contains(GRUE_DEATH));
        assert!(out.contains("Kitchen"));
    }
    assert_eq!(g.phase, Phase::Playing);
    assert_eq!(g.world.dark_turns, 0);
}

#[test]
fn carry_limit_applies_until_demo_mode() {
    let config = EngineConfig {
        carry_limit: 5,
        ..EngineConfig::default()
    };
    let mut g = sample_game(config, 0.99);
    g.world.player.room = "living_room".to_string();

    let (out, _) = g.step("take lamp");
    assert!(!out.failed());

    let (out, _) = g.step("take sword");
    assert_eq!(out.failure, Some(Failure::Resource));
    assert!(out.contains("too heavy"));
    assert_eq!(g.world.objects["sword"].location, Location::Room("living_room".into()));

    g.step("demo");
    let (out, _) = g.step("take sword");
    assert!(out.contains("You take the elvish sword."));
    assert_eq!(g.world.objects["sword"].location, Location::Inventory);
    assert_eq!(g.world.carried_weight(), 7);
}

#[test]
fn dying_twice_keeps_counting_then_ends() {
    let config = EngineConfig {
        max_deaths: 2,
        ..EngineConfig::default()
    };
    let mut g = sample_game(config, 0.99);

    g.world.player.room = "living_room".to_string();
    g.step("take lamp");
    g.world.player.health = 0;
    let (out, _) = g.step("wait");
    assert!(out.contains("You have died."));

    let (out, _) = g.step("continue");
    assert!(out.contains("West of House"));
    assert_eq!(g.world.objects["lamp"].location, Location::Room("living_room".into()));
    assert_eq!(g.phase, Phase::Playing);

    g.world.player.health = 0;
    let (out, _) = g.step("wait");
    assert!(out.contains("Your adventure is over."));
    assert_eq!(g.phase, Phase::Over);
}
