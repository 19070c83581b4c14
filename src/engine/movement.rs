use rand::Rng;
use tracing::{debug, warn};

use crate::engine::npcs::movement_blocked_by_npc;
use crate::engine::output::{Failure, Output};
use crate::engine::puzzles::PuzzleRegistry;
use crate::engine::render::render_room;
use crate::world::{Direction, NavError, NpcKind, RoomFlags, RoomHook, Trigger, World};

const ECHO_FLAG: &str = "echo_quieted";

pub fn handle_move(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, direction: Direction) {
    if let Some(msg) = movement_blocked_by_npc(world, direction) {
        out.fail(Failure::Navigation, msg);
        return;
    }

    let (room_id, first_visit) = match world.move_player(direction) {
        Ok(arrival) => (arrival.room.id.clone(), arrival.first_visit),
        Err(NavError::NoExit(_)) => {
            out.fail(Failure::Navigation, "You can't go that way.");
            return;
        }
        Err(NavError::Locked(dir)) => {
            out.fail(Failure::Navigation, format!("The way {} is locked.", dir.name()));
            return;
        }
        Err(NavError::Missing(target)) => {
            warn!(room = %world.player.room, target = %target, "exit leads to a missing room");
            out.fail(Failure::Navigation, "That way leads nowhere.");
            return;
        }
    };

    render_room(out, world, first_visit);
    on_enter(out, world);
    puzzles.notify(out, world, &Trigger::action("enter", &room_id));
}

//////////////////
/// ROOM HOOKS ///
//////////////////

fn current_hook(world: &World) -> Option<RoomHook> {
    world.current_room().and_then(|r| r.hook)
}

fn on_enter(out: &mut Output, world: &mut World) {
    match current_hook(world) {
        Some(RoomHook::Forest) => out.event("You hear the distant chirping of a songbird."),
        Some(RoomHook::TreasureRoom) => defend_hideaway(out, world),
        Some(RoomHook::EchoRoom) if !world.flags.contains(ECHO_FLAG) => {
            out.event("The room is deafeningly loud with echoes.");
        }
        _ => {}
    }
}

/// A living thief rushes home when the player walks into the hideaway.
fn defend_hideaway(out: &mut Output, world: &mut World) {
    let here = world.player.room.clone();
    let Some(thief) = world
        .npcs
        .values_mut()
        .find(|n| n.kind == NpcKind::Thief && n.alive && n.room.as_deref() != Some(here.as_str()))
    else {
        return;
    };

    thief.room = Some(here.clone());
    thief.hostile = true;
    thief.set_flag("appeased", false);
    debug!(npc = %thief.id, room = %here, "thief defends hideaway");
    out.event(format!(
        "You hear a scream of anguish as you violate the hideaway. The {} rushes in to defend it!",
        thief.name
    ));
}

/// Per-turn ambience for the current room. Cosmetic only.
pub fn room_tick(out: &mut Output, world: &World) {
    if current_hook(world) == Some(RoomHook::Forest) && rand::thread_rng().gen_bool(0.1) {
        out.event("You hear in the distance the chirping of a song bird.");
    }
}

pub fn handle_listen(out: &mut Output, world: &World) {
    if current_hook(world) == Some(RoomHook::EchoRoom) {
        if world.flags.contains(ECHO_FLAG) {
            out.say("The room is eerily quiet.");
        } else {
            out.say("The echoes of your own breathing roar back at you.");
        }
        return;
    }
    if world.room_has_flag(&world.player.room, RoomFlags::SOUND) {
        out.say("You hear a faint rushing sound.");
    } else {
        out.say("You hear nothing unusual.");
    }
}

pub fn handle_say(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, words: &str) {
    let words = words.trim().trim_matches('"');

    if current_hook(world) == Some(RoomHook::EchoRoom) {
        if words.eq_ignore_ascii_case("echo") && !world.flags.contains(ECHO_FLAG) {
            world.flags.insert(ECHO_FLAG.to_string());
            out.say("The acoustics of the room change subtly.");
        } else {
            out.say(format!("{} {} {}...", words, words, words));
        }
    } else {
        out.say(format!("You say \"{}\". Nothing answers.", words));
    }
    puzzles.notify(out, world, &Trigger::phrase(&format!("say {}", words)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{CombatProfile, Npc, fallback_world};
    use std::collections::BTreeMap;

    fn troll_blocking_east(world: &mut World) {
        let room = world.player.room.clone();
        world.npcs.insert(
            "troll".into(),
            Npc {
                id: "troll".into(),
                name: "troll".into(),
                aliases: Vec::new(),
                description: String::new(),
                kind: NpcKind::Troll,
                hostile: true,
                alive: true,
                health: 3,
                max_health: 3,
                staggered: false,
                room: Some(room),
                combat: CombatProfile::for_kind(NpcKind::Troll),
                roam: None,
                lair: None,
                blocks: vec![Direction::East],
                state: BTreeMap::new(),
            },
        );
    }

    #[test]
    fn move_renders_destination() {
        let mut world = fallback_world();
        let mut out = Output::new();
        handle_move(&mut out, &mut world, &PuzzleRegistry::standard(), Direction::East);
        assert_eq!(world.player.room, "kitchen");
        assert!(out.contains("Kitchen"));
        assert!(!out.failed());
    }

    #[test]
    fn missing_exit_is_a_navigation_failure() {
        let mut world = fallback_world();
        let mut out = Output::new();
        handle_move(&mut out, &mut world, &PuzzleRegistry::standard(), Direction::Up);
        assert_eq!(out.failure, Some(Failure::Navigation));
        assert_eq!(world.player.room, "west_of_house");
    }

    #[test]
    fn hostile_npc_blocks_until_paid() {
        let mut world = fallback_world();
        troll_blocking_east(&mut world);
        let reg = PuzzleRegistry::standard();

        let mut out = Output::new();
        handle_move(&mut out, &mut world, &reg, Direction::East);
        assert!(out.contains("The troll blocks your way."));
        assert_eq!(world.player.room, "west_of_house");

        if let Some(troll) = world.npcs.get_mut("troll") {
            troll.set_flag("paid", true);
        }
        handle_move(&mut Output::new(), &mut world, &reg, Direction::East);
        assert_eq!(world.player.room, "kitchen");
    }

    #[test]
    fn echo_room_quiets_once() {
        let mut world = fallback_world();
        if let Some(room) = world.rooms.get_mut("kitchen") {
            room.hook = Some(RoomHook::EchoRoom);
        }
        world.player.room = "kitchen".into();
        let reg = PuzzleRegistry::standard();

        let mut out = Output::new();
        handle_say(&mut out, &mut world, &reg, "echo");
        assert!(out.contains("The acoustics of the room change subtly."));

        let mut out = Output::new();
        handle_listen(&mut out, &world);
        assert!(out.contains("eerily quiet"));
    }
}
