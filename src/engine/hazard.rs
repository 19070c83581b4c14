use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::engine::output::Output;
use crate::world::World;

pub const GRUE_WARNING: &str = "It is pitch dark. You are likely to be eaten by a grue.";
pub const GRUE_DEATH: &str = "Oh no! You have walked into the slavering fangs of a lurking grue!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hazard {
    Safe,
    Warned,
    Killed,
}

/// Run once per turn-consuming command, after the command's own effects.
pub fn check_darkness(out: &mut Output, world: &mut World, cfg: &EngineConfig) -> Hazard {
    if !world.is_dark() {
        if world.dark_turns > 0 {
            debug!("left the dark, grue counter reset");
        }
        world.dark_turns = 0;
        return Hazard::Safe;
    }

    world.dark_turns += 1;
    debug!(dark_turns = world.dark_turns, "turn spent in the dark");

    if world.dark_turns >= cfg.dark_death_turns {
        out.event(GRUE_DEATH);
        world.player.health = 0;
        info!(room = %world.player.room, "player eaten by a grue");
        return Hazard::Killed;
    }
    if world.dark_turns >= cfg.dark_warn_turns {
        out.event(GRUE_WARNING);
        return Hazard::Warned;
    }
    Hazard::Safe
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Location, RoomFlags, fallback_world};

    fn dark_kitchen() -> World {
        let mut world = fallback_world();
        world.set_room_flag("kitchen", RoomFlags::DARK);
        world.player.room = "kitchen".into();
        world
    }

    fn cfg(death: u32) -> EngineConfig {
        EngineConfig {
            dark_death_turns: death,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn second_dark_turn_kills_at_threshold_two() {
        let mut world = dark_kitchen();
        let cfg = cfg(2);

        let mut out = Output::new();
        assert_eq!(check_darkness(&mut out, &mut world, &cfg), Hazard::Warned);
        assert!(out.contains("grue"));

        let mut out = Output::new();
        assert_eq!(check_darkness(&mut out, &mut world, &cfg), Hazard::Killed);
        assert!(out.contains("slavering fangs"));
    }

    #[test]
    fn lit_lamp_resets_the_counter() {
        let mut world = dark_kitchen();
        let cfg = cfg(2);
        let mut out = Output::new();
        check_darkness(&mut out, &mut world, &cfg);
        assert_eq!(world.dark_turns, 1);

        let lamp = crate::world::GameObject {
            id: "lamp".into(),
            name: "lamp".into(),
            aliases: Vec::new(),
            description: String::new(),
            text: None,
            kind: crate::world::ObjectKind::Simple,
            attrs: crate::world::ObjectAttrs {
                light: true,
                lit: true,
                ..Default::default()
            },
            location: Location::Inventory,
        };
        world.objects.insert("lamp".into(), lamp);

        for _ in 0..5 {
            assert_eq!(check_darkness(&mut out, &mut world, &cfg), Hazard::Safe);
        }
        assert_eq!(world.dark_turns, 0);
    }

    #[test]
    fn lit_rooms_never_count() {
        let mut world = fallback_world();
        let mut out = Output::new();
        assert_eq!(check_darkness(&mut out, &mut world, &cfg(1)), Hazard::Safe);
        assert!(out.blocks.is_empty());
    }
}
