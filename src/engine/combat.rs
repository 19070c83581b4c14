//! One attack exchange between the player and an NPC.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::engine::output::Output;
use crate::world::{CombatProfile, Location, World};

/// Source of mechanical randomness: every roll is uniform in [0, 1).
pub trait Dice {
    fn roll(&mut self) -> f64;
}

pub struct SeededDice {
    rng: ChaCha8Rng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        SeededDice {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Dice for SeededDice {
    fn roll(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

/// Replays a fixed sequence, then keeps returning `fallback`.
pub struct ScriptedDice {
    rolls: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = f64>) -> Self {
        ScriptedDice {
            rolls: rolls.into_iter().collect(),
            fallback: 0.99,
        }
    }

    /// The same value forever.
    pub fn constant(value: f64) -> Self {
        ScriptedDice {
            rolls: VecDeque::new(),
            fallback: value,
        }
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self) -> f64 {
        self.rolls.pop_front().unwrap_or(self.fallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blow {
    Kill,
    Wound,
    Stagger,
    Miss,
}

pub fn resolve_roll(r: f64, profile: &CombatProfile) -> Blow {
    if r < profile.critical {
        Blow::Kill
    } else if r < profile.wound {
        Blow::Wound
    } else if r < profile.stagger {
        Blow::Stagger
    } else {
        Blow::Miss
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    NpcDefeated,
    PlayerDefeated,
    Continues,
}

/// Player swings first; a surviving, steady NPC swings back.
pub fn combat_round(
    out: &mut Output,
    world: &mut World,
    npc_id: &str,
    weapon: Option<&str>,
    dice: &mut dyn Dice,
) -> Exchange {
    let room_id = world.player.room.clone();
    let Some(npc) = world.npcs.get_mut(npc_id) else {
        return Exchange::Continues;
    };
    let name = npc.name.clone();
    let profile = npc.combat;
    npc.hostile = true;

    // player swings
    if world.player.staggered {
        world.player.staggered = false;
        out.say("You are still reeling and cannot attack.");
    } else {
        if let Some(w) = weapon {
            out.say(format!("You swing the {} at the {}.", w, name));
        }
        match resolve_roll(dice.roll(), &profile) {
            Blow::Kill => npc.health = 0,
            Blow::Wound => {
                npc.health -= 1;
                if npc.health > 0 {
                    out.say(format!("You wound the {}! (Health: {})", name, npc.health));
                }
            }
            Blow::Stagger => {
                npc.staggered = true;
                out.say(format!("You stagger the {}!", name));
            }
            Blow::Miss => out.say(format!("You miss! The {} dodges.", name)),
        }
    }

    if npc.health <= 0 || !npc.alive {
        npc.health = 0;
        npc.alive = false;
        npc.hostile = false;
        npc.staggered = false;
        npc.room = None;
        out.say(format!("You kill the {}!", name));
        info!(npc = npc_id, "npc defeated");

        let dropped: Vec<String> = world.held_by(npc_id).iter().map(|o| o.id.clone()).collect();
        let mut names = Vec::new();
        for id in dropped {
            let from = Location::Held(npc_id.to_string());
            if world.transfer_object(&id, &from, Location::Room(room_id.clone())).is_ok() {
                if let Some(o) = world.objects.get(&id) {
                    names.push(o.name.clone());
                }
            }
        }
        if !names.is_empty() {
            out.say(format!("The {}'s belongings fall to the ground: {}.", name, names.join(", ")));
        }
        return Exchange::NpcDefeated;
    }

    // npc swings back
    if npc.staggered {
        npc.staggered = false;
        out.say(format!("The {} slowly regains its footing.", name));
        return Exchange::Continues;
    }

    let player = &mut world.player;
    match resolve_roll(dice.roll(), &profile) {
        Blow::Kill => player.health = 0,
        Blow::Wound => {
            player.health -= 1;
            if player.health > 0 {
                out.say(format!("The {} wounds you! (Health: {})", name, player.health));
            }
        }
        Blow::Stagger => {
            player.staggered = true;
            out.say(format!("The {} staggers you!", name));
        }
        Blow::Miss => out.say(format!("The {} misses you.", name)),
    }

    if player.health <= 0 {
        player.health = 0;
        out.say(format!("The {} kills you!", name));
        info!(npc = npc_id, "player killed in combat");
        return Exchange::PlayerDefeated;
    }

    Exchange::Continues
}
