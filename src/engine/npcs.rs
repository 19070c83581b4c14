use tracing::{debug, info, warn};

use crate::engine::combat::Dice;
use crate::engine::output::{Failure, Output};
use crate::engine::puzzles::PuzzleRegistry;
use crate::world::{Direction, Found, GameObject, Location, Npc, NpcKind, RoomFlags, Scope, Trigger, World};

/// Non-combat verbs an NPC can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Talk,
    Give,
    Bribe,
    Take,
    Tie,
    Poke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Refuse,
    /// The NPC keeps the item.
    Keep,
    /// The item is used up (eaten).
    Consume,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub text: String,
    pub accept: Acceptance,
    /// The NPC leaves for its lair (or vanishes).
    pub flee: bool,
    pub puzzle: Option<Trigger>,
}

impl Reaction {
    fn say(text: impl Into<String>) -> Self {
        Reaction {
            text: text.into(),
            accept: Acceptance::Refuse,
            flee: false,
            puzzle: None,
        }
    }

    fn accept(mut self, accept: Acceptance) -> Self {
        self.accept = accept;
        self
    }

    fn fleeing(mut self) -> Self {
        self.flee = true;
        self
    }

    fn solves(mut self, verb: &str, npc: &Npc) -> Self {
        self.puzzle = Some(Trigger::action(verb, &npc.id));
        self
    }
}

/// Per-kind reaction table. Combat verbs never come through here.
pub trait NpcBehavior {
    fn interact(&self, npc: &mut Npc, verb: Verb, item: Option<&GameObject>) -> Reaction;
}

struct Troll;
struct Thief;
struct Cyclops;
struct Villager;

pub fn behavior_for(kind: NpcKind) -> &'static dyn NpcBehavior {
    match kind {
        NpcKind::Troll => &Troll,
        NpcKind::Thief => &Thief,
        NpcKind::Cyclops => &Cyclops,
        NpcKind::Villager => &Villager,
    }
}

fn name_has(item: &GameObject, words: &[&str]) -> bool {
    let hay = std::iter::once(&item.name)
        .chain(item.aliases.iter())
        .map(|s| s.to_lowercase())
        .collect::<Vec<_>>();
    words.iter().any(|w| hay.iter().any(|h| h.contains(w)))
}

fn coin_like(item: &GameObject) -> bool {
    name_has(item, &["coin", "gold", "money"])
}

fn treasure_like(item: &GameObject) -> bool {
    item.attrs.treasure || name_has(item, &["jewel", "gold", "egg", "diamond", "coin", "treasure", "silver"])
}

impl NpcBehavior for Troll {
    fn interact(&self, npc: &mut Npc, verb: Verb, item: Option<&GameObject>) -> Reaction {
        match (verb, item) {
            (Verb::Talk, _) if npc.flag("paid") => Reaction::say("The troll grunts and waves you across the bridge."),
            (Verb::Talk, _) => Reaction::say("The troll growls at you, showing a mouthful of yellow teeth."),
            (Verb::Give | Verb::Bribe, Some(it)) if coin_like(it) => {
                npc.set_flag("paid", true);
                npc.hostile = false;
                Reaction::say(format!("The troll bites the {}, pockets it, and steps aside with a grunt.", it.name))
                    .accept(Acceptance::Keep)
                    .solves("pay", npc)
            }
            (Verb::Give | Verb::Bribe, Some(it)) if it.attrs.edible => {
                Reaction::say(format!("The troll gobbles the {} but keeps glaring at you.", it.name))
                    .accept(Acceptance::Consume)
            }
            (Verb::Give | Verb::Bribe, Some(it)) => Reaction::say(format!(
                "The troll sniffs the {} and shoves it back at you.",
                it.name
            )),
            (Verb::Take, _) => Reaction::say("The troll laughs at your puny attempt."),
            _ => Reaction::say("The troll growls angrily."),
        }
    }
}

impl NpcBehavior for Thief {
    fn interact(&self, npc: &mut Npc, verb: Verb, item: Option<&GameObject>) -> Reaction {
        match (verb, item) {
            (Verb::Talk, _) => Reaction::say("The thief eyes your possessions and says nothing."),
            (Verb::Give | Verb::Bribe, Some(it)) if treasure_like(it) => {
                npc.set_flag("appeased", true);
                npc.hostile = false;
                Reaction::say(format!(
                    "The thief snatches the {}, bows with a flourish, and slips away into the shadows.",
                    it.name
                ))
                .accept(Acceptance::Keep)
                .fleeing()
                .solves("appease", npc)
            }
            (Verb::Give | Verb::Bribe, Some(it)) => Reaction::say(format!(
                "The thief examines the {} with disdain and hands it back.",
                it.name
            )),
            (Verb::Take, _) => Reaction::say("The thief deftly sidesteps you."),
            _ => Reaction::say("The thief glares at you, one hand on a stiletto."),
        }
    }
}

impl NpcBehavior for Cyclops {
    fn interact(&self, npc: &mut Npc, verb: Verb, item: Option<&GameObject>) -> Reaction {
        let asleep = npc.flag("asleep");
        match (verb, item) {
            (Verb::Talk, _) if asleep => Reaction::say("The cyclops snores loudly."),
            (Verb::Talk, _) => Reaction::say("The cyclops looks at you and licks its lips hungrily."),
            (Verb::Give | Verb::Bribe, Some(_)) if asleep => Reaction::say("The cyclops is fast asleep."),
            (Verb::Give | Verb::Bribe, Some(it)) if it.attrs.edible => {
                npc.set_flag("asleep", true);
                npc.hostile = false;
                Reaction::say(format!(
                    "The cyclops devours the {}, yawns enormously, and falls fast asleep.",
                    it.name
                ))
                .accept(Acceptance::Consume)
                .solves("feed", npc)
            }
            (Verb::Give | Verb::Bribe, Some(it)) => {
                Reaction::say(format!("The cyclops is not interested in the {}.", it.name))
            }
            (Verb::Poke, _) if asleep => {
                npc.set_flag("asleep", false);
                npc.hostile = true;
                Reaction::say("The cyclops wakes with a roar!")
            }
            (Verb::Poke, _) => Reaction::say("The cyclops swats your hand away."),
            (Verb::Tie, _) => Reaction::say("You can't tie up something that big."),
            _ => Reaction::say("The cyclops doesn't take kindly to being grabbed."),
        }
    }
}

impl NpcBehavior for Villager {
    fn interact(&self, npc: &mut Npc, verb: Verb, item: Option<&GameObject>) -> Reaction {
        match (verb, item) {
            (Verb::Talk, _) => Reaction::say(format!("The {} greets you warmly.", npc.name)),
            (Verb::Give | Verb::Bribe, Some(it)) => {
                Reaction::say(format!("The {} thanks you politely for the {}.", npc.name, it.name))
                    .accept(Acceptance::Keep)
            }
            _ => Reaction::say(format!("The {} steps back, offended.", npc.name)),
        }
    }
}

/// Resolve a name to an NPC in the player's room.
pub(crate) fn find_npc(world: &World, name: &str) -> Result<String, String> {
    match world.find_entity(name, Scope::ROOM) {
        Found::Npc(id) => Ok(id),
        Found::Ambiguous(_) => Err("Be more specific.".to_string()),
        _ => Err(format!("You don't see any {} here.", name)),
    }
}

/// Run one interaction and apply its consequences: item transfer, fleeing, puzzle.
pub fn handle_interaction(
    out: &mut Output,
    world: &mut World,
    puzzles: &PuzzleRegistry,
    npc_id: &str,
    verb: Verb,
    item_id: Option<&str>,
) {
    let here = world.player.room.clone();
    let reaction = {
        let item = item_id.and_then(|id| world.objects.get(id));
        let Some(npc) = world.npcs.get_mut(npc_id) else {
            return;
        };
        behavior_for(npc.kind).interact(npc, verb, item)
    };

    out.say(reaction.text.clone());

    if let Some(id) = item_id {
        let to = match reaction.accept {
            Acceptance::Keep => Some(Location::Held(npc_id.to_string())),
            Acceptance::Consume => Some(Location::Nowhere),
            Acceptance::Refuse => None,
        };
        if let Some(to) = to {
            if let Err(e) = world.transfer_object(id, &Location::Inventory, to) {
                warn!(npc = npc_id, object = id, error = ?e, "accepted item could not change hands");
            }
        }
    }

    if reaction.flee {
        if let Some(npc) = world.npcs.get_mut(npc_id) {
            npc.room = npc.lair.clone().filter(|lair| lair != &here);
            debug!(npc = npc_id, to = ?npc.room, "npc fled");
        }
    }

    if let Some(trigger) = reaction.puzzle {
        puzzles.notify(out, world, &trigger);
    }
}

pub fn handle_talk(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, target: &str) {
    match world.find_entity(target, Scope::VISIBLE) {
        Found::Npc(id) => handle_interaction(out, world, puzzles, &id, Verb::Talk, None),
        Found::Object(id) => {
            let name = world.objects.get(&id).map(|o| o.name.clone()).unwrap_or_default();
            out.say(format!("The {} has nothing to say.", name));
        }
        Found::Ambiguous(_) => out.fail(Failure::Resolution, "Be more specific."),
        Found::Nothing => out.fail(Failure::Resolution, format!("You don't see any {} here.", target)),
    }
}

/// give / bribe with both sides named.
pub fn handle_give(
    out: &mut Output,
    world: &mut World,
    puzzles: &PuzzleRegistry,
    item_name: &str,
    npc_name: &str,
    bribe: bool,
) {
    let item_id = match world.find_entity(item_name, Scope::INVENTORY) {
        Found::Object(id) => id,
        Found::Ambiguous(_) => {
            out.fail(Failure::Resolution, "Be more specific.");
            return;
        }
        _ => {
            out.fail(Failure::Resolution, format!("You don't have the {}.", item_name));
            return;
        }
    };

    let npc_id = match find_npc(world, npc_name) {
        Ok(id) => id,
        Err(msg) => {
            out.fail(Failure::Resolution, msg);
            return;
        }
    };

    let verb = if bribe { Verb::Bribe } else { Verb::Give };
    handle_interaction(out, world, puzzles, &npc_id, verb, Some(&item_id));
}

/// `give troll coin`: try every split of the words, either way round.
pub fn handle_offer(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, words: &str, bribe: bool) {
    let parts: Vec<&str> = words.split_whitespace().collect();

    for i in 1..parts.len() {
        let left = parts[..i].join(" ");
        let right = parts[i..].join(" ");
        for (item, npc) in [(&left, &right), (&right, &left)] {
            let item_ok = matches!(world.find_entity(item, Scope::INVENTORY), Found::Object(_));
            let npc_ok = matches!(world.find_entity(npc, Scope::ROOM), Found::Npc(_));
            if item_ok && npc_ok {
                handle_give(out, world, puzzles, item, npc, bribe);
                return;
            }
        }
    }

    out.fail(Failure::Resolution, "I don't understand who you want to give that to.");
}

pub fn describe_npc(out: &mut Output, world: &World, npc: &Npc) {
    if npc.description.trim().is_empty() {
        out.say(format!("You see nothing special about the {}.", npc.name));
    } else {
        out.say(npc.description.clone());
    }
    if npc.flag("asleep") {
        out.say(format!("The {} is asleep.", npc.name));
    }

    // List visible items held by this NPC.
    let held: Vec<&str> = world
        .held_by(&npc.id)
        .into_iter()
        .filter(|o| o.attrs.visible)
        .map(|o| o.name.as_str())
        .collect();
    if !held.is_empty() {
        out.say(format!("The {} is holding: {}.", npc.name, held.join(", ")));
    }
}

/// A hostile NPC standing guard over `direction`, if any.
pub fn movement_blocked_by_npc(world: &World, direction: Direction) -> Option<String> {
    world
        .npcs_in(&world.player.room)
        .into_iter()
        .find(|npc| npc.hostile && !npc.flag("paid") && !npc.flag("asleep") && npc.blocks.contains(&direction))
        .map(|npc| format!("The {} blocks your way.", npc.name))
}

fn room_is_safe(world: &World, room_id: &str) -> bool {
    world.rooms.contains_key(room_id)
        && !world.room_has_flag(room_id, RoomFlags::DARK)
        && !world.room_has_flag(room_id, RoomFlags::LOCKED)
}

/// Per-turn tick for mobile NPCs: wander, turn up near the player, steal.
pub fn roam_npcs(out: &mut Output, world: &mut World, dice: &mut dyn Dice) {
    let here = world.player.room.clone();
    let mobile: Vec<String> = world
        .npcs
        .values()
        .filter(|n| n.alive && n.roam.is_some() && !n.flag("appeased") && !n.flag("asleep"))
        .map(|n| n.id.clone())
        .collect();

    for npc_id in mobile {
        let Some(npc) = world.npcs.get(&npc_id) else {
            continue;
        };
        let Some(roam) = npc.roam.clone() else {
            continue;
        };
        let name = npc.name.clone();
        let lair = npc.lair.clone();

        if npc.room.as_deref() == Some(here.as_str()) {
            if dice.roll() < roam.steal_chance {
                try_steal(out, world, &npc_id, &name, lair, &here);
            }
            continue;
        }

        if dice.roll() < roam.appear_chance && room_is_safe(world, &here) {
            if let Some(npc) = world.npcs.get_mut(&npc_id) {
                npc.room = Some(here.clone());
            }
            out.event(format!("The {} slips quietly into the room.", name));
            debug!(npc = %npc_id, room = %here, "npc appeared");
            continue;
        }

        let options: Vec<String> = if roam.allowed_rooms.is_empty() {
            world.rooms.keys().cloned().collect()
        } else {
            roam.allowed_rooms.clone()
        };
        let options: Vec<String> = options.into_iter().filter(|r| r != &here && room_is_safe(world, r)).collect();
        if options.is_empty() {
            continue;
        }
        let idx = ((dice.roll() * options.len() as f64) as usize).min(options.len() - 1);
        if let Some(npc) = world.npcs.get_mut(&npc_id) {
            npc.room = Some(options[idx].clone());
            debug!(npc = %npc_id, room = %options[idx], "npc wandered");
        }
    }
}

fn try_steal(out: &mut Output, world: &mut World, npc_id: &str, name: &str, lair: Option<String>, here: &str) {
    let loot = world
        .inventory()
        .into_iter()
        .find(|o| treasure_like(o) && !o.attrs.sacred)
        .map(|o| (o.id.clone(), o.name.clone()));

    let Some((loot_id, loot_name)) = loot else {
        return;
    };
    if world
        .transfer_object(&loot_id, &Location::Inventory, Location::Held(npc_id.to_string()))
        .is_err()
    {
        return;
    }
    if let Some(npc) = world.npcs.get_mut(npc_id) {
        npc.room = lair.filter(|l| l != here);
    }
    out.event(format!("The {} snatches your {} and vanishes into the gloom!", name, loot_name));
    info!(npc = npc_id, object = %loot_id, "npc stole an item");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::combat::ScriptedDice;
    use crate::world::{CombatProfile, NpcRoam, ObjectAttrs, ObjectKind, fallback_world};
    use std::collections::BTreeMap;

    fn npc(id: &str, kind: NpcKind, room: &str) -> Npc {
        Npc {
            id: id.into(),
            name: id.into(),
            aliases: Vec::new(),
            description: String::new(),
            kind,
            hostile: true,
            alive: true,
            health: 3,
            max_health: 3,
            staggered: false,
            room: Some(room.into()),
            combat: CombatProfile::for_kind(kind),
            roam: None,
            lair: None,
            blocks: vec![Direction::East],
            state: BTreeMap::new(),
        }
    }

    fn carried(id: &str, attrs: ObjectAttrs) -> GameObject {
        GameObject {
            id: id.into(),
            name: id.into(),
            aliases: Vec::new(),
            description: String::new(),
            text: None,
            kind: ObjectKind::Simple,
            attrs,
            location: Location::Inventory,
        }
    }

    #[test]
    fn troll_takes_coins_and_stops_blocking() {
        let mut world = fallback_world();
        let here = world.player.room.clone();
        world.npcs.insert("troll".into(), npc("troll", NpcKind::Troll, &here));
        world.objects.insert("coin".into(), carried("coin", ObjectAttrs::default()));
        world.objects.insert("rock".into(), carried("rock", ObjectAttrs::default()));
        let reg = PuzzleRegistry::standard();

        assert!(movement_blocked_by_npc(&world, Direction::East).is_some());

        let mut out = Output::new();
        handle_give(&mut out, &mut world, &reg, "rock", "troll", false);
        assert_eq!(world.objects["rock"].location, Location::Inventory);

        let mut out = Output::new();
        handle_offer(&mut out, &mut world, &reg, "troll coin", true);
        assert_eq!(world.objects["coin"].location, Location::Held("troll".into()));
        assert_eq!(out.score_delta, 5);
        assert!(movement_blocked_by_npc(&world, Direction::East).is_none());
    }

    #[test]
    fn cyclops_eats_and_sleeps() {
        let mut world = fallback_world();
        let here = world.player.room.clone();
        world.npcs.insert("cyclops".into(), npc("cyclops", NpcKind::Cyclops, &here));
        world.objects.insert(
            "lunch".into(),
            carried(
                "lunch",
                ObjectAttrs {
                    edible: true,
                    ..Default::default()
                },
            ),
        );
        let reg = PuzzleRegistry::standard();

        let mut out = Output::new();
        handle_give(&mut out, &mut world, &reg, "lunch", "cyclops", false);
        assert_eq!(world.objects["lunch"].location, Location::Nowhere);
        assert!(world.npcs["cyclops"].flag("asleep"));
        assert!(!world.npcs["cyclops"].hostile);
    }

    #[test]
    fn thief_flees_with_treasure() {
        let mut world = fallback_world();
        let here = world.player.room.clone();
        let mut thief = npc("thief", NpcKind::Thief, &here);
        thief.lair = Some("kitchen".into());
        world.npcs.insert("thief".into(), thief);
        world.objects.insert(
            "egg".into(),
            carried(
                "egg",
                ObjectAttrs {
                    treasure: true,
                    ..Default::default()
                },
            ),
        );

        let mut out = Output::new();
        handle_give(&mut out, &mut world, &PuzzleRegistry::standard(), "egg", "thief", false);
        assert_eq!(world.npcs["thief"].room.as_deref(), Some("kitchen"));
        assert_eq!(world.objects["egg"].location, Location::Held("thief".into()));
    }

    #[test]
    fn roaming_thief_appears_then_steals() {
        let mut world = fallback_world();
        let mut thief = npc("thief", NpcKind::Thief, "kitchen");
        thief.roam = Some(NpcRoam {
            allowed_rooms: vec!["kitchen".into()],
            appear_chance: 0.5,
            steal_chance: 0.5,
        });
        world.npcs.insert("thief".into(), thief);
        world.objects.insert(
            "jewel".into(),
            carried(
                "jewel",
                ObjectAttrs {
                    treasure: true,
                    ..Default::default()
                },
            ),
        );

        let mut dice = ScriptedDice::new([0.1, 0.1]);
        let mut out = Output::new();
        roam_npcs(&mut out, &mut world, &mut dice);
        assert_eq!(world.npcs["thief"].room.as_deref(), Some("west_of_house"));

        roam_npcs(&mut out, &mut world, &mut dice);
        assert_eq!(world.objects["jewel"].location, Location::Held("thief".into()));
        assert_eq!(world.npcs["thief"].room, None);
        assert!(out.contains("snatches your jewel"));
    }
}
