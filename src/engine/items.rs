use rand::seq::SliceRandom;
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::npcs::{self, Verb};
use crate::engine::output::{Failure, Output};
use crate::engine::parser::Prep;
use crate::engine::puzzles::PuzzleRegistry;
use crate::engine::render::{list_contents, render_room};
use crate::world::{Direction, Found, GameObject, Location, LockError, Mode, ObjectKind, Scope, Trigger, World};

const REFUSALS: &[&str] = &["A valiant attempt.", "You can't be serious.", "Not a chance.", "You must be joking."];

/// Resolve `name` within `scope`, narrating the miss or the ambiguity.
pub(crate) fn resolve(out: &mut Output, world: &World, name: &str, scope: Scope) -> Option<Found> {
    match world.find_entity(name, scope) {
        Found::Nothing => {
            out.fail(Failure::Resolution, format!("You don't see any {} here.", name));
            None
        }
        Found::Ambiguous(_) => {
            out.fail(Failure::Resolution, "Be more specific.");
            None
        }
        found => Some(found),
    }
}

/// Resolve to an object only; NPCs get `npc_msg`.
fn resolve_object(out: &mut Output, world: &World, name: &str, scope: Scope, npc_msg: &str) -> Option<String> {
    match resolve(out, world, name, scope)? {
        Found::Object(id) => Some(id),
        Found::Npc(id) => {
            let npc_name = world.npcs.get(&id).map(|n| n.name.as_str()).unwrap_or(name);
            out.fail(Failure::Resolution, npc_msg.replace("{}", npc_name));
            None
        }
        _ => None,
    }
}

fn name_of(world: &World, id: &str) -> String {
    world.objects.get(id).map(|o| o.name.clone()).unwrap_or_default()
}

/// Best match for `query` among `candidates`: exact name/alias first, then word overlap.
fn match_among<'a>(candidates: &[&'a GameObject], query: &str) -> Option<&'a GameObject> {
    if let Some(exact) = candidates.iter().find(|o| o.matches_name(query)) {
        return Some(*exact);
    }
    let words: Vec<&str> = query.split_whitespace().collect();
    let mut scored: Vec<(&GameObject, usize)> = candidates
        .iter()
        .map(|o| {
            let mut all: Vec<String> = o.name.split_whitespace().map(|w| w.to_lowercase()).collect();
            for alias in &o.aliases {
                all.extend(alias.split_whitespace().map(|w| w.to_lowercase()));
            }
            (*o, words.iter().filter(|w| all.iter().any(|a| a == *w)).count())
        })
        .filter(|(_, s)| *s > 0)
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    match scored.as_slice() {
        [(best, s), rest @ ..] if rest.first().is_none_or(|(_, s2)| s2 < s) => Some(*best),
        _ => None,
    }
}

/////////////////
/// INVENTORY ///
/////////////////

pub fn handle_inventory(out: &mut Output, world: &World) {
    let carried = world.inventory();
    if carried.is_empty() {
        out.say("You are carrying nothing.");
        return;
    }

    out.say("You are carrying:");
    for obj in carried {
        let mut line = format!("  {}", obj.name);
        if obj.attrs.lit {
            line.push_str(" (providing light)");
        } else if obj.attrs.burning {
            line.push_str(" (burning)");
        }
        out.say(line);
        if obj.is_accessible() {
            for inner in world.contents(&obj.id) {
                out.say(format!("    {}", inner.name));
            }
        }
    }
}

////////////
/// TAKE ///
////////////

/// Why an object can't be picked up right now, if it can't.
fn take_refusal(world: &World, obj: &GameObject, cfg: &EngineConfig) -> Option<(Failure, String)> {
    if obj.location == Location::Inventory {
        return Some((Failure::Resolution, "You already have that.".to_string()));
    }
    if obj.attrs.sacred {
        return Some((
            Failure::Resolution,
            format!("An invisible force prevents you from taking the {}.", obj.name),
        ));
    }
    if obj.attrs.dangerous {
        return Some((Failure::Resolution, format!("The {} is too dangerous to touch.", obj.name)));
    }
    if obj.attrs.collective || obj.attrs.bunch {
        return Some((Failure::Resolution, format!("You can't take the {} as a whole.", obj.name)));
    }
    if !obj.can_be_taken() {
        let line = REFUSALS.choose(&mut rand::thread_rng()).copied().unwrap_or(REFUSALS[0]);
        return Some((Failure::Resolution, line.to_string()));
    }

    let already = if world.is_carried(&obj.id) { 0 } else { world.weight_with_contents(&obj.id) };
    if world.mode != Mode::Demo && world.carried_weight() + already > cfg.carry_limit {
        return Some((Failure::Resource, format!("Your load is too heavy to take the {}.", obj.name)));
    }
    None
}

/// Move an object into the inventory; first pickup of a treasure scores.
fn do_take(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, id: &str) {
    let Some(from) = world.objects.get(id).map(|o| o.location.clone()) else {
        return;
    };
    if world.transfer_object(id, &from, Location::Inventory).is_err() {
        return;
    }

    let mut reward = 0;
    if let Some(obj) = world.objects.get_mut(id) {
        out.say(format!("You take the {}.", obj.name));
        if !obj.attrs.touched {
            obj.attrs.touched = true;
            if obj.attrs.treasure {
                reward = obj.attrs.score_value;
            }
        }
    }
    if reward != 0 {
        out.scored(world.award(reward));
    }
    puzzles.notify(out, world, &Trigger::action("take", id));
}

pub fn handle_take(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, cfg: &EngineConfig, name: &str) {
    let id = match resolve(out, world, name, Scope::REACHABLE) {
        Some(Found::Object(id)) => id,
        Some(Found::Npc(npc_id)) => {
            npcs::handle_interaction(out, world, puzzles, &npc_id, Verb::Take, None);
            return;
        }
        _ => return,
    };

    let Some(obj) = world.objects.get(&id) else {
        return;
    };
    if let Some((kind, msg)) = take_refusal(world, obj, cfg) {
        out.fail(kind, msg);
        return;
    }
    do_take(out, world, puzzles, &id);
}

fn take_each(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, cfg: &EngineConfig, ids: Vec<String>) {
    if ids.is_empty() {
        out.fail(Failure::Resolution, "There is nothing here you can take.");
        return;
    }

    let mut taken = 0;
    let mut heavy = false;
    for id in ids {
        let Some(obj) = world.objects.get(&id) else {
            continue;
        };
        match take_refusal(world, obj, cfg) {
            None => {
                do_take(out, world, puzzles, &id);
                taken += 1;
            }
            Some((Failure::Resource, msg)) => {
                heavy = true;
                out.say(msg);
            }
            Some(_) => {}
        }
    }

    if taken == 0 {
        if heavy {
            out.failure = Some(Failure::Resource);
        } else {
            out.fail(Failure::Resolution, "There is nothing here you can take.");
        }
    }
}

pub fn handle_take_all(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, cfg: &EngineConfig) {
    if world.is_dark() {
        out.fail(Failure::Resolution, "It's too dark to see what's here.");
        return;
    }
    let room = world.player.room.clone();
    let ids: Vec<String> = world
        .objects_in(&room)
        .into_iter()
        .filter(|o| o.attrs.visible && o.can_be_taken())
        .map(|o| o.id.clone())
        .collect();
    take_each(out, world, puzzles, cfg, ids);
}

pub fn handle_take_from(
    out: &mut Output,
    world: &mut World,
    puzzles: &PuzzleRegistry,
    cfg: &EngineConfig,
    item: &str,
    container: &str,
) {
    let Some(cid) = resolve_object(out, world, container, Scope::REACHABLE, "You can't take things from the {}.")
    else {
        return;
    };
    let Some(holder) = world.objects.get(&cid) else {
        return;
    };
    if !holder.is_container() {
        out.fail(Failure::Resolution, format!("You can't take things out of the {}.", holder.name));
        return;
    }
    if !holder.is_surface() && !holder.attrs.open {
        out.fail(Failure::Resolution, format!("The {} is closed.", holder.name));
        return;
    }

    let inside: Vec<&GameObject> = world.contents(&cid).into_iter().filter(|o| o.attrs.visible).collect();
    if item == "all" || item == "everything" {
        let ids = inside.iter().map(|o| o.id.clone()).collect();
        take_each(out, world, puzzles, cfg, ids);
        return;
    }

    let Some(found) = match_among(&inside, item) else {
        out.fail(Failure::Resolution, format!("There is no {} in the {}.", item, holder.name));
        return;
    };
    let id = found.id.clone();
    if let Some((kind, msg)) = take_refusal(world, found, cfg) {
        out.fail(kind, msg);
        return;
    }
    do_take(out, world, puzzles, &id);
}

////////////
/// DROP ///
////////////

pub fn handle_drop(out: &mut Output, world: &mut World, name: &str) {
    let id = match world.find_entity(name, Scope::INVENTORY) {
        Found::Object(id) => id,
        Found::Ambiguous(_) => {
            out.fail(Failure::Resolution, "Be more specific.");
            return;
        }
        _ => {
            out.fail(Failure::Resolution, "You aren't carrying that.");
            return;
        }
    };

    let room = world.player.room.clone();
    if world.transfer_object(&id, &Location::Inventory, Location::Room(room)).is_ok() {
        out.say(format!("You drop the {}.", name_of(world, &id)));
    }
}

pub fn handle_drop_all(out: &mut Output, world: &mut World) {
    let ids: Vec<String> = world.inventory().into_iter().map(|o| o.id.clone()).collect();
    if ids.is_empty() {
        out.fail(Failure::Resolution, "You aren't carrying anything you can drop.");
        return;
    }

    let room = world.player.room.clone();
    for id in ids {
        if world
            .transfer_object(&id, &Location::Inventory, Location::Room(room.clone()))
            .is_ok()
        {
            out.say(format!("You drop the {}.", name_of(world, &id)));
        }
    }
}

///////////
/// PUT ///
///////////

pub fn handle_put(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, item: &str, container: &str, prep: Prep) {
    let item_id = match world.find_entity(item, Scope::INVENTORY) {
        Found::Object(id) => id,
        Found::Ambiguous(_) => {
            out.fail(Failure::Resolution, "Be more specific.");
            return;
        }
        _ => {
            out.fail(Failure::Resolution, format!("You don't have the {}.", item));
            return;
        }
    };

    let Some(cid) = resolve_object(out, world, container, Scope::VISIBLE, "You can't put things in the {}.") else {
        return;
    };
    let Some(target) = world.objects.get(&cid) else {
        return;
    };
    let tname = target.name.clone();

    let capacity = match &target.kind {
        ObjectKind::Container(props) => props.capacity,
        ObjectKind::Simple => {
            out.fail(Failure::Resolution, format!("You can't put things in the {}.", tname));
            return;
        }
    };
    match prep {
        Prep::On if !target.is_surface() => {
            out.fail(Failure::Resolution, format!("You can't put things on the {}.", tname));
            return;
        }
        Prep::In if target.is_surface() => {
            out.fail(Failure::Resolution, format!("You can't put things in the {}.", tname));
            return;
        }
        _ => {}
    }
    if !target.is_surface() && !target.attrs.open {
        out.fail(Failure::Resolution, format!("The {} is closed.", tname));
        return;
    }
    if cid == item_id || world.is_within(&cid, &item_id) {
        out.fail(Failure::Resolution, format!("You can't put the {} inside itself.", name_of(world, &item_id)));
        return;
    }
    if let Some(cap) = capacity {
        let used: u32 = world.contents(&cid).iter().map(|o| world.weight_with_contents(&o.id)).sum();
        if (used + world.weight_with_contents(&item_id)) as usize > cap {
            out.fail(Failure::Resource, format!("There's no room in the {}.", tname));
            return;
        }
    }

    if world
        .transfer_object(&item_id, &Location::Inventory, Location::Inside(cid.clone()))
        .is_err()
    {
        out.fail(Failure::Resolution, format!("You can't put that in the {}.", tname));
        return;
    }
    let word = if prep == Prep::On { "on" } else { "in" };
    out.say(format!("You put the {} {} the {}.", name_of(world, &item_id), word, tname));
    puzzles.notify(out, world, &Trigger::action("put", &cid));
}

//////////////////////
/// OPEN / CLOSE   ///
//////////////////////

pub fn handle_open(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, name: &str) {
    let Some(id) = resolve_object(out, world, name, Scope::VISIBLE, "You can't open the {}.") else {
        return;
    };
    let Some(obj) = world.objects.get_mut(&id) else {
        return;
    };

    if !obj.is_openable() {
        out.fail(Failure::Resolution, format!("You can't open the {}.", obj.name));
        return;
    }
    if obj.attrs.open {
        out.fail(Failure::Resolution, format!("The {} is already open.", obj.name));
        return;
    }
    if obj.attrs.locked {
        out.fail(Failure::Resource, format!("The {} is locked.", obj.name));
        return;
    }

    obj.attrs.open = true;
    debug!(object = %id, "opened");
    out.say(format!("You open the {}.", obj.name));

    let is_container = obj.is_container();
    let obj_name = obj.name.clone();
    if is_container {
        match world.objects.get(&id).and_then(|o| list_contents(world, o)) {
            Some(line) => out.say(line),
            None => out.say(format!("The {} is empty.", obj_name)),
        }
    }
    puzzles.notify(out, world, &Trigger::action("open", &id));
}

pub fn handle_close(out: &mut Output, world: &mut World, name: &str) {
    let Some(id) = resolve_object(out, world, name, Scope::VISIBLE, "You can't close the {}.") else {
        return;
    };
    let Some(obj) = world.objects.get_mut(&id) else {
        return;
    };

    if !obj.is_openable() {
        out.fail(Failure::Resolution, format!("You can't close the {}.", obj.name));
        return;
    }
    if !obj.attrs.open {
        out.fail(Failure::Resolution, format!("The {} is already closed.", obj.name));
        return;
    }
    obj.attrs.open = false;
    out.say(format!("You close the {}.", obj.name));
}

/////////////////////
/// LOCK / UNLOCK ///
/////////////////////

enum LockTarget {
    Exit(Direction),
    Object(String),
}

/// Exits are named by direction ("north", "north door") or by "door" when only
/// one exit here has a lock.
fn lock_target(world: &World, target: &str, locking: bool) -> Option<LockTarget> {
    if let Found::Object(id) = world.find_entity(target, Scope::VISIBLE) {
        return Some(LockTarget::Object(id));
    }

    if let Some(dir) = target.split_whitespace().find_map(Direction::parse) {
        return Some(LockTarget::Exit(dir));
    }

    let room = world.current_room()?;
    let door_words = ["door", "gate", "grate", "grating"];
    if !target.split_whitespace().any(|w| door_words.contains(&w)) {
        return None;
    }
    let lockable: Vec<Direction> = room
        .exits
        .iter()
        .filter(|(_, e)| if locking { e.key.is_some() && !e.locked } else { e.locked })
        .map(|(d, _)| *d)
        .collect();
    match lockable.as_slice() {
        [only] => Some(LockTarget::Exit(*only)),
        _ => None,
    }
}

/// The id of an explicitly named key, which must be carried.
fn named_key(out: &mut Output, world: &World, key: Option<&str>) -> Result<Option<String>, ()> {
    let Some(key) = key else {
        return Ok(None);
    };
    match world.find_entity(key, Scope::INVENTORY) {
        Found::Object(id) => Ok(Some(id)),
        _ => {
            out.fail(Failure::Resource, format!("You don't have the {}.", key));
            Err(())
        }
    }
}

pub fn handle_lock(
    out: &mut Output,
    world: &mut World,
    puzzles: &PuzzleRegistry,
    target: &str,
    key: Option<&str>,
    locking: bool,
) {
    let Some(which) = lock_target(world, target, locking) else {
        out.fail(Failure::Resolution, format!("You don't see any {} here.", target));
        return;
    };
    let Ok(explicit) = named_key(out, world, key) else {
        return;
    };
    let verb = if locking { "lock" } else { "unlock" };

    match which {
        LockTarget::Exit(dir) => {
            let room_id = world.player.room.clone();
            let required = world
                .current_room()
                .and_then(|r| r.exits.get(&dir))
                .and_then(|e| e.key.clone());
            if let (Some(have), Some(need)) = (&explicit, &required) {
                if have != need {
                    out.fail(Failure::Resource, format!("The {} doesn't fit.", name_of(world, have)));
                    return;
                }
            }

            let result = if locking {
                world.lock_exit(&room_id, dir, true)
            } else {
                world.unlock_exit(&room_id, dir, true)
            };
            match result {
                Ok(()) => {
                    out.say(format!("You {} the door to the {}.", verb, dir.name()));
                    if !locking {
                        puzzles.notify(out, world, &Trigger::action("unlock", dir.name()));
                    }
                }
                Err(LockError::NoExit(_)) => {
                    out.fail(Failure::Navigation, format!("There is no door to the {}.", dir.name()));
                }
                Err(LockError::AlreadyLocked) => out.fail(Failure::Resolution, "The door is already locked."),
                Err(LockError::AlreadyUnlocked) => out.fail(Failure::Resolution, "The door is already unlocked."),
                Err(LockError::NoKey) => out.fail(Failure::Resource, "You don't have a key."),
            }
        }
        LockTarget::Object(id) => {
            let Some(obj) = world.objects.get(&id) else {
                return;
            };
            let name = obj.name.clone();
            if !obj.is_openable() && obj.attrs.key.is_none() {
                out.fail(Failure::Resolution, format!("You can't {} the {}.", verb, name));
                return;
            }
            if obj.attrs.locked == locking {
                let state = if locking { "locked" } else { "unlocked" };
                out.fail(Failure::Resolution, format!("The {} is already {}.", name, state));
                return;
            }
            if locking && obj.attrs.open {
                out.fail(Failure::Resolution, format!("You'll have to close the {} first.", name));
                return;
            }
            let required = obj.attrs.key.clone();
            if let (Some(have), Some(need)) = (&explicit, &required) {
                if have != need {
                    out.fail(Failure::Resource, format!("The {} doesn't fit.", name_of(world, have)));
                    return;
                }
            }
            if world.carried_key(required.as_deref()).is_none() {
                out.fail(Failure::Resource, "You don't have a key.");
                return;
            }

            if let Some(obj) = world.objects.get_mut(&id) {
                obj.attrs.locked = locking;
            }
            debug!(object = %id, locked = locking, "object lock changed");
            out.say(format!("You {} the {}.", verb, name));
            if !locking {
                puzzles.notify(out, world, &Trigger::action("unlock", &id));
            }
        }
    }
}

//////////////////////////
/// LIGHT / EXTINGUISH ///
//////////////////////////

pub fn handle_light(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, name: &str) {
    let Some(id) = resolve_object(out, world, name, Scope::VISIBLE, "You can't light the {}.") else {
        return;
    };
    let was_dark = world.is_dark();
    let Some(obj) = world.objects.get_mut(&id) else {
        return;
    };

    if obj.attrs.light {
        if obj.attrs.lit {
            out.fail(Failure::Resolution, format!("The {} is already on.", obj.name));
            return;
        }
        obj.attrs.lit = true;
        out.say(format!("The {} is now on.", obj.name));
    } else if obj.attrs.flammable {
        if obj.attrs.burning {
            out.fail(Failure::Resolution, format!("The {} is already burning.", obj.name));
            return;
        }
        obj.attrs.burning = true;
        out.say(format!("The {} catches fire.", obj.name));
    } else {
        out.fail(Failure::Resolution, format!("You can't light the {}.", obj.name));
        return;
    }

    debug!(object = %id, "lit");
    puzzles.notify(out, world, &Trigger::action("light", &id));
    if was_dark && !world.is_dark() {
        render_room(out, world, true);
    }
}

pub fn handle_extinguish(out: &mut Output, world: &mut World, name: &str) {
    let Some(id) = resolve_object(out, world, name, Scope::VISIBLE, "You can't extinguish the {}.") else {
        return;
    };
    let Some(obj) = world.objects.get_mut(&id) else {
        return;
    };

    if obj.attrs.lit {
        obj.attrs.lit = false;
        out.say(format!("The {} is now off.", obj.name));
    } else if obj.attrs.burning {
        obj.attrs.burning = false;
        out.say(format!("The {} is no longer burning.", obj.name));
    } else {
        out.fail(Failure::Resolution, format!("The {} isn't lit.", obj.name));
        return;
    }

    if world.is_dark() {
        out.say("It is now pitch black.");
    }
}

//////////////////////////
/// LOOKING AT THINGS  ///
//////////////////////////

pub fn handle_examine(out: &mut Output, world: &World, name: &str) {
    let id = match resolve(out, world, name, Scope::VISIBLE) {
        Some(Found::Object(id)) => id,
        Some(Found::Npc(id)) => {
            if let Some(npc) = world.npcs.get(&id) {
                npcs::describe_npc(out, world, npc);
            }
            return;
        }
        _ => return,
    };
    let Some(obj) = world.objects.get(&id) else {
        return;
    };

    if obj.attrs.indescribable {
        out.say(format!("You can't make out anything special about the {}.", obj.name));
        return;
    }
    if obj.description.trim().is_empty() {
        out.say(format!("You see nothing special about the {}.", obj.name));
    } else {
        out.say(obj.description.clone());
    }

    if obj.is_openable() && !obj.is_surface() {
        let state = if obj.attrs.open { "open" } else { "closed" };
        out.say(format!("The {} is {}.", obj.name, state));
    }
    if obj.attrs.lit {
        out.say(format!("The {} is on.", obj.name));
    } else if obj.attrs.burning {
        out.say(format!("The {} is burning.", obj.name));
    }
    if obj.is_accessible() {
        if let Some(line) = list_contents(world, obj) {
            out.say(line);
        }
    }
}

fn search_into(out: &mut Output, world: &World, container: &GameObject, depth: usize) {
    if depth > 8 || !container.is_accessible() {
        return;
    }
    if let Some(line) = list_contents(world, container) {
        out.say(line);
    }
    for inner in world.contents(&container.id) {
        if inner.attrs.visible {
            search_into(out, world, inner, depth + 1);
        }
    }
}

pub fn handle_search(out: &mut Output, world: &World, name: &str) {
    let id = match resolve(out, world, name, Scope::REACHABLE) {
        Some(Found::Object(id)) => id,
        Some(Found::Npc(id)) => {
            let npc_name = world.npcs.get(&id).map(|n| n.name.clone()).unwrap_or_default();
            out.fail(Failure::Resolution, format!("The {} won't let you search it.", npc_name));
            return;
        }
        _ => return,
    };
    let Some(obj) = world.objects.get(&id) else {
        return;
    };

    if obj.is_container() {
        if !obj.is_accessible() {
            out.fail(Failure::Resolution, format!("The {} is closed.", obj.name));
            return;
        }
        if world.contents(&id).iter().any(|o| o.attrs.visible) {
            search_into(out, world, obj, 0);
            return;
        }
        out.say("You find nothing of interest.");
    } else if obj.attrs.searchable {
        out.say("You find nothing of interest.");
    } else {
        out.say(format!("There is nothing to search in the {}.", obj.name));
    }
}

pub fn handle_look_through(out: &mut Output, world: &World, name: &str) {
    let Some(id) = resolve_object(out, world, name, Scope::VISIBLE, "You can't see through the {}.") else {
        return;
    };
    let Some(obj) = world.objects.get(&id) else {
        return;
    };

    if !obj.attrs.transparent {
        out.fail(Failure::Resolution, format!("You can't see through the {}.", obj.name));
        return;
    }
    let inside: Vec<&str> = world
        .contents(&id)
        .into_iter()
        .filter(|o| o.attrs.visible)
        .map(|o| o.name.as_str())
        .collect();
    if inside.is_empty() {
        out.say(format!("You look through the {} but see nothing unusual.", obj.name));
    } else {
        out.say(format!("Through the {} you see: {}.", obj.name, inside.join(", ")));
    }
}

pub fn handle_read(out: &mut Output, world: &World, name: &str) {
    if world.is_dark() {
        out.fail(Failure::Resolution, "It is too dark to read.");
        return;
    }
    let Some(id) = resolve_object(out, world, name, Scope::VISIBLE, "You can't read the {}.") else {
        return;
    };
    let Some(obj) = world.objects.get(&id) else {
        return;
    };

    match &obj.text {
        Some(text) if obj.attrs.readable || !text.trim().is_empty() => out.say(text.clone()),
        _ => out.fail(Failure::Resolution, format!("There's nothing written on the {}.", obj.name)),
    }
}

/////////////////////
/// MISC VERBS    ///
/////////////////////

pub fn handle_eat(out: &mut Output, world: &mut World, name: &str) {
    let Some(id) = resolve_object(out, world, name, Scope::VISIBLE, "I don't think the {} would agree with you.")
    else {
        return;
    };
    let Some(obj) = world.objects.get(&id) else {
        return;
    };
    if !obj.attrs.edible {
        out.fail(Failure::Resolution, format!("I don't think the {} would agree with you.", obj.name));
        return;
    }

    let from = obj.location.clone();
    if world.transfer_object(&id, &from, Location::Nowhere).is_ok() {
        out.say("Thank you very much. It really hit the spot.");
    }
}

pub fn handle_tie(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, item: &str, to: Option<&str>) {
    let id = match resolve(out, world, item, Scope::VISIBLE) {
        Some(Found::Object(id)) => id,
        Some(Found::Npc(npc_id)) => {
            npcs::handle_interaction(out, world, puzzles, &npc_id, Verb::Tie, None);
            return;
        }
        _ => return,
    };

    let anchor = match to {
        Some(to) => match resolve_object(out, world, to, Scope::VISIBLE, "You can't tie anything to the {}.") {
            Some(aid) => Some(name_of(world, &aid)),
            None => return,
        },
        None => None,
    };

    let Some(obj) = world.objects.get_mut(&id) else {
        return;
    };
    if !obj.attrs.tieable {
        out.fail(Failure::Resolution, format!("You can't tie the {}.", obj.name));
        return;
    }
    if obj.extra("tied") {
        out.fail(Failure::Resolution, format!("The {} is already tied.", obj.name));
        return;
    }
    obj.attrs.extra.insert("tied".to_string(), true);
    match anchor {
        Some(a) => out.say(format!("You tie the {} to the {}.", obj.name, a)),
        None => out.say(format!("You tie the {}.", obj.name)),
    }
    puzzles.notify(out, world, &Trigger::action("tie", &id));
}

pub fn handle_dig(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, name: &str) {
    let Some(id) = resolve_object(out, world, name, Scope::VISIBLE, "Digging in the {} would achieve nothing.") else {
        return;
    };
    let Some(obj) = world.objects.get_mut(&id) else {
        return;
    };
    if !obj.attrs.diggable {
        out.fail(Failure::Resolution, format!("Digging in the {} would achieve nothing.", obj.name));
        return;
    }
    if obj.extra("dug") {
        out.fail(Failure::Resolution, "You've already dug here.");
        return;
    }
    obj.attrs.extra.insert("dug".to_string(), true);
    out.say(format!("You dig into the {}.", obj.name));
    puzzles.notify(out, world, &Trigger::action("dig", &id));
}

fn can_sleep(obj: &GameObject) -> bool {
    obj.attrs.asleep || obj.extra("sleeps")
}

pub fn handle_wake(out: &mut Output, world: &mut World, name: &str) {
    match resolve(out, world, name, Scope::VISIBLE) {
        Some(Found::Npc(id)) => {
            let Some(npc) = world.npcs.get_mut(&id) else {
                return;
            };
            if !npc.flag("asleep") {
                out.fail(Failure::Resolution, format!("The {} isn't asleep.", npc.name));
                return;
            }
            npc.set_flag("asleep", false);
            out.say(format!("The {} wakes up.", npc.name));
        }
        Some(Found::Object(id)) => {
            let Some(obj) = world.objects.get_mut(&id) else {
                return;
            };
            if !can_sleep(obj) {
                out.fail(Failure::Resolution, format!("You can't wake the {}.", obj.name));
            } else if !obj.attrs.asleep {
                out.fail(Failure::Resolution, format!("The {} is already awake.", obj.name));
            } else {
                obj.attrs.asleep = false;
                obj.attrs.extra.insert("sleeps".to_string(), true);
                out.say(format!("You wake the {}.", obj.name));
            }
        }
        _ => {}
    }
}

pub fn handle_sleep(out: &mut Output, world: &mut World, name: &str) {
    match resolve(out, world, name, Scope::VISIBLE) {
        Some(Found::Npc(id)) => {
            let npc_name = world.npcs.get(&id).map(|n| n.name.clone()).unwrap_or_default();
            out.fail(Failure::Resolution, format!("The {} isn't the least bit sleepy.", npc_name));
        }
        Some(Found::Object(id)) => {
            let Some(obj) = world.objects.get_mut(&id) else {
                return;
            };
            if !can_sleep(obj) {
                out.fail(Failure::Resolution, format!("The {} can't be put to sleep.", obj.name));
            } else if obj.attrs.asleep {
                out.fail(Failure::Resolution, format!("The {} is already asleep.", obj.name));
            } else {
                obj.attrs.asleep = true;
                out.say(format!("You put the {} to sleep.", obj.name));
            }
        }
        _ => {}
    }
}

pub fn handle_poke(out: &mut Output, world: &mut World, puzzles: &PuzzleRegistry, name: &str) {
    match resolve(out, world, name, Scope::VISIBLE) {
        Some(Found::Npc(id)) => npcs::handle_interaction(out, world, puzzles, &id, Verb::Poke, None),
        Some(Found::Object(id)) => {
            let Some(obj) = world.objects.get(&id) else {
                return;
            };
            if obj.attrs.asleep {
                out.say(format!("The {} stirs but doesn't wake.", obj.name));
            } else {
                out.say(format!("Poking the {} doesn't do anything.", obj.name));
            }
        }
        _ => {}
    }
}

/// Attacking something that isn't an NPC.
pub fn handle_attack_object(out: &mut Output, world: &World, id: &str) {
    let Some(obj) = world.objects.get(id) else {
        return;
    };
    if obj.attrs.villain || obj.attrs.trytake {
        out.fail(Failure::Resolution, format!("The {} resists your attack.", obj.name));
    } else {
        out.fail(Failure::Resolution, format!("Attacking the {} would be pointless.", obj.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ContainerProps, ObjectAttrs, fallback_world};

    fn put_obj(world: &mut World, id: &str, location: Location, attrs: ObjectAttrs) {
        world.objects.insert(
            id.into(),
            GameObject {
                id: id.into(),
                name: id.replace('_', " "),
                aliases: Vec::new(),
                description: String::new(),
                text: None,
                kind: ObjectKind::Simple,
                attrs,
                location,
            },
        );
    }

    fn put_box(world: &mut World, id: &str, location: Location, open: bool, capacity: Option<usize>) {
        put_obj(
            world,
            id,
            location,
            ObjectAttrs {
                open,
                takeable: false,
                ..Default::default()
            },
        );
        if let Some(o) = world.objects.get_mut(id) {
            o.kind = ObjectKind::Container(ContainerProps { capacity, surface: false });
        }
    }

    fn here(world: &World) -> Location {
        Location::Room(world.player.room.clone())
    }

    #[test]
    fn take_refusals_change_nothing() {
        let mut world = fallback_world();
        let cfg = EngineConfig::default();
        let reg = PuzzleRegistry::standard();
        let loc = here(&world);
        put_obj(&mut world, "altar", loc.clone(), ObjectAttrs { sacred: true, ..Default::default() });
        put_obj(&mut world, "leaves", loc.clone(), ObjectAttrs { collective: true, ..Default::default() });
        put_obj(&mut world, "house", loc.clone(), ObjectAttrs { takeable: false, ..Default::default() });

        let mut out = Output::new();
        handle_take(&mut out, &mut world, &reg, &cfg, "altar");
        assert!(out.contains("An invisible force prevents you from taking the altar."));

        let mut out = Output::new();
        handle_take(&mut out, &mut world, &reg, &cfg, "leaves");
        assert!(out.contains("You can't take the leaves as a whole."));

        let mut out = Output::new();
        handle_take(&mut out, &mut world, &reg, &cfg, "house");
        assert!(REFUSALS.iter().any(|r| out.contains(r)));
        assert_eq!(out.failure, Some(Failure::Resolution));

        for id in ["altar", "leaves", "house"] {
            assert_eq!(world.objects[id].location, loc);
        }
    }

    #[test]
    fn treasure_scores_on_first_take_only() {
        let mut world = fallback_world();
        let cfg = EngineConfig::default();
        let reg = PuzzleRegistry::standard();
        let loc = here(&world);
        put_obj(
            &mut world,
            "jade_figurine",
            loc,
            ObjectAttrs {
                treasure: true,
                score_value: 5,
                ..Default::default()
            },
        );

        let mut out = Output::new();
        handle_take(&mut out, &mut world, &reg, &cfg, "jade figurine");
        assert_eq!(out.score_delta, 5);
        assert!(world.objects["jade_figurine"].attrs.touched);

        handle_drop(&mut Output::new(), &mut world, "figurine");
        let mut out = Output::new();
        handle_take(&mut out, &mut world, &reg, &cfg, "figurine");
        assert_eq!(out.score_delta, 0);
        assert_eq!(world.score, 5);
    }

    #[test]
    fn carry_limit_counts_osize() {
        let mut world = fallback_world();
        let cfg = EngineConfig {
            carry_limit: 10,
            ..EngineConfig::default()
        };
        let reg = PuzzleRegistry::standard();
        let loc = here(&world);
        put_obj(&mut world, "anvil", loc.clone(), ObjectAttrs { osize: 8, ..Default::default() });
        put_obj(&mut world, "brick", loc, ObjectAttrs { osize: 3, ..Default::default() });

        let mut out = Output::new();
        handle_take_all(&mut out, &mut world, &reg, &cfg);
        assert!(world.is_carried("anvil"));
        assert!(!world.is_carried("brick"));
        assert!(out.contains("Your load is too heavy to take the brick."));
        assert!(!out.failed());

        world.mode = Mode::Demo;
        let mut out = Output::new();
        handle_take(&mut out, &mut world, &reg, &cfg, "brick");
        assert!(world.is_carried("brick"));
    }

    #[test]
    fn put_respects_closed_and_capacity() {
        let mut world = fallback_world();
        let reg = PuzzleRegistry::standard();
        let loc = here(&world);
        put_box(&mut world, "chest", loc.clone(), false, Some(2));
        put_obj(&mut world, "gem", Location::Inventory, ObjectAttrs::default());
        put_obj(&mut world, "boulder", Location::Inventory, ObjectAttrs { osize: 5, ..Default::default() });

        let mut out = Output::new();
        handle_put(&mut out, &mut world, &reg, "gem", "chest", Prep::In);
        assert!(out.contains("The chest is closed."));

        handle_open(&mut Output::new(), &mut world, &reg, "chest");
        let mut out = Output::new();
        handle_put(&mut out, &mut world, &reg, "boulder", "chest", Prep::In);
        assert!(out.contains("There's no room in the chest."));
        assert_eq!(world.objects["boulder"].location, Location::Inventory);

        let mut out = Output::new();
        handle_put(&mut out, &mut world, &reg, "gem", "chest", Prep::In);
        assert_eq!(world.objects["gem"].location, Location::Inside("chest".into()));

        let mut out = Output::new();
        handle_put(&mut out, &mut world, &reg, "boulder", "gem", Prep::In);
        assert!(out.failed());
    }

    #[test]
    fn open_lists_contents_and_scores_mailbox() {
        let mut world = fallback_world();
        let reg = PuzzleRegistry::standard();
        let loc = here(&world);
        put_box(&mut world, "mailbox", loc, false, None);
        put_obj(&mut world, "leaflet", Location::Inside("mailbox".into()), ObjectAttrs::default());

        let mut out = Output::new();
        handle_open(&mut out, &mut world, &reg, "mailbox");
        assert!(out.contains("Inside the mailbox you see: leaflet."));
        assert_eq!(out.score_delta, 1);

        let mut out = Output::new();
        handle_open(&mut out, &mut world, &reg, "mailbox");
        assert!(out.contains("The mailbox is already open."));
        assert_eq!(world.score, 1);
    }

    #[test]
    fn unlocking_an_exit_needs_a_key() {
        let mut world = fallback_world();
        let reg = PuzzleRegistry::standard();
        if let Some(exit) = world.rooms.get_mut("west_of_house").and_then(|r| r.exits.get_mut(&Direction::East)) {
            exit.locked = true;
        }

        let mut out = Output::new();
        handle_lock(&mut out, &mut world, &reg, "east", None, false);
        assert!(out.contains("You don't have a key."));
        assert_eq!(out.failure, Some(Failure::Resource));

        put_obj(&mut world, "key", Location::Inventory, ObjectAttrs::default());
        let mut out = Output::new();
        handle_lock(&mut out, &mut world, &reg, "door", None, false);
        assert!(out.contains("You unlock the door to the east."));
        assert_eq!(out.score_delta, 2);

        let mut out = Output::new();
        handle_lock(&mut out, &mut world, &reg, "east", None, false);
        assert!(out.contains("The door is already unlocked."));
    }

    #[test]
    fn attribute_verbs() {
        let mut world = fallback_world();
        let reg = PuzzleRegistry::standard();
        let loc = here(&world);
        put_obj(&mut world, "rope", Location::Inventory, ObjectAttrs { tieable: true, ..Default::default() });
        put_obj(&mut world, "cat", loc.clone(), ObjectAttrs { asleep: true, ..Default::default() });
        put_obj(&mut world, "fog", loc.clone(), ObjectAttrs { indescribable: true, ..Default::default() });
        put_obj(&mut world, "sand", loc, ObjectAttrs { diggable: true, takeable: false, ..Default::default() });

        handle_tie(&mut Output::new(), &mut world, &reg, "rope", None);
        assert!(world.objects["rope"].extra("tied"));

        handle_wake(&mut Output::new(), &mut world, "cat");
        assert!(!world.objects["cat"].attrs.asleep);
        handle_sleep(&mut Output::new(), &mut world, "cat");
        assert!(world.objects["cat"].attrs.asleep);

        let mut out = Output::new();
        handle_examine(&mut out, &world, "fog");
        assert!(out.contains("You can't make out anything special about the fog."));

        handle_dig(&mut Output::new(), &mut world, &reg, "sand");
        assert!(world.objects["sand"].extra("dug"));
        let mut out = Output::new();
        handle_dig(&mut out, &mut world, &reg, "sand");
        assert!(out.failed());
    }

    #[test]
    fn lighting_in_the_dark_shows_the_room() {
        let mut world = fallback_world();
        let reg = PuzzleRegistry::standard();
        world.set_room_flag("kitchen", crate::world::RoomFlags::DARK);
        world.player.room = "kitchen".into();
        put_obj(&mut world, "lamp", Location::Inventory, ObjectAttrs { light: true, ..Default::default() });

        let mut out = Output::new();
        handle_light(&mut out, &mut world, &reg, "lamp");
        assert!(out.contains("The lamp is now on."));
        assert!(!world.is_dark());
        assert_eq!(out.score_delta, 2);
    }
}
