use bitflags::bitflags;
use tracing::debug;

use super::model::{Direction, GameObject, Location, Npc, ObjectId, Room, RoomFlags, World};

const MAX_NESTING: usize = 16;

bitflags! {
    /// Where `find_entity` is allowed to look.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Scope: u8 {
        const ROOM = 1 << 0;
        const INVENTORY = 1 << 1;
        /// Contents of open containers in the room or in the inventory.
        const CONTAINERS = 1 << 2;
        /// Containers inside containers (take/search only).
        const NESTED = 1 << 3;

        const VISIBLE = Self::ROOM.bits() | Self::INVENTORY.bits() | Self::CONTAINERS.bits();
        const REACHABLE = Self::VISIBLE.bits() | Self::NESTED.bits();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Found {
    Object(ObjectId),
    Npc(String),
    /// Display names of the equally good candidates.
    Ambiguous(Vec<String>),
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    NoExit(Direction),
    Locked(Direction),
    Missing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    UnknownObject(ObjectId),
    WrongSource { expected: Location, actual: Location },
    /// The destination is the object itself or something inside it.
    Cycle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    NoExit(Direction),
    AlreadyLocked,
    AlreadyUnlocked,
    NoKey,
}

pub struct Arrival<'a> {
    pub room: &'a Room,
    pub first_visit: bool,
}

#[derive(Clone, Copy, PartialEq)]
enum Candidate<'a> {
    Object(&'a GameObject),
    Npc(&'a Npc),
}

impl<'a> Candidate<'a> {
    fn name(&self) -> &'a str {
        match self {
            Candidate::Object(o) => &o.name,
            Candidate::Npc(n) => &n.name,
        }
    }

    fn aliases(&self) -> &'a [String] {
        match self {
            Candidate::Object(o) => &o.aliases,
            Candidate::Npc(n) => &n.aliases,
        }
    }

    fn into_found(self) -> Found {
        match self {
            Candidate::Object(o) => Found::Object(o.id.clone()),
            Candidate::Npc(n) => Found::Npc(n.id.clone()),
        }
    }
}

/// Lowercases, trims and drops leading articles ("the", "a", "an").
pub fn normalize_name(query: &str) -> String {
    let words: Vec<String> = query.split_whitespace().map(|w| w.to_lowercase()).collect();
    let start = words
        .iter()
        .position(|w| !matches!(w.as_str(), "the" | "a" | "an"))
        .unwrap_or(words.len());
    words[start..].join(" ")
}

fn words_of(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split_whitespace().map(|w| w.to_lowercase())
}

impl World {
    pub fn current_room(&self) -> Option<&Room> {
        self.rooms.get(&self.player.room)
    }

    //////////////////
    /// NAVIGATION ///
    //////////////////

    pub fn move_player(&mut self, direction: Direction) -> Result<Arrival<'_>, NavError> {
        let room = self
            .rooms
            .get(&self.player.room)
            .ok_or_else(|| NavError::Missing(self.player.room.clone()))?;
        let exit = room.exits.get(&direction).ok_or(NavError::NoExit(direction))?;
        if exit.locked {
            return Err(NavError::Locked(direction));
        }
        let target = exit.target.clone();

        let dest = self
            .rooms
            .get_mut(&target)
            .ok_or_else(|| NavError::Missing(target.clone()))?;
        let first_visit = !dest.flags.contains(RoomFlags::VISITED);
        dest.flags.insert(RoomFlags::VISITED);

        debug!(from = %self.player.room, to = %target, "player moved");
        self.player.room = target;

        let room = self
            .rooms
            .get(&self.player.room)
            .ok_or_else(|| NavError::Missing(self.player.room.clone()))?;
        Ok(Arrival { room, first_visit })
    }

    pub fn lock_exit(&mut self, room_id: &str, direction: Direction, require_key: bool) -> Result<(), LockError> {
        self.set_exit_lock(room_id, direction, require_key, true)
    }

    pub fn unlock_exit(&mut self, room_id: &str, direction: Direction, require_key: bool) -> Result<(), LockError> {
        self.set_exit_lock(room_id, direction, require_key, false)
    }

    fn set_exit_lock(
        &mut self,
        room_id: &str,
        direction: Direction,
        require_key: bool,
        locked: bool,
    ) -> Result<(), LockError> {
        let exit = self
            .rooms
            .get(room_id)
            .and_then(|r| r.exits.get(&direction))
            .ok_or(LockError::NoExit(direction))?;

        if exit.locked == locked {
            return Err(if locked { LockError::AlreadyLocked } else { LockError::AlreadyUnlocked });
        }
        if require_key && self.carried_key(exit.key.as_deref()).is_none() {
            return Err(LockError::NoKey);
        }

        if let Some(exit) = self.rooms.get_mut(room_id).and_then(|r| r.exits.get_mut(&direction)) {
            exit.locked = locked;
        }
        debug!(room = room_id, direction = direction.name(), locked, "exit lock changed");
        Ok(())
    }

    /// A carried key that fits. An explicit key id must be carried; otherwise
    /// any carried object named "key" will do.
    pub fn carried_key(&self, explicit: Option<&str>) -> Option<ObjectId> {
        match explicit {
            Some(id) => self.is_carried(id).then(|| id.to_string()),
            None => self
                .inventory()
                .into_iter()
                .find(|o| o.name.eq_ignore_ascii_case("key") || o.aliases.iter().any(|a| a.eq_ignore_ascii_case("key")))
                .map(|o| o.id.clone()),
        }
    }

    //////////////////
    /// ROOM FLAGS ///
    //////////////////

    pub fn set_room_flag(&mut self, room_id: &str, flag: RoomFlags) -> bool {
        match self.rooms.get_mut(room_id) {
            Some(room) => {
                room.flags.insert(flag);
                true
            }
            None => false,
        }
    }

    pub fn clear_room_flag(&mut self, room_id: &str, flag: RoomFlags) -> bool {
        match self.rooms.get_mut(room_id) {
            Some(room) => {
                room.flags.remove(flag);
                true
            }
            None => false,
        }
    }

    pub fn room_has_flag(&self, room_id: &str, flag: RoomFlags) -> bool {
        self.rooms.get(room_id).map(|r| r.flags.contains(flag)).unwrap_or(false)
    }

    /// Dark room and nothing lit on the player.
    pub fn is_dark(&self) -> bool {
        self.room_has_flag(&self.player.room, RoomFlags::DARK) && !self.player_has_light()
    }

    /// A lit object carried directly, or inside open carried containers.
    pub fn player_has_light(&self) -> bool {
        self.objects.values().any(|o| o.is_lighting() && self.light_reaches_player(&o.id))
    }

    fn light_reaches_player(&self, object_id: &str) -> bool {
        let mut current = object_id;
        for _ in 0..MAX_NESTING {
            match self.objects.get(current).map(|o| &o.location) {
                Some(Location::Inventory) => return true,
                Some(Location::Inside(parent)) => match self.objects.get(parent) {
                    Some(holder) if holder.is_accessible() => current = parent,
                    _ => return false,
                },
                _ => return false,
            }
        }
        false
    }

    /////////////
    /// SCORE ///
    /////////////

    pub fn award(&mut self, points: i32) -> i32 {
        self.score += points;
        if points != 0 {
            debug!(points, score = self.score, "score changed");
        }
        points
    }

    /////////////
    /// VIEWS ///
    /////////////

    fn sorted<'a>(mut objs: Vec<&'a GameObject>) -> Vec<&'a GameObject> {
        objs.sort_by(|a, b| a.name.cmp(&b.name));
        objs
    }

    pub fn objects_in(&self, room_id: &str) -> Vec<&GameObject> {
        Self::sorted(
            self.objects
                .values()
                .filter(|o| matches!(&o.location, Location::Room(r) if r == room_id))
                .collect(),
        )
    }

    pub fn inventory(&self) -> Vec<&GameObject> {
        Self::sorted(
            self.objects
                .values()
                .filter(|o| o.location == Location::Inventory)
                .collect(),
        )
    }

    pub fn contents(&self, container_id: &str) -> Vec<&GameObject> {
        Self::sorted(
            self.objects
                .values()
                .filter(|o| matches!(&o.location, Location::Inside(c) if c == container_id))
                .collect(),
        )
    }

    pub fn held_by(&self, npc_id: &str) -> Vec<&GameObject> {
        Self::sorted(
            self.objects
                .values()
                .filter(|o| matches!(&o.location, Location::Held(n) if n == npc_id))
                .collect(),
        )
    }

    pub fn npcs_in(&self, room_id: &str) -> Vec<&Npc> {
        let mut npcs: Vec<&Npc> = self.npcs.values().filter(|n| n.is_here(room_id)).collect();
        npcs.sort_by(|a, b| a.name.cmp(&b.name));
        npcs
    }

    /// On the player, directly or inside something carried.
    pub fn is_carried(&self, object_id: &str) -> bool {
        let mut current = object_id;
        for _ in 0..MAX_NESTING {
            match self.objects.get(current).map(|o| &o.location) {
                Some(Location::Inventory) => return true,
                Some(Location::Inside(parent)) => current = parent,
                _ => return false,
            }
        }
        false
    }

    /// Total `osize` of everything carried, nested contents included.
    pub fn carried_weight(&self) -> u32 {
        self.objects
            .values()
            .filter(|o| self.is_carried(&o.id))
            .map(|o| o.attrs.osize)
            .sum()
    }

    /// Weight of an object together with everything inside it.
    pub fn weight_with_contents(&self, object_id: &str) -> u32 {
        let own = self.objects.get(object_id).map(|o| o.attrs.osize).unwrap_or(0);
        own + self
            .objects
            .values()
            .filter(|o| o.id != object_id && self.is_within(&o.id, object_id))
            .map(|o| o.attrs.osize)
            .sum::<u32>()
    }

    /// True if `object_id` sits (at any depth) inside `ancestor_id`.
    pub fn is_within(&self, object_id: &str, ancestor_id: &str) -> bool {
        let mut current = object_id;
        for _ in 0..MAX_NESTING {
            match self.objects.get(current).map(|o| &o.location) {
                Some(Location::Inside(parent)) if parent == ancestor_id => return true,
                Some(Location::Inside(parent)) => current = parent,
                _ => return false,
            }
        }
        false
    }

    ////////////////
    /// TRANSFER ///
    ////////////////

    pub fn transfer_object(&mut self, object_id: &str, from: &Location, to: Location) -> Result<(), TransferError> {
        let actual = self
            .objects
            .get(object_id)
            .map(|o| o.location.clone())
            .ok_or_else(|| TransferError::UnknownObject(object_id.to_string()))?;

        if &actual != from {
            return Err(TransferError::WrongSource { expected: from.clone(), actual });
        }
        if let Location::Inside(dest) = &to {
            if dest == object_id || self.is_within(dest, object_id) {
                return Err(TransferError::Cycle);
            }
        }

        debug!(object = object_id, from = ?actual, to = ?to, "object transferred");
        if let Some(obj) = self.objects.get_mut(object_id) {
            obj.location = to;
        }
        Ok(())
    }

    ///////////////
    /// LOOKUP  ///
    ///////////////

    /// Resolves a player-typed name to an object or NPC.
    ///
    /// Levels, in order: room (objects, then NPCs), inventory, open containers in
    /// the room, open containers carried, then nested open containers when
    /// `Scope::NESTED` is given. An exact name/alias match on an earlier level wins;
    /// failing that, the best word-overlap match across all levels is taken.
    pub fn find_entity(&self, name: &str, scope: Scope) -> Found {
        let query = normalize_name(name);
        if query.is_empty() {
            return Found::Nothing;
        }

        let levels = self.lookup_levels(scope);

        for level in &levels {
            let exact: Vec<&Candidate> = level
                .iter()
                .filter(|c| {
                    c.name().eq_ignore_ascii_case(&query) || c.aliases().iter().any(|a| a.eq_ignore_ascii_case(&query))
                })
                .collect();
            match exact.len() {
                0 => continue,
                1 => return exact[0].into_found(),
                _ => return Found::Ambiguous(exact.iter().map(|c| c.name().to_string()).collect()),
            }
        }

        let query_words: Vec<String> = words_of(&query).collect();
        let mut scored: Vec<(Candidate, usize)> = Vec::new();
        for cand in levels.iter().flatten() {
            let mut all_words: Vec<String> = words_of(cand.name()).collect();
            for alias in cand.aliases() {
                all_words.extend(words_of(alias));
            }
            let score = query_words.iter().filter(|qw| all_words.contains(qw)).count();
            if score > 0 {
                scored.push((*cand, score));
            }
        }

        let Some(max_score) = scored.iter().map(|(_, s)| *s).max() else {
            return Found::Nothing;
        };
        let mut best: Vec<Candidate> = scored
            .into_iter()
            .filter(|(_, s)| *s == max_score)
            .map(|(c, _)| c)
            .collect();
        best.dedup();

        match best.len() {
            1 => best[0].into_found(),
            _ => {
                let mut names: Vec<String> = best.iter().map(|c| c.name().to_string()).collect();
                names.sort();
                Found::Ambiguous(names)
            }
        }
    }

    fn lookup_levels(&self, scope: Scope) -> Vec<Vec<Candidate<'_>>> {
        let room_id = self.player.room.as_str();
        let room_side = scope.contains(Scope::ROOM) && !self.is_dark();
        let mut levels: Vec<Vec<Candidate>> = Vec::new();

        let room_objects: Vec<&GameObject> = if room_side {
            self.objects_in(room_id).into_iter().filter(|o| o.attrs.visible).collect()
        } else {
            Vec::new()
        };
        let inventory: Vec<&GameObject> = if scope.contains(Scope::INVENTORY) {
            self.inventory()
        } else {
            Vec::new()
        };

        let mut first: Vec<Candidate> = room_objects.iter().copied().map(Candidate::Object).collect();
        if room_side {
            first.extend(self.npcs_in(room_id).into_iter().map(Candidate::Npc));
        }
        levels.push(first);
        levels.push(inventory.iter().copied().map(Candidate::Object).collect());

        if !scope.contains(Scope::CONTAINERS) {
            return levels;
        }

        let room_inner = self.open_contents(&room_objects);
        let carried_inner = self.open_contents(&inventory);
        levels.push(room_inner.iter().copied().map(Candidate::Object).collect());
        levels.push(carried_inner.iter().copied().map(Candidate::Object).collect());

        if scope.contains(Scope::NESTED) {
            let mut nested: Vec<&GameObject> = Vec::new();
            let mut frontier: Vec<&GameObject> = room_inner.into_iter().chain(carried_inner).collect();
            for _ in 0..MAX_NESTING {
                let next = self.open_contents(&frontier);
                if next.is_empty() {
                    break;
                }
                nested.extend(next.iter().copied());
                frontier = next;
            }
            levels.push(nested.into_iter().map(Candidate::Object).collect());
        }

        levels
    }

    fn open_contents<'a>(&'a self, holders: &[&'a GameObject]) -> Vec<&'a GameObject> {
        holders
            .iter()
            .filter(|c| c.is_accessible())
            .flat_map(|c| self.contents(&c.id))
            .filter(|o| o.attrs.visible)
            .collect()
    }
}
