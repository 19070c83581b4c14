use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub type RoomId = String;
pub type ObjectId = String;
pub type NpcId = String;

//////////////////////////////
/// GAME STRUCTS AND ENUMS ///
//////////////////////////////

/// Runtime world type used by the game loop. Everything a save file needs lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub start_room: RoomId,
    pub rooms: BTreeMap<RoomId, Room>,
    pub objects: BTreeMap<ObjectId, GameObject>,
    pub npcs: BTreeMap<NpcId, Npc>,
    pub player: Player,
    pub flags: BTreeSet<String>,
    pub puzzles: BTreeMap<String, PuzzleState>,
    /// Puzzles authored by the world file, on top of the standard table.
    pub puzzle_defs: Vec<PuzzleDef>,
    pub score: i32,
    pub dark_turns: u32,
    pub turn: u64,
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    /// Unlimited carrying capacity.
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
    Up,
    Down,
    In,
    Out,
}

impl Direction {
    pub const ALL: [Direction; 12] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Northeast,
        Direction::Northwest,
        Direction::Southeast,
        Direction::Southwest,
        Direction::Up,
        Direction::Down,
        Direction::In,
        Direction::Out,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "n" | "north" => Some(Self::North),
            "s" | "south" => Some(Self::South),
            "e" | "east" => Some(Self::East),
            "w" | "west" => Some(Self::West),
            "ne" | "northeast" => Some(Self::Northeast),
            "nw" | "northwest" => Some(Self::Northwest),
            "se" | "southeast" => Some(Self::Southeast),
            "sw" | "southwest" => Some(Self::Southwest),
            "u" | "up" => Some(Self::Up),
            "d" | "down" => Some(Self::Down),
            "in" | "inside" | "enter" => Some(Self::In),
            "out" | "outside" | "leave" => Some(Self::Out),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
            Self::Northeast => "northeast",
            Self::Northwest => "northwest",
            Self::Southeast => "southeast",
            Self::Southwest => "southwest",
            Self::Up => "up",
            Self::Down => "down",
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

bitflags! {
    /// Room status bits. Unknown bits are retained so worlds can carry their own.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RoomFlags: u32 {
        const DARK = 1 << 0;
        const DEADLY = 1 << 1;
        const VISITED = 1 << 2;
        const WATER = 1 << 3;
        const MAGIC = 1 << 4;
        const SOUND = 1 << 5;
        const LOCKED = 1 << 6;
        const OUTDOORS = 1 << 7;

        const _ = !0;
    }
}

impl RoomFlags {
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Some(Self::DARK),
            "deadly" => Some(Self::DEADLY),
            "visited" => Some(Self::VISITED),
            "water" => Some(Self::WATER),
            "magic" => Some(Self::MAGIC),
            "sound" => Some(Self::SOUND),
            "locked" => Some(Self::LOCKED),
            "outdoors" => Some(Self::OUTDOORS),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub desc: String,
    pub short_desc: String,
    pub exits: BTreeMap<Direction, Exit>,
    pub flags: RoomFlags,
    pub hook: Option<RoomHook>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    pub target: RoomId,
    pub locked: bool,
    /// Object id that opens this exit. `None` means any object named "key".
    pub key: Option<ObjectId>,
}

/// Built-in room behaviours, fired on entry, on each tick, and when the player speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomHook {
    Forest,
    EchoRoom,
    TreasureRoom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    Room(RoomId),
    Inventory,
    /// Inside (or on) a container object.
    Inside(ObjectId),
    /// Carried by an NPC.
    Held(NpcId),
    /// Eaten, stolen away, or otherwise gone from play.
    Nowhere,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Simple,
    Container(ContainerProps),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerProps {
    pub capacity: Option<usize>,
    /// Surfaces take "on" instead of "in" and are never closed.
    pub surface: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    pub id: ObjectId,
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub text: Option<String>,
    pub kind: ObjectKind,
    pub attrs: ObjectAttrs,
    pub location: Location,
}

impl GameObject {
    pub fn is_container(&self) -> bool {
        matches!(self.kind, ObjectKind::Container(_))
    }

    pub fn is_surface(&self) -> bool {
        matches!(&self.kind, ObjectKind::Container(p) if p.surface)
    }

    /// Contents can be seen and reached.
    pub fn is_accessible(&self) -> bool {
        match &self.kind {
            ObjectKind::Container(p) => p.surface || self.attrs.open,
            ObjectKind::Simple => false,
        }
    }

    pub fn is_openable(&self) -> bool {
        self.attrs.openable || self.attrs.door || (self.is_container() && !self.is_surface())
    }

    pub fn can_be_taken(&self) -> bool {
        self.attrs.takeable && self.attrs.portable
    }

    pub fn is_lighting(&self) -> bool {
        self.attrs.lit || self.attrs.burning
    }

    pub fn matches_name(&self, query: &str) -> bool {
        self.name.eq_ignore_ascii_case(query) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(query))
    }

    pub fn extra(&self, key: &str) -> bool {
        self.extra_flags().get(key).copied().unwrap_or(false)
    }

    fn extra_flags(&self) -> &BTreeMap<String, bool> {
        &self.attrs.extra
    }
}

/// The fixed attribute set every object carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectAttrs {
    pub osize: u32,
    pub score_value: i32,
    pub treasure: bool,
    pub takeable: bool,
    pub portable: bool,
    pub wearable: bool,
    pub edible: bool,
    pub readable: bool,
    pub light: bool,
    pub lit: bool,
    pub flammable: bool,
    pub burning: bool,
    pub weapon: bool,
    pub door: bool,
    pub openable: bool,
    pub open: bool,
    pub locked: bool,
    pub visible: bool,
    pub touched: bool,
    pub transparent: bool,
    pub collective: bool,
    pub bunch: bool,
    pub sacred: bool,
    pub dangerous: bool,
    pub tieable: bool,
    pub diggable: bool,
    pub searchable: bool,
    pub indescribable: bool,
    pub asleep: bool,
    pub villain: bool,
    pub trytake: bool,
    pub key: Option<ObjectId>,
    /// Data-driven flags the engine has no dedicated field for (e.g. "tied", "dug").
    pub extra: BTreeMap<String, bool>,
}

impl Default for ObjectAttrs {
    fn default() -> Self {
        ObjectAttrs {
            osize: 1,
            score_value: 0,
            treasure: false,
            takeable: true,
            portable: true,
            wearable: false,
            edible: false,
            readable: false,
            light: false,
            lit: false,
            flammable: false,
            burning: false,
            weapon: false,
            door: false,
            openable: false,
            open: false,
            locked: false,
            visible: true,
            touched: false,
            transparent: false,
            collective: false,
            bunch: false,
            sacred: false,
            dangerous: false,
            tieable: false,
            diggable: false,
            searchable: false,
            indescribable: false,
            asleep: false,
            villain: false,
            trytake: false,
            key: None,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpcKind {
    Troll,
    Thief,
    Cyclops,
    Villager,
}

/// Thresholds for one attack roll r in [0,1):
/// r < critical kills, r < wound wounds, r < stagger staggers, otherwise a miss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatProfile {
    pub critical: f64,
    pub wound: f64,
    pub stagger: f64,
}

impl CombatProfile {
    pub fn for_kind(kind: NpcKind) -> Self {
        match kind {
            NpcKind::Troll => CombatProfile { critical: 0.10, wound: 0.60, stagger: 0.80 },
            NpcKind::Thief => CombatProfile { critical: 0.05, wound: 0.45, stagger: 0.70 },
            NpcKind::Cyclops => CombatProfile { critical: 0.02, wound: 0.30, stagger: 0.55 },
            NpcKind::Villager => CombatProfile { critical: 0.10, wound: 0.70, stagger: 0.85 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcRoam {
    /// Rooms the NPC may wander to. Empty means any safe room.
    pub allowed_rooms: Vec<RoomId>,
    /// Chance per tick that the NPC turns up where the player is.
    pub appear_chance: f64,
    /// Chance per tick, while sharing a room, that it lifts a treasure.
    pub steal_chance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: NpcId,
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub kind: NpcKind,
    pub hostile: bool,
    pub alive: bool,
    pub health: i32,
    pub max_health: i32,
    pub staggered: bool,
    /// `None` once the NPC is dead or has vanished.
    pub room: Option<RoomId>,
    pub combat: CombatProfile,
    pub roam: Option<NpcRoam>,
    pub lair: Option<RoomId>,
    /// Exits this NPC refuses to let the player use while it is hostile.
    pub blocks: Vec<Direction>,
    pub state: BTreeMap<String, bool>,
}

impl Npc {
    pub fn matches_name(&self, query: &str) -> bool {
        self.name.eq_ignore_ascii_case(query) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(query))
    }

    pub fn flag(&self, key: &str) -> bool {
        self.state.get(key).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, key: &str, value: bool) {
        self.state.insert(key.to_string(), value);
    }

    pub fn is_here(&self, room_id: &str) -> bool {
        self.alive && self.room.as_deref() == Some(room_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub room: RoomId,
    pub health: i32,
    pub max_health: i32,
    pub alive: bool,
    pub staggered: bool,
    pub deaths: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleState {
    /// Number of stages already completed.
    pub stage: usize,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// A bare phrase typed by the player, e.g. "push button".
    Phrase(String),
    /// A resolved action on a target id, e.g. (open, mailbox) or (unlock, north).
    Action { verb: String, target: String },
}

impl Trigger {
    pub fn phrase(text: &str) -> Self {
        Trigger::Phrase(text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
    }

    pub fn action(verb: &str, target: &str) -> Self {
        Trigger::Action {
            verb: verb.to_lowercase(),
            target: target.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    SetFlag(String),
    ClearFlag(String),
    UnlockExit { room: RoomId, direction: Direction },
    /// Moves a hidden object into a room.
    Reveal { object: ObjectId, room: RoomId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub triggers: Vec<Trigger>,
    pub text: String,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleDef {
    pub id: String,
    /// Only fires while the player is here, if set.
    pub room: Option<RoomId>,
    pub stages: Vec<Stage>,
    pub score: i32,
    pub done_text: String,
}
