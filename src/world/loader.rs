use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::model::{
    CombatProfile, ContainerProps, Direction, Effect, Exit, GameObject, Location, Mode, Npc, NpcKind, NpcRoam,
    ObjectAttrs, ObjectKind, Player, PuzzleDef, Room, RoomFlags, RoomHook, Stage, Trigger, World,
};
use crate::error::{EngineError, EngineResult};

const DEFAULT_PLAYER_HEALTH: i32 = 5;

////////////////////
/// TOML STRUCTS ///
////////////////////

#[derive(Deserialize)]
struct WorldFile {
    world: WorldHeader,
    #[serde(default)]
    room: Vec<RoomConfig>, // [[room]] blocks
    #[serde(default)]
    object: Vec<ObjectConfig>, // [[object]] blocks
    #[serde(default)]
    npc: Vec<NpcConfig>,
    #[serde(default)]
    puzzle: Vec<PuzzleConfig>, // [[puzzle]]
}

#[derive(Deserialize)]
struct WorldHeader {
    id: String,
    name: String,
    start_room: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    player_name: Option<String>,
}

#[derive(Deserialize)]
struct RoomConfig {
    id: String,
    name: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    short_desc: String,
    #[serde(default)]
    flags: Vec<String>,
    /// Raw bits for world-specific flags with no name.
    #[serde(default)]
    flag_bits: u32,
    #[serde(default)]
    hook: Option<RoomHook>,

    #[serde(default)]
    exit: Vec<ExitConfig>, // [[room.exit]]
}

#[derive(Deserialize)]
struct ExitConfig {
    direction: String,
    target: String,
    #[serde(default)]
    locked: bool,
    #[serde(default)]
    key: Option<String>,
}

#[derive(Deserialize)]
struct ObjectConfig {
    id: String,
    name: String,

    /// Where the object starts: "room:kitchen", "inventory", "object:mailbox", "npc:thief".
    location: String,

    #[serde(default)]
    description: String,
    #[serde(default)]
    text: Option<String>,

    #[serde(default)]
    kind: Option<String>, // "simple", "container", "surface"
    #[serde(default)]
    capacity: Option<usize>,

    #[serde(default)]
    attrs: ObjectAttrs,
}

#[derive(Deserialize)]
struct NpcConfig {
    id: String,
    name: String,
    kind: NpcKind,
    room: String,

    #[serde(default)]
    description: String,
    #[serde(default = "default_true")]
    hostile: bool,
    #[serde(default)]
    health: Option<i32>,
    #[serde(default)]
    combat: Option<CombatProfile>,
    #[serde(default)]
    lair: Option<String>,
    #[serde(default)]
    blocks: Vec<String>,
    #[serde(default)]
    state: BTreeMap<String, bool>,
    #[serde(default)]
    roam: Option<RoamConfig>,
}

#[derive(Deserialize)]
struct RoamConfig {
    #[serde(default)]
    rooms: Vec<String>,
    #[serde(default)]
    appear_chance: f64,
    #[serde(default)]
    steal_chance: f64,
}

#[derive(Deserialize)]
struct PuzzleConfig {
    id: String,
    #[serde(default)]
    room: Option<String>,
    #[serde(default)]
    score: i32,
    #[serde(default)]
    done_text: Option<String>,
    #[serde(default)]
    stage: Vec<StageConfig>, // [[puzzle.stage]]
}

#[derive(Deserialize)]
struct StageConfig {
    /// "push button" is a phrase; "open:gate" is an action on a target.
    triggers: Vec<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    effects: Vec<String>,
}

// Helper for serde default
fn default_true() -> bool {
    true
}

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::InvalidWorld(msg.into())
}

/////////////////////////////
/// TOML PARSER FUNCTIONS ///
/////////////////////////////

/// Load a world from a .toml file on disk.
pub fn load_world_from_file(path: &Path) -> EngineResult<World> {
    let contents = fs::read_to_string(path)?;
    let world = load_world_from_str(&contents)?;
    info!(path = %path.display(), rooms = world.rooms.len(), "world loaded");
    Ok(world)
}

pub fn load_world_from_str(contents: &str) -> EngineResult<World> {
    let world_file: WorldFile = toml::from_str(contents)?;

    if world_file.world.id.trim().is_empty() {
        return Err(invalid("world.id may not be empty"));
    }
    if world_file.world.start_room.trim().is_empty() {
        return Err(invalid("world.start_room may not be empty"));
    }

    // Build rooms map
    let mut rooms_map: BTreeMap<String, Room> = BTreeMap::new();

    for room_cfg in world_file.room {
        if rooms_map.contains_key(&room_cfg.id) {
            return Err(invalid(format!("Duplicate room id: {}", room_cfg.id)));
        }

        let mut flags = RoomFlags::from_bits_retain(room_cfg.flag_bits);
        for name in &room_cfg.flags {
            match RoomFlags::parse_name(name) {
                Some(f) => flags.insert(f),
                None => return Err(invalid(format!("Room '{}' has unknown flag '{}'", room_cfg.id, name))),
            }
        }

        let mut exits = BTreeMap::new();
        for e in room_cfg.exit {
            let direction = Direction::parse(&e.direction)
                .ok_or_else(|| invalid(format!("Room '{}' has unknown exit direction '{}'", room_cfg.id, e.direction)))?;
            exits.insert(
                direction,
                Exit {
                    target: e.target,
                    locked: e.locked,
                    key: e.key,
                },
            );
        }

        let desc = normalize_multiline_desc(&room_cfg.desc);
        let short_desc = if room_cfg.short_desc.trim().is_empty() {
            first_sentence(&desc)
        } else {
            normalize_multiline_desc(&room_cfg.short_desc)
        };

        rooms_map.insert(
            room_cfg.id.clone(),
            Room {
                id: room_cfg.id,
                name: room_cfg.name,
                desc,
                short_desc,
                exits,
                flags,
                hook: room_cfg.hook,
            },
        );
    }

    // Ensure start_room exists
    let Some(start) = rooms_map.get_mut(&world_file.world.start_room) else {
        return Err(invalid(format!(
            "start_room '{}' not found among rooms",
            world_file.world.start_room
        )));
    };
    start.flags.insert(RoomFlags::VISITED);

    // Build objects map
    let mut objects_map: BTreeMap<String, GameObject> = BTreeMap::new();

    for oc in world_file.object {
        if objects_map.contains_key(&oc.id) {
            return Err(invalid(format!("Duplicate object id: {}", oc.id)));
        }

        let location = parse_location(&oc.location).map_err(invalid)?;

        let (primary_name, aliases) = parse_name_and_aliases(&oc.name);
        if primary_name.trim().is_empty() {
            return Err(invalid(format!("Object '{}' has an empty name", oc.id)));
        }

        let kind = parse_object_kind(&oc);
        let mut attrs = oc.attrs;
        if matches!(kind, ObjectKind::Container(ContainerProps { surface: true, .. })) {
            attrs.open = true;
        }

        objects_map.insert(
            oc.id.clone(),
            GameObject {
                id: oc.id,
                name: primary_name,
                aliases,
                description: normalize_multiline_desc(&oc.description),
                text: oc.text.map(|t| normalize_multiline_desc(&t)),
                kind,
                attrs,
                location,
            },
        );
    }

    // Build NPCs map
    let mut npcs_map: BTreeMap<String, Npc> = BTreeMap::new();

    for nc in world_file.npc {
        if npcs_map.contains_key(&nc.id) {
            return Err(invalid(format!("Duplicate npc id: {}", nc.id)));
        }

        if !rooms_map.contains_key(&nc.room) {
            return Err(invalid(format!("NPC '{}' room '{}' not found among rooms", nc.id, nc.room)));
        }

        let (primary_name, aliases) = parse_name_and_aliases(&nc.name);
        if primary_name.trim().is_empty() {
            return Err(invalid(format!("NPC '{}' has an empty name", nc.id)));
        }

        let mut blocks = Vec::new();
        for b in &nc.blocks {
            let dir = Direction::parse(b)
                .ok_or_else(|| invalid(format!("NPC '{}' blocks unknown direction '{}'", nc.id, b)))?;
            blocks.push(dir);
        }

        let roam = nc.roam.map(|r| NpcRoam {
            allowed_rooms: r.rooms,
            appear_chance: r.appear_chance.clamp(0.0, 1.0),
            steal_chance: r.steal_chance.clamp(0.0, 1.0),
        });

        let health = nc.health.unwrap_or_else(|| default_npc_health(nc.kind));

        npcs_map.insert(
            nc.id.clone(),
            Npc {
                id: nc.id,
                name: primary_name,
                aliases,
                description: normalize_multiline_desc(&nc.description),
                kind: nc.kind,
                hostile: nc.hostile,
                alive: true,
                health,
                max_health: health,
                staggered: false,
                room: Some(nc.room),
                combat: nc.combat.unwrap_or_else(|| CombatProfile::for_kind(nc.kind)),
                roam,
                lair: nc.lair,
                blocks,
                state: nc.state,
            },
        );
    }

    // Build puzzles
    let mut puzzle_defs: Vec<PuzzleDef> = Vec::new();

    for pc in world_file.puzzle {
        if pc.id.trim().is_empty() {
            return Err(invalid("puzzle.id may not be empty"));
        }
        if pc.stage.is_empty() {
            return Err(invalid(format!("Puzzle '{}' has no stages", pc.id)));
        }

        let mut stages = Vec::new();
        for sc in pc.stage {
            let triggers = sc.triggers.iter().map(|t| parse_trigger(t)).collect();
            let effects = sc
                .effects
                .iter()
                .map(|e| parse_effect(e))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|msg| invalid(format!("Puzzle '{}': {}", pc.id, msg)))?;
            stages.push(Stage {
                triggers,
                text: normalize_multiline_desc(&sc.text),
                effects,
            });
        }

        puzzle_defs.push(PuzzleDef {
            id: pc.id,
            room: pc.room,
            stages,
            score: pc.score,
            done_text: pc
                .done_text
                .map(|t| normalize_multiline_desc(&t))
                .unwrap_or_else(|| "You've already done that.".to_string()),
        });
    }

    Ok(World {
        id: world_file.world.id,
        name: world_file.world.name,
        desc: normalize_multiline_desc(&world_file.world.desc),
        start_room: world_file.world.start_room.clone(),
        rooms: rooms_map,
        objects: objects_map,
        npcs: npcs_map,
        player: new_player(
            world_file.world.player_name.as_deref().unwrap_or("adventurer"),
            &world_file.world.start_room,
        ),
        flags: BTreeSet::new(),
        puzzles: BTreeMap::new(),
        puzzle_defs,
        score: 0,
        dark_turns: 0,
        turn: 0,
        mode: Mode::Normal,
    })
}

/// The two-room world used when no world file is available.
pub fn fallback_world() -> World {
    let mut rooms = BTreeMap::new();
    let mut west_exits = BTreeMap::new();
    west_exits.insert(
        Direction::East,
        Exit {
            target: "kitchen".to_string(),
            locked: false,
            key: None,
        },
    );
    rooms.insert(
        "west_of_house".to_string(),
        Room {
            id: "west_of_house".to_string(),
            name: "West of House".to_string(),
            desc: "You are standing in an open field west of a white house, with a boarded front door."
                .to_string(),
            short_desc: "You are west of the white house.".to_string(),
            exits: west_exits,
            flags: RoomFlags::OUTDOORS | RoomFlags::VISITED,
            hook: None,
        },
    );

    let mut kitchen_exits = BTreeMap::new();
    kitchen_exits.insert(
        Direction::West,
        Exit {
            target: "west_of_house".to_string(),
            locked: false,
            key: None,
        },
    );
    rooms.insert(
        "kitchen".to_string(),
        Room {
            id: "kitchen".to_string(),
            name: "Kitchen".to_string(),
            desc: "You are in the kitchen of the white house. A table seems to have been used recently for the preparation of food.".to_string(),
            short_desc: "You are in the kitchen.".to_string(),
            exits: kitchen_exits,
            flags: RoomFlags::empty(),
            hook: None,
        },
    );

    World {
        id: "fallback".to_string(),
        name: "Phork".to_string(),
        desc: String::new(),
        start_room: "west_of_house".to_string(),
        rooms,
        objects: BTreeMap::new(),
        npcs: BTreeMap::new(),
        player: new_player("adventurer", "west_of_house"),
        flags: BTreeSet::new(),
        puzzles: BTreeMap::new(),
        puzzle_defs: Vec::new(),
        score: 0,
        dark_turns: 0,
        turn: 0,
        mode: Mode::Normal,
    }
}

fn new_player(name: &str, room: &str) -> Player {
    Player {
        name: name.to_string(),
        room: room.to_string(),
        health: DEFAULT_PLAYER_HEALTH,
        max_health: DEFAULT_PLAYER_HEALTH,
        alive: true,
        staggered: false,
        deaths: 0,
    }
}

fn default_npc_health(kind: NpcKind) -> i32 {
    match kind {
        NpcKind::Troll => 4,
        NpcKind::Thief => 3,
        NpcKind::Cyclops => 6,
        NpcKind::Villager => 2,
    }
}

fn normalize_multiline_desc(raw: &str) -> String {
    let mut result = String::new();
    let mut pending_blank_lines = 0usize;

    for line in raw.lines() {
        // Indentation in TOML doesn't affect what the player sees.
        let trimmed = line.trim();

        if trimmed.is_empty() {
            pending_blank_lines += 1;
            continue;
        }

        if !result.is_empty() {
            match pending_blank_lines {
                // Wrapped line: single newline in TOML -> space in output
                0 => result.push(' '),
                1 => result.push('\n'),
                _ => result.push_str("\n\n"),
            }
        }
        result.push_str(trimmed);
        pending_blank_lines = 0;
    }

    result
}

fn first_sentence(desc: &str) -> String {
    match desc.find(". ") {
        Some(idx) => desc[..=idx].to_string(),
        None => desc.to_string(),
    }
}

//////////////////////////////
/// OBJECT PARSE HELPERS   ///
//////////////////////////////

fn parse_location(s: &str) -> Result<Location, String> {
    let s = s.trim();

    if s.eq_ignore_ascii_case("inventory") {
        return Ok(Location::Inventory);
    }
    if s.eq_ignore_ascii_case("nowhere") {
        return Ok(Location::Nowhere);
    }

    let prefixed: [(&str, fn(String) -> Location); 3] = [
        ("room:", Location::Room),
        ("object:", Location::Inside),
        ("npc:", Location::Held),
    ];
    for (prefix, build) in prefixed {
        if let Some(rest) = s.strip_prefix(prefix) {
            let id = rest.trim();
            if id.is_empty() {
                return Err(format!("Invalid location '{}': empty id", s));
            }
            return Ok(build(id.to_string()));
        }
    }

    Err(format!(
        "Invalid location '{}': expected 'room:<id>', 'object:<id>', 'npc:<id>', 'inventory' or 'nowhere'",
        s
    ))
}

fn parse_object_kind(oc: &ObjectConfig) -> ObjectKind {
    match oc.kind.as_deref().map(|s| s.to_lowercase()) {
        Some(ref k) if k == "container" => ObjectKind::Container(ContainerProps {
            capacity: oc.capacity,
            surface: false,
        }),
        Some(ref k) if k == "surface" => ObjectKind::Container(ContainerProps {
            capacity: oc.capacity,
            surface: true,
        }),
        Some(ref k) if k == "simple" => ObjectKind::Simple,
        Some(ref k) if !k.is_empty() => {
            warn!(object = %oc.id, kind = %k, "unknown object kind, defaulting to simple");
            ObjectKind::Simple
        }
        _ => ObjectKind::Simple,
    }
}

fn parse_name_and_aliases(raw: &str) -> (String, Vec<String>) {
    // Split on | and keep non-empty trimmed parts
    let mut parts = raw.split('|').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    match parts.next() {
        Some(primary) => (primary, parts.collect()),
        None => (String::new(), Vec::new()),
    }
}

/// "verb:target" is an action trigger; anything else is a phrase.
fn parse_trigger(raw: &str) -> Trigger {
    match raw.split_once(':') {
        Some((verb, target)) if !verb.trim().is_empty() && !target.trim().is_empty() => {
            Trigger::action(verb.trim(), target.trim())
        }
        _ => Trigger::phrase(raw),
    }
}

/// - "flag"  => set
/// - "!flag" => clear
/// - "unlock:<room>:<direction>"
/// - "reveal:<object>:<room>"
fn parse_effect(raw: &str) -> Result<Effect, String> {
    let raw = raw.trim();
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();

    match parts.as_slice() {
        ["unlock", room, dir] => {
            let direction = Direction::parse(dir).ok_or_else(|| format!("unknown direction in effect '{}'", raw))?;
            Ok(Effect::UnlockExit {
                room: room.to_string(),
                direction,
            })
        }
        ["reveal", object, room] => Ok(Effect::Reveal {
            object: object.to_string(),
            room: room.to_string(),
        }),
        [single] if !single.is_empty() => match single.strip_prefix('!') {
            Some(name) => Ok(Effect::ClearFlag(name.to_string())),
            None => Ok(Effect::SetFlag(single.to_string())),
        },
        _ => Err(format!("malformed effect '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
        [world]
        id = "small"
        name = "Small"
        start_room = "yard"

        [[room]]
        id = "yard"
        name = "Yard"
        desc = """
            A small yard.
            Grass grows here.
        """
        flags = ["outdoors"]
        flag_bits = 4096

          [[room.exit]]
          direction = "n"
          target = "cellar"
          locked = true

        [[room]]
        id = "cellar"
        name = "Cellar"
        flags = ["dark"]

        [[object]]
        id = "mailbox"
        name = "mailbox|box"
        location = "room:yard"
        kind = "container"
        attrs = { takeable = false, locked = true }

        [[object]]
        id = "leaflet"
        name = "leaflet"
        location = "object:mailbox"
        text = "WELCOME"

        [[npc]]
        id = "troll"
        name = "troll"
        kind = "troll"
        room = "cellar"
        blocks = ["south"]

        [[puzzle]]
        id = "gate"
        score = 3
          [[puzzle.stage]]
          triggers = ["push button", "open:gate"]
          effects = ["gate_open", "unlock:yard:north"]
    "#;

    #[test]
    fn loads_rooms_objects_npcs_and_puzzles() {
        let world = load_world_from_str(SMALL).unwrap();

        let yard = &world.rooms["yard"];
        assert_eq!(yard.desc, "A small yard. Grass grows here.");
        assert!(yard.flags.contains(RoomFlags::OUTDOORS | RoomFlags::VISITED));
        assert!(yard.flags.contains(RoomFlags::from_bits_retain(0x1000)));
        assert!(yard.exits[&Direction::North].locked);
        assert!(world.rooms["cellar"].flags.contains(RoomFlags::DARK));

        let mailbox = &world.objects["mailbox"];
        assert!(mailbox.is_container());
        assert!(!mailbox.attrs.takeable);
        assert!(mailbox.attrs.locked);
        assert_eq!(mailbox.aliases, vec!["box".to_string()]);
        assert_eq!(world.objects["leaflet"].location, Location::Inside("mailbox".into()));
        assert_eq!(world.objects["leaflet"].attrs.osize, 1);

        let troll = &world.npcs["troll"];
        assert_eq!(troll.combat, CombatProfile::for_kind(NpcKind::Troll));
        assert_eq!(troll.blocks, vec![Direction::South]);

        let gate = &world.puzzle_defs[0];
        assert_eq!(gate.stages[0].triggers[1], Trigger::action("open", "gate"));
        assert_eq!(gate.stages[0].effects[0], Effect::SetFlag("gate_open".into()));
        assert_eq!(world.player.room, "yard");
    }

    #[test]
    fn rejects_missing_start_room() {
        let src = "[world]\nid = \"x\"\nname = \"X\"\nstart_room = \"nowhere\"\n";
        assert!(matches!(load_world_from_str(src), Err(EngineError::InvalidWorld(_))));
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(load_world_from_str("[world"), Err(EngineError::Toml(_))));
    }

    #[test]
    fn effect_strings() {
        assert_eq!(parse_effect("!lit"), Ok(Effect::ClearFlag("lit".into())));
        assert_eq!(
            parse_effect("reveal:egg:nest"),
            Ok(Effect::Reveal {
                object: "egg".into(),
                room: "nest".into()
            })
        );
        assert!(parse_effect("unlock:yard:sideways").is_err());
    }
}
