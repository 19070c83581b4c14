use super::model::{Effect, Location, World};

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    fn new(msg: impl Into<String>) -> Self {
        ValidationError {
            message: msg.into(),
        }
    }
}

/// Reports dangling references. The engine survives all of these at runtime,
/// but they are almost always authoring mistakes.
pub fn validate_world(world: &World) -> Vec<ValidationError> {
    let mut errors: Vec<ValidationError> = Vec::new();

    if world.rooms.is_empty() {
        errors.push(ValidationError::new("world has no rooms"));
    }

    if !world.rooms.contains_key(&world.start_room) {
        errors.push(ValidationError::new(format!(
            "start_room '{}' not found among rooms",
            world.start_room
        )));
    }

    // Validate exits
    for (room_id, room) in &world.rooms {
        for (dir, exit) in &room.exits {
            if !world.rooms.contains_key(&exit.target) {
                errors.push(ValidationError::new(format!(
                    "room '{}' exit '{}' targets missing room '{}'",
                    room_id,
                    dir.name(),
                    exit.target
                )));
            }
            if let Some(key) = &exit.key {
                if !world.objects.contains_key(key) {
                    errors.push(ValidationError::new(format!(
                        "room '{}' exit '{}' needs missing key '{}'",
                        room_id,
                        dir.name(),
                        key
                    )));
                }
            }
        }
    }

    // Validate object locations
    for obj in world.objects.values() {
        match &obj.location {
            Location::Room(r) => {
                if !world.rooms.contains_key(r) {
                    errors.push(ValidationError::new(format!(
                        "object '{}' location room '{}' not found",
                        obj.id, r
                    )));
                }
            }
            Location::Inside(parent) => {
                if parent == &obj.id {
                    errors.push(ValidationError::new(format!(
                        "object '{}' cannot start inside itself",
                        obj.id
                    )));
                }
                match world.objects.get(parent) {
                    None => errors.push(ValidationError::new(format!(
                        "object '{}' location object '{}' not found",
                        obj.id, parent
                    ))),
                    Some(p) if !p.is_container() => errors.push(ValidationError::new(format!(
                        "object '{}' is inside '{}', which is not a container",
                        obj.id, parent
                    ))),
                    Some(_) => {}
                }
            }
            Location::Held(npc_id) => {
                if !world.npcs.contains_key(npc_id) {
                    errors.push(ValidationError::new(format!(
                        "object '{}' location npc '{}' not found",
                        obj.id, npc_id
                    )));
                }
            }
            Location::Inventory | Location::Nowhere => {}
        }

        if let Some(key) = &obj.attrs.key {
            if !world.objects.contains_key(key) {
                errors.push(ValidationError::new(format!(
                    "object '{}' needs missing key '{}'",
                    obj.id, key
                )));
            }
        }
    }

    // Validate NPCs
    for (npc_id, npc) in &world.npcs {
        let rooms = npc.room.iter().chain(npc.lair.iter());
        let roam_rooms = npc.roam.iter().flat_map(|r| r.allowed_rooms.iter());
        for r in rooms.chain(roam_rooms) {
            if !world.rooms.contains_key(r) {
                errors.push(ValidationError::new(format!(
                    "npc '{}' references missing room '{}'",
                    npc_id, r
                )));
            }
        }
    }

    // Validate puzzles
    for def in &world.puzzle_defs {
        if let Some(r) = &def.room {
            if !world.rooms.contains_key(r) {
                errors.push(ValidationError::new(format!(
                    "puzzle '{}' room '{}' not found",
                    def.id, r
                )));
            }
        }
        for effect in def.stages.iter().flat_map(|s| s.effects.iter()) {
            match effect {
                Effect::UnlockExit { room, direction } => {
                    let has_exit = world
                        .rooms
                        .get(room)
                        .map(|r| r.exits.contains_key(direction))
                        .unwrap_or(false);
                    if !has_exit {
                        errors.push(ValidationError::new(format!(
                            "puzzle '{}' unlocks missing exit '{}' in room '{}'",
                            def.id,
                            direction.name(),
                            room
                        )));
                    }
                }
                Effect::Reveal { object, room } => {
                    if !world.objects.contains_key(object) || !world.rooms.contains_key(room) {
                        errors.push(ValidationError::new(format!(
                            "puzzle '{}' reveals '{}' into '{}', but one of them is missing",
                            def.id, object, room
                        )));
                    }
                }
                Effect::SetFlag(_) | Effect::ClearFlag(_) => {}
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::fallback_world;

    #[test]
    fn fallback_world_is_clean() {
        assert!(validate_world(&fallback_world()).is_empty());
    }

    #[test]
    fn reports_dangling_exit() {
        let mut world = fallback_world();
        for exit in world.rooms.get_mut("kitchen").unwrap().exits.values_mut() {
            exit.target = "attic".into();
        }
        let errors = validate_world(&world);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("attic"));
    }
}
