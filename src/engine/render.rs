use crate::engine::output::Output;
use crate::world::{GameObject, World};

/// Render the player's room. `verbose` picks the long description.
pub fn render_room(out: &mut Output, world: &World, verbose: bool) {
    let room = match world.current_room() {
        Some(r) => r,
        None => {
            out.say(format!("Error: you are in an unknown room '{}'", world.player.room));
            return;
        }
    };

    out.title(room.name.clone());

    if world.is_dark() {
        out.say("It is pitch black. You can't see a thing.");
        return;
    }

    let mut room_desc = String::new();
    if verbose || room.short_desc.trim().is_empty() {
        room_desc.push_str(room.desc.trim());
    } else {
        room_desc.push_str(room.short_desc.trim());
    }
    out.say(room_desc);

    for obj in world.objects_in(&room.id) {
        if !obj.attrs.visible {
            continue;
        }
        out.say(format!("There is {} here.", with_article(&obj.name)));
        if obj.is_accessible() {
            if let Some(line) = list_contents(world, obj) {
                out.say(line);
            }
        }
    }

    for npc in world.npcs_in(&room.id) {
        if npc.flag("asleep") {
            out.say(format!("The {} is here, fast asleep.", npc.name));
        } else {
            out.say(format!("The {} is here.", npc.name));
        }
    }

    if room.exits.is_empty() {
        out.set_exits("Exits: (none)");
    } else {
        let list = room
            .exits
            .keys()
            .map(|d| d.name())
            .collect::<Vec<&str>>()
            .join(", ");
        out.set_exits(format!("Exits: {}", list));
    }
}

/// "Inside the box you see: a, b." for an accessible container with contents.
pub fn list_contents(world: &World, container: &GameObject) -> Option<String> {
    let contents: Vec<&str> = world
        .contents(&container.id)
        .into_iter()
        .filter(|o| o.attrs.visible)
        .map(|o| o.name.as_str())
        .collect();

    if contents.is_empty() {
        return None;
    }

    let lead = if container.is_surface() { "On" } else { "Inside" };
    Some(format!("{} the {} you see: {}.", lead, container.name, contents.join(", ")))
}

pub fn with_article(name: &str) -> String {
    match name.chars().next() {
        Some(c) if "aeiouAEIOU".contains(c) => format!("an {}", name),
        _ => format!("a {}", name),
    }
}
