//! Save/restore of the whole world aggregate.
//!
//! Saves are JSON wrapped in a versioned envelope. Decoding always completes
//! before anything is handed back, so a failed restore never touches live state.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::model::World;
use crate::error::{EngineError, EngineResult};

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

#[derive(Serialize)]
struct SaveFileRef<'a> {
    version: u32,
    world: &'a World,
}

#[derive(Deserialize)]
struct SaveFile {
    version: u32,
    world: World,
}

pub fn save_to_bytes(world: &World) -> EngineResult<Vec<u8>> {
    let save = SaveFileRef {
        version: SAVE_VERSION,
        world,
    };
    Ok(serde_json::to_vec_pretty(&save)?)
}

pub fn load_from_bytes(bytes: &[u8]) -> EngineResult<World> {
    let save: SaveFile = serde_json::from_slice(bytes)?;

    if save.version != SAVE_VERSION {
        return Err(EngineError::UnsupportedSave {
            found: save.version,
            expected: SAVE_VERSION,
        });
    }

    Ok(save.world)
}

pub fn save_to_file(world: &World, path: &Path) -> EngineResult<()> {
    let bytes = save_to_bytes(world)?;
    fs::write(path, bytes)?;
    info!(path = %path.display(), turn = world.turn, "game saved");
    Ok(())
}

pub fn load_from_file(path: &Path) -> EngineResult<World> {
    let bytes = fs::read(path)?;
    let world = load_from_bytes(&bytes)?;
    info!(path = %path.display(), turn = world.turn, "game restored");
    Ok(world)
}
