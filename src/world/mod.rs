mod graph;
mod loader;
mod model;
pub mod persistence;
mod validator;

pub use graph::{Arrival, Found, LockError, NavError, Scope, TransferError, normalize_name};
pub use loader::{fallback_world, load_world_from_file, load_world_from_str};

pub use model::{
    CombatProfile, ContainerProps, Direction, Effect, Exit, GameObject, Location, Mode, Npc, NpcId, NpcKind,
    NpcRoam, ObjectAttrs, ObjectId, ObjectKind, Player, PuzzleDef, PuzzleState, Room, RoomFlags, RoomHook, RoomId,
    Stage, Trigger, World,
};
pub use validator::{ValidationError, validate_world};
