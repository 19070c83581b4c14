pub mod combat;
pub mod hazard;
mod items;
mod movement;
pub mod npcs;
mod output;
pub mod parser;
pub mod puzzles;
mod render;

pub use combat::{Dice, Exchange, ScriptedDice, SeededDice, combat_round};
pub use hazard::{GRUE_DEATH, GRUE_WARNING, Hazard, check_darkness};
pub use items::{
    handle_attack_object, handle_close, handle_dig, handle_drop, handle_drop_all, handle_eat, handle_examine,
    handle_extinguish, handle_inventory, handle_light, handle_lock, handle_look_through, handle_open, handle_poke,
    handle_put, handle_read, handle_search, handle_sleep, handle_take, handle_take_all, handle_take_from, handle_tie,
    handle_wake,
};
pub(crate) use items::resolve;
pub use movement::{handle_listen, handle_move, handle_say, room_tick};
pub use npcs::{handle_give, handle_offer, handle_talk, roam_npcs};
pub use output::{Failure, Output, OutputBlock};
pub use parser::{Command, Prep, parse_command};
pub use puzzles::{NOTHING_HAPPENS, PuzzleOutcome, PuzzleRegistry};
pub use render::{list_contents, render_room, with_article};
