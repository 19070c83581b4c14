pub mod config;
pub mod engine;
pub mod error;
pub mod world;

use std::path::PathBuf;

use tracing::{info, warn};

use engine::{
    Command, Dice, Exchange, Failure, Hazard, Output, PuzzleRegistry, SeededDice, check_darkness, combat_round,
    handle_attack_object, handle_close, handle_dig, handle_drop, handle_drop_all, handle_eat, handle_examine,
    handle_extinguish, handle_give, handle_inventory, handle_light, handle_listen, handle_lock, handle_look_through,
    handle_move, handle_offer, handle_open, handle_poke, handle_put, handle_read, handle_say, handle_search,
    handle_sleep, handle_take, handle_take_all, handle_take_from, handle_talk, handle_tie, handle_wake,
    parse_command, render_room, roam_npcs, room_tick,
};
use world::{Found, Location, Mode, Scope, Trigger, World, persistence};

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use world::{fallback_world, load_world_from_file, load_world_from_str};

/// Where the session is in the life of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Playing,
    /// Waiting on continue / restart / restore / quit.
    Dead,
    /// Out of lives; continue is no longer offered.
    Over,
}

const HELP: &[(&str, &str)] = &[
    ("north, south, east, west, up, down, in, out (n, s, e, w, u, d)", "Move in a direction."),
    ("look (l)", "Describe your surroundings."),
    ("examine <object> (x)", "Look closely at something."),
    ("search <object> / look in <object>", "Look inside something."),
    ("read <object>", "Read what is written on something."),
    ("take <object> / take all / take <object> from <container>", "Pick things up."),
    ("drop <object> / drop all", "Put things down."),
    ("put <object> in|on <container>", "Store something."),
    ("open / close <object>", "Open or close a container or door."),
    ("lock / unlock <object|direction> [with <key>]", "Work a lock."),
    ("light / extinguish <object>", "Turn a light source on or off."),
    ("give <object> to <someone> / bribe <someone> with <object>", "Hand something over."),
    ("attack <someone> [with <weapon>]", "Fight."),
    ("talk to <someone> / say <words>", "Speak."),
    ("inventory (i)", "List what you carry."),
    ("wait (z) / listen", "Let time pass."),
    ("score / diagnose", "Check your progress and health."),
    ("save [file] / restore [file] / restart", "Manage your game."),
    ("quit (q)", "Leave the game."),
];

pub struct GameState {
    pub world: World,
    pub config: EngineConfig,
    pub phase: Phase,
    registry: PuzzleRegistry,
    dice: Box<dyn Dice>,
    initial: World,
}

#[cfg(feature = "wasm")]
mod wasm_bindings {
    use super::*;
    use serde::Serialize;
    use serde_wasm_bindgen::to_value;
    use wasm_bindgen::prelude::*;

    #[derive(Serialize)]
    struct WasmStepResult {
        blocks: Vec<engine::OutputBlock>,
        quit: bool,
    }

    #[wasm_bindgen]
    pub struct WasmGame {
        state: GameState,
        initialized: bool,
    }

    #[wasm_bindgen]
    impl WasmGame {
        /// Create a new game from a TOML world string. Call `init()` to get the initial render.
        #[wasm_bindgen(constructor)]
        pub fn new(world_toml: &str) -> Result<WasmGame, JsValue> {
            let world = load_world_from_str(world_toml).map_err(|e| JsValue::from_str(&e.to_string()))?;
            Ok(WasmGame {
                state: GameState::new(world, EngineConfig::default()),
                initialized: false,
            })
        }

        /// Initialize the game and return the initial render output.
        #[wasm_bindgen]
        pub fn init(&mut self) -> JsValue {
            self.initialized = true;
            match self.state.initialize() {
                Some(out) => to_value(&WasmStepResult {
                    blocks: out.blocks,
                    quit: false,
                })
                .unwrap_or(JsValue::NULL),
                None => JsValue::NULL,
            }
        }

        /// Process a player command and return the resulting output blocks and quit flag.
        #[wasm_bindgen]
        pub fn step(&mut self, input: &str) -> JsValue {
            if !self.initialized {
                let _ = self.init();
            }
            let (out, quit) = self.state.step(input);
            to_value(&WasmStepResult {
                blocks: out.blocks,
                quit,
            })
            .unwrap_or(JsValue::NULL)
        }
    }
}

impl GameState {
    /// A fresh session. Dice are seeded from `config.seed`, or from entropy if unset.
    pub fn new(world: World, config: EngineConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut world = world;
        world.player.health = config.player_health;
        world.player.max_health = config.player_health;
        if config.demo_mode {
            world.mode = Mode::Demo;
        }

        GameState {
            registry: PuzzleRegistry::for_world(&world),
            initial: world.clone(),
            world,
            config,
            phase: Phase::Playing,
            dice: Box::new(SeededDice::new(seed)),
        }
    }

    /// Replace the dice, e.g. with `ScriptedDice` in tests.
    pub fn with_dice(mut self, dice: Box<dyn Dice>) -> Self {
        self.dice = dice;
        self
    }

    pub fn registry(&self) -> &PuzzleRegistry {
        &self.registry
    }

    /// The opening render of the start room.
    pub fn initialize(&mut self) -> Option<Output> {
        self.world.current_room()?;
        let mut out = Output::new();
        render_room(&mut out, &self.world, true);
        Some(out)
    }

    /// Process a single player input; returns (output, quit?)
    pub fn step(&mut self, input: &str) -> (Output, bool) {
        let mut out = Output::new();
        let cmd = parse_command(input);

        if self.phase != Phase::Playing {
            let quit = self.step_dead(&mut out, cmd);
            return (out, quit);
        }

        let mut consumes = cmd.consumes_turn();
        let quit = match cmd {
            Command::Unknown(line) => {
                consumes = self.phrase(&mut out, &line);
                false
            }
            other => self.dispatch(&mut out, other),
        };

        let alive = self.world.player.health > 0;
        if consumes && alive && !out.failed() && self.phase == Phase::Playing {
            self.end_turn(&mut out);
        }
        if self.phase == Phase::Playing && self.world.player.health <= 0 {
            self.die(&mut out);
        }
        (out, quit)
    }

    /// Returns true when the session should end.
    fn dispatch(&mut self, out: &mut Output, cmd: Command) -> bool {
        let world = &mut self.world;
        let reg = &self.registry;
        let cfg = &self.config;

        match cmd {
            Command::Move(dir) => handle_move(out, world, reg, dir),
            Command::Look => render_room(out, world, true),
            Command::Examine(s) => handle_examine(out, world, &s),
            Command::Search(s) => handle_search(out, world, &s),
            Command::LookThrough(s) => handle_look_through(out, world, &s),
            Command::Read(s) => handle_read(out, world, &s),
            Command::Inventory => handle_inventory(out, world),
            Command::Take(s) => handle_take(out, world, reg, cfg, &s),
            Command::TakeAll => handle_take_all(out, world, reg, cfg),
            Command::TakeFrom { item, container } => handle_take_from(out, world, reg, cfg, &item, &container),
            Command::Drop(s) => handle_drop(out, world, &s),
            Command::DropAll => handle_drop_all(out, world),
            Command::Put { item, container, prep } => handle_put(out, world, reg, &item, &container, prep),
            Command::Open(s) => handle_open(out, world, reg, &s),
            Command::Close(s) => handle_close(out, world, &s),
            Command::Lock { target, key } => handle_lock(out, world, reg, &target, key.as_deref(), true),
            Command::Unlock { target, key } => handle_lock(out, world, reg, &target, key.as_deref(), false),
            Command::Light(s) => handle_light(out, world, reg, &s),
            Command::Extinguish(s) => handle_extinguish(out, world, &s),
            Command::Give { item, npc } => handle_give(out, world, reg, &item, &npc, false),
            Command::Bribe { npc, item } => handle_give(out, world, reg, &item, &npc, true),
            Command::Offer { words, bribe } => handle_offer(out, world, reg, &words, bribe),
            Command::Attack { target, weapon } => self.attack(out, &target, weapon.as_deref()),
            Command::Talk(s) => handle_talk(out, world, reg, &s),
            Command::Say(s) => handle_say(out, world, reg, &s),
            Command::Tie { item, to } => handle_tie(out, world, reg, &item, to.as_deref()),
            Command::Poke(s) => handle_poke(out, world, reg, &s),
            Command::Eat(s) => handle_eat(out, world, &s),
            Command::Dig(s) => handle_dig(out, world, reg, &s),
            Command::Wake(s) => handle_wake(out, world, &s),
            Command::Sleep(s) => handle_sleep(out, world, &s),
            Command::Wait => out.say("Time passes..."),
            Command::Listen => handle_listen(out, world),
            Command::Score => out.say(format!("Your score is {} in {} moves.", world.score, world.turn)),
            Command::Help => help(out),
            Command::Diagnose => self.diagnose(out),
            Command::Save(path) => self.save(out, path),
            Command::Restore(path) => self.restore(out, path),
            Command::Restart => self.restart(out),
            Command::Quit => {
                out.say("Goodbye.");
                return true;
            }
            Command::Demo => self.toggle_demo(out),
            Command::Continue => out.fail(Failure::Resolution, "You aren't dead yet."),
            Command::Incomplete(question) => out.fail(Failure::Resolution, question),
            Command::Unknown(line) => {
                self.phrase(out, &line);
            }
        }
        false
    }

    /// Free-form input: offered to the puzzles as a phrase. Returns true when a
    /// puzzle took it, which makes it cost a turn.
    fn phrase(&mut self, out: &mut Output, line: &str) -> bool {
        if line.is_empty() {
            out.fail(Failure::Resolution, "I beg your pardon?");
            return false;
        }
        let outcome = self.registry.fire(out, &mut self.world, &Trigger::phrase(line));
        if !outcome.matched() {
            out.fail(Failure::Resolution, "I don't understand that command.");
        }
        outcome.matched()
    }

    /// Hazard check once, then the world moves on.
    fn end_turn(&mut self, out: &mut Output) {
        self.world.turn += 1;

        if check_darkness(out, &mut self.world, &self.config) == Hazard::Killed {
            self.registry.notify(out, &mut self.world, &Trigger::action("eaten", "grue"));
            return;
        }

        roam_npcs(out, &mut self.world, self.dice.as_mut());
        room_tick(out, &self.world);
    }

    fn attack(&mut self, out: &mut Output, target: &str, weapon: Option<&str>) {
        let weapon_name = match weapon {
            Some(w) => match self.world.find_entity(w, Scope::INVENTORY) {
                Found::Object(id) => self.world.objects.get(&id).map(|o| o.name.clone()),
                _ => {
                    out.fail(Failure::Resolution, format!("You don't have the {}.", w));
                    return;
                }
            },
            None => None,
        };

        match engine::resolve(out, &self.world, target, Scope::VISIBLE) {
            Some(Found::Npc(id)) => {
                let exchange = combat_round(out, &mut self.world, &id, weapon_name.as_deref(), self.dice.as_mut());
                if exchange == Exchange::NpcDefeated {
                    self.registry.notify(out, &mut self.world, &Trigger::action("kill", &id));
                }
            }
            Some(Found::Object(id)) => handle_attack_object(out, &self.world, &id),
            _ => {}
        }
    }

    fn diagnose(&self, out: &mut Output) {
        let p = &self.world.player;
        if p.health >= p.max_health {
            out.say("You are in perfect health.");
        } else {
            out.say(format!("You have {} of {} health.", p.health, p.max_health));
        }
        if p.staggered {
            out.say("You are still reeling from the last blow.");
        }
        match p.deaths {
            0 => {}
            1 => out.say("You have been killed once."),
            n => out.say(format!("You have been killed {} times.", n)),
        }
    }

    fn toggle_demo(&mut self, out: &mut Output) {
        self.world.mode = match self.world.mode {
            Mode::Normal => {
                out.say("Demo mode on. Carry limits are lifted.");
                Mode::Demo
            }
            Mode::Demo => {
                out.say("Demo mode off.");
                Mode::Normal
            }
        };
    }

    /////////////////////
    /// DEATH / LIVES ///
    /////////////////////

    fn die(&mut self, out: &mut Output) {
        let player = &mut self.world.player;
        player.alive = false;
        player.health = 0;
        player.deaths += 1;
        info!(deaths = player.deaths, room = %player.room, "player died");

        out.event("You have died.");
        if player.deaths >= self.config.max_deaths {
            self.phase = Phase::Over;
            out.say("Your adventure is over.");
            out.say(format!("Your final score is {}.", self.world.score));
            out.say("You may restart, restore, or quit.");
        } else {
            self.phase = Phase::Dead;
            out.say("Type 'continue' to be resurrected, or restart, restore, or quit.");
        }
    }

    fn step_dead(&mut self, out: &mut Output, cmd: Command) -> bool {
        match cmd {
            Command::Quit => {
                out.say("Goodbye.");
                return true;
            }
            Command::Restart => self.restart(out),
            Command::Restore(path) => self.restore(out, path),
            Command::Continue if self.phase == Phase::Dead => self.resurrect(out),
            _ if self.phase == Phase::Over => {
                out.fail(Failure::Resolution, "Your adventure is over. You may restart, restore, or quit.");
            }
            _ => out.fail(
                Failure::Resolution,
                "You are dead. You may continue, restart, restore, or quit.",
            ),
        }
        false
    }

    /// Back on your feet at the start, with your belongings left where you fell.
    fn resurrect(&mut self, out: &mut Output) {
        let died_in = self.world.player.room.clone();
        let carried: Vec<String> = self.world.inventory().iter().map(|o| o.id.clone()).collect();
        for id in carried {
            if let Err(e) = self
                .world
                .transfer_object(&id, &Location::Inventory, Location::Room(died_in.clone()))
            {
                warn!(object = %id, room = %died_in, error = ?e, "could not leave item behind");
            }
        }

        let player = &mut self.world.player;
        player.alive = true;
        player.health = player.max_health;
        player.staggered = false;
        player.room = self.world.start_room.clone();
        self.world.dark_turns = 0;
        self.phase = Phase::Playing;
        info!(room = %self.world.start_room, "player resurrected");

        out.say("You feel strangely disoriented.");
        render_room(out, &self.world, true);
    }

    ///////////////////////
    /// SESSION CONTROL ///
    ///////////////////////

    fn save_path(&self, path: Option<String>) -> PathBuf {
        path.map(PathBuf::from).unwrap_or_else(|| self.config.save_path.clone())
    }

    fn save(&mut self, out: &mut Output, path: Option<String>) {
        let path = self.save_path(path);
        match persistence::save_to_file(&self.world, &path) {
            Ok(()) => out.say("Saved."),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "save failed");
                out.fail(Failure::Persistence, format!("Save failed: {}", e));
            }
        }
    }

    /// Decodes fully before touching the live world.
    fn restore(&mut self, out: &mut Output, path: Option<String>) {
        let path = self.save_path(path);
        match persistence::load_from_file(&path) {
            Ok(world) => {
                self.world = world;
                self.registry = PuzzleRegistry::for_world(&self.world);
                self.phase = Phase::Playing;
                out.say("Restored.");
                render_room(out, &self.world, true);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "restore failed");
                out.fail(Failure::Persistence, format!("Restore failed: {}", e));
            }
        }
    }

    fn restart(&mut self, out: &mut Output) {
        self.world = self.initial.clone();
        self.registry = PuzzleRegistry::for_world(&self.world);
        self.phase = Phase::Playing;
        info!("game restarted");
        out.say("Restarting.");
        render_room(out, &self.world, true);
    }
}

fn help(out: &mut Output) {
    out.say("Available Commands:");
    for (usage, what) in HELP {
        out.say(format!("  Usage: {}  {}", usage, what));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptedDice;
    use crate::world::{CombatProfile, GameObject, Npc, NpcKind, NpcRoam, ObjectAttrs, ObjectKind};

    fn game() -> GameState {
        GameState::new(fallback_world(), EngineConfig::default()).with_dice(Box::new(ScriptedDice::constant(0.99)))
    }

    #[test]
    fn failed_commands_do_not_advance_turns() {
        let mut g = game();
        g.step("north");
        g.step("take unicorn");
        g.step("frobnicate");
        g.step("inventory");
        assert_eq!(g.world.turn, 0);

        g.step("east");
        g.step("wait");
        assert_eq!(g.world.turn, 2);
    }

    #[test]
    fn phrase_puzzle_costs_a_turn() {
        let mut g = game();
        let (out, _) = g.step("push button");
        assert!(out.contains("You hear a distant click."));
        assert_eq!(g.world.score, 7);
        assert_eq!(g.world.turn, 1);
    }

    #[test]
    fn dead_players_only_continue_restart_restore_or_quit() {
        let mut g = game();
        g.world.player.health = 0;
        let (out, _) = g.step("wait");
        assert!(out.contains("You have died."));
        assert_eq!(g.phase, Phase::Dead);

        let (out, quit) = g.step("look");
        assert!(out.failed());
        assert!(!quit);

        let (out, _) = g.step("continue");
        assert!(out.contains("You feel strangely disoriented."));
        assert_eq!(g.phase, Phase::Playing);
        assert_eq!(g.world.player.health, g.world.player.max_health);
    }

    fn npc_here(world: &mut World, id: &str, kind: NpcKind) {
        let room = world.player.room.clone();
        world.npcs.insert(
            id.into(),
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
                room: Some(room),
                combat: CombatProfile::for_kind(kind),
                roam: None,
                lair: None,
                blocks: Vec::new(),
                state: Default::default(),
            },
        );
    }

    #[test]
    fn nothing_happens_to_a_player_killed_in_combat() {
        let mut world = fallback_world();
        npc_here(&mut world, "troll", NpcKind::Troll);
        npc_here(&mut world, "thief", NpcKind::Thief);
        if let Some(thief) = world.npcs.get_mut("thief") {
            thief.roam = Some(NpcRoam {
                allowed_rooms: Vec::new(),
                appear_chance: 1.0,
                steal_chance: 1.0,
            });
        }
        world.objects.insert(
            "jewel".into(),
            GameObject {
                id: "jewel".into(),
                name: "jewel".into(),
                aliases: Vec::new(),
                description: String::new(),
                text: None,
                kind: ObjectKind::Simple,
                attrs: ObjectAttrs {
                    treasure: true,
                    ..Default::default()
                },
                location: Location::Inventory,
            },
        );
        let mut g = GameState::new(world, EngineConfig::default())
            .with_dice(Box::new(ScriptedDice::new([0.95, 0.0, 0.0])));

        let (out, _) = g.step("attack troll");
        assert!(out.contains("The troll kills you!"));
        assert!(out.contains("You have died."));
        assert!(!out.contains("snatches"));
        assert_eq!(g.world.objects["jewel"].location, Location::Inventory);
        assert_eq!(g.world.turn, 0);

        g.step("continue");
        assert_eq!(g.world.objects["jewel"].location, Location::Room("west_of_house".into()));
    }

    #[test]
    fn last_death_ends_the_adventure() {
        let mut g = game();
        g.config.max_deaths = 1;
        g.world.player.health = 0;
        let (out, _) = g.step("wait");
        assert!(out.contains("Your adventure is over."));
        assert_eq!(g.phase, Phase::Over);

        let (out, _) = g.step("continue");
        assert!(out.failed());
        assert_eq!(g.phase, Phase::Over);

        let (_, quit) = g.step("quit");
        assert!(quit);
    }

    #[test]
    fn help_lists_usage() {
        let mut g = game();
        let (out, _) = g.step("help");
        assert!(out.contains("Available Commands:"));
        assert!(out.contains("Usage:"));
    }

    #[test]
    fn restart_restores_the_opening_world() {
        let mut g = game();
        g.step("east");
        g.step("push button");
        let (out, _) = g.step("restart");
        assert!(out.contains("West of House"));
        assert_eq!(g.world.player.room, "west_of_house");
        assert_eq!(g.world.score, 0);
    }

    #[test]
    fn demo_toggles_mode() {
        let mut g = game();
        g.step("demo");
        assert_eq!(g.world.mode, Mode::Demo);
        g.step("demo");
        assert_eq!(g.world.mode, Mode::Normal);
    }
}
