//! One-shot and multi-stage puzzle rewards, keyed by triggers.

use tracing::{debug, info, warn};

use crate::engine::output::Output;
use crate::world::{Direction, Effect, Location, LockError, PuzzleDef, Stage, Trigger, World};

pub const NOTHING_HAPPENS: &str = "Nothing happens.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuzzleOutcome {
    /// No puzzle listens for this trigger here.
    Unmatched,
    Advanced,
    Completed,
    AlreadyDone,
    /// The trigger belongs to a stage that isn't current.
    OutOfOrder,
}

impl PuzzleOutcome {
    pub fn matched(self) -> bool {
        self != PuzzleOutcome::Unmatched
    }
}

#[derive(Debug, Clone, Default)]
pub struct PuzzleRegistry {
    defs: Vec<PuzzleDef>,
}

fn single(id: &str, triggers: Vec<Trigger>, text: &str, score: i32) -> PuzzleDef {
    PuzzleDef {
        id: id.to_string(),
        room: None,
        stages: vec![Stage {
            triggers,
            text: text.to_string(),
            effects: Vec::new(),
        }],
        score,
        done_text: "You've already done that.".to_string(),
    }
}

impl PuzzleRegistry {
    /// The classic scoring table.
    pub fn standard() -> Self {
        let act = Trigger::action;
        let phrase = Trigger::phrase;

        let mut defs = vec![
            single("mailbox", vec![act("open", "mailbox")], "", 1),
            single("lantern", vec![act("light", "lantern"), act("light", "lamp")], "", 2),
            single("trap_door", vec![act("open", "trap_door")], "", 4),
            single("troll_bridge", vec![act("pay", "troll"), act("kill", "troll")], "The way across the bridge is clear.", 5),
            single("button", vec![phrase("push button"), phrase("press button")], "You hear a distant click.", 7),
            single("dial", vec![phrase("turn dial"), phrase("spin dial")], "The dial clicks into place.", 5),
            single("cyclops", vec![act("feed", "cyclops"), act("kill", "cyclops")], "", 7),
            single("thief", vec![act("appease", "thief"), act("kill", "thief")], "", 9),
            single("egg", vec![act("take", "egg")], "", 5),
            single("trophy_case", vec![act("put", "trophy_case")], "", 10),
            single("rainbow", vec![phrase("wave sceptre"), phrase("wave scepter")], "Suddenly, the rainbow appears to become solid.", 4),
            single("volcano", vec![phrase("inflate balloon")], "The balloon fills and begins to rise.", 11),
            single("victory", vec![act("enter", "stone_barrow")], "", 35),
            single("grue", vec![act("eaten", "grue")], "", -5),
        ];

        defs.push(PuzzleDef {
            id: "dam".to_string(),
            room: Some("dam".to_string()),
            stages: vec![
                Stage {
                    triggers: vec![phrase("push yellow button")],
                    text: "Click. The green bubble on the control panel is glowing.".to_string(),
                    effects: vec![Effect::SetFlag("dam_bolt_free".to_string())],
                },
                Stage {
                    triggers: vec![phrase("turn bolt"), phrase("turn bolt with wrench")],
                    text: "The sluice gates open and water pours through the dam.".to_string(),
                    effects: vec![Effect::SetFlag("dam_open".to_string())],
                },
            ],
            score: 10,
            done_text: "The sluice gates are already open.".to_string(),
        });

        for dir in Direction::ALL {
            defs.push(single(
                &format!("unlock_door_{}", dir.name()),
                vec![act("unlock", dir.name())],
                "",
                2,
            ));
        }

        PuzzleRegistry { defs }
    }

    /// Standard table plus the world's own puzzles. A world puzzle replaces a
    /// standard one with the same id.
    pub fn for_world(world: &World) -> Self {
        let mut reg = Self::standard();
        for def in &world.puzzle_defs {
            reg.defs.retain(|d| d.id != def.id);
            reg.defs.push(def.clone());
        }
        reg
    }

    pub fn get(&self, id: &str) -> Option<&PuzzleDef> {
        self.defs.iter().find(|d| d.id == id)
    }

    /// Like [`fire`](Self::fire), but silent unless the trigger moves a puzzle forward.
    /// Used for triggers raised as a side effect of ordinary actions.
    pub fn notify(&self, out: &mut Output, world: &mut World, trigger: &Trigger) -> PuzzleOutcome {
        let mut scratch = Output::new();
        let outcome = self.fire(&mut scratch, world, trigger);
        if matches!(outcome, PuzzleOutcome::Advanced | PuzzleOutcome::Completed) {
            out.blocks.extend(scratch.blocks);
            out.scored(scratch.score_delta);
        }
        outcome
    }

    /// Offer a trigger to every puzzle in scope.
    pub fn fire(&self, out: &mut Output, world: &mut World, trigger: &Trigger) -> PuzzleOutcome {
        let here = world.player.room.clone();
        let candidates: Vec<&PuzzleDef> = self
            .defs
            .iter()
            .filter(|d| d.room.as_deref().is_none_or(|r| r == here))
            .filter(|d| d.stages.iter().any(|s| s.triggers.contains(trigger)))
            .collect();

        // Prefer a puzzle for which this trigger is the next step.
        let chosen = candidates
            .iter()
            .find(|d| {
                let st = world.puzzles.get(&d.id).cloned().unwrap_or_default();
                !st.complete && d.stages.get(st.stage).is_some_and(|s| s.triggers.contains(trigger))
            })
            .or_else(|| candidates.first());

        let Some(def) = chosen else {
            return PuzzleOutcome::Unmatched;
        };

        let mut state = world.puzzles.get(&def.id).cloned().unwrap_or_default();
        if state.complete {
            out.say(def.done_text.clone());
            return PuzzleOutcome::AlreadyDone;
        }

        let Some(stage) = def.stages.get(state.stage).filter(|s| s.triggers.contains(trigger)) else {
            debug!(puzzle = %def.id, stage = state.stage, "trigger out of order");
            out.say(NOTHING_HAPPENS);
            return PuzzleOutcome::OutOfOrder;
        };

        out.say(stage.text.clone());
        for effect in &stage.effects {
            apply_effect(world, effect);
        }
        state.stage += 1;

        let outcome = if state.stage >= def.stages.len() {
            state.complete = true;
            out.scored(world.award(def.score));
            info!(puzzle = %def.id, score = def.score, "puzzle solved");
            PuzzleOutcome::Completed
        } else {
            debug!(puzzle = %def.id, stage = state.stage, "puzzle advanced");
            PuzzleOutcome::Advanced
        };
        world.puzzles.insert(def.id.clone(), state);
        outcome
    }
}

fn apply_effect(world: &mut World, effect: &Effect) {
    match effect {
        Effect::SetFlag(f) => {
            world.flags.insert(f.clone());
        }
        Effect::ClearFlag(f) => {
            world.flags.remove(f);
        }
        Effect::UnlockExit { room, direction } => {
            match world.unlock_exit(room, *direction, false) {
                Ok(()) | Err(LockError::AlreadyUnlocked) => {}
                Err(e) => warn!(room = %room, direction = direction.name(), error = ?e, "puzzle could not unlock exit"),
            }
        }
        Effect::Reveal { object, room } => {
            let Some(from) = world.objects.get(object).map(|o| o.location.clone()) else {
                warn!(object = %object, "puzzle reveals an unknown object");
                return;
            };
            if let Err(e) = world.transfer_object(object, &from, Location::Room(room.clone())) {
                warn!(object = %object, room = %room, error = ?e, "puzzle could not reveal object");
            }
        }
    }
}
