//! Turns a line of player input into a canonical [`Command`].

use crate::world::{Direction, normalize_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prep {
    In,
    On,
}

/// A parsed player command. Object phrases are lowercased with articles removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Look,
    Examine(String),
    Search(String),
    LookThrough(String),
    Read(String),
    Inventory,
    Take(String),
    TakeAll,
    /// `item` may be "all".
    TakeFrom { item: String, container: String },
    Drop(String),
    DropAll,
    Put { item: String, container: String, prep: Prep },
    Open(String),
    Close(String),
    Lock { target: String, key: Option<String> },
    Unlock { target: String, key: Option<String> },
    Light(String),
    Extinguish(String),
    Give { item: String, npc: String },
    /// `give troll coin` / `bribe coin troll`: the order is sorted out on resolution.
    Offer { words: String, bribe: bool },
    Bribe { npc: String, item: String },
    Attack { target: String, weapon: Option<String> },
    Talk(String),
    Say(String),
    Tie { item: String, to: Option<String> },
    Poke(String),
    Eat(String),
    Dig(String),
    Wake(String),
    Sleep(String),
    Wait,
    Listen,
    Score,
    Help,
    Diagnose,
    Save(Option<String>),
    Restore(Option<String>),
    Restart,
    Quit,
    Demo,
    Continue,
    /// A known verb missing its object; carries the question to ask.
    Incomplete(&'static str),
    Unknown(String),
}

impl Command {
    /// Whether a successful run of this command advances the turn clock.
    pub fn consumes_turn(&self) -> bool {
        !matches!(
            self,
            Command::Inventory
                | Command::Score
                | Command::Help
                | Command::Diagnose
                | Command::Save(_)
                | Command::Restore(_)
                | Command::Restart
                | Command::Quit
                | Command::Demo
                | Command::Continue
                | Command::Incomplete(_)
                | Command::Unknown(_)
        )
    }
}

/// Verb synonyms for command parsing.
const GO_VERBS: &[&str] = &["go", "walk", "run", "head"];
const LOOK_VERBS: &[&str] = &["look", "l"];
const EXAMINE_VERBS: &[&str] = &["examine", "x", "inspect", "describe"];
const SEARCH_VERBS: &[&str] = &["search", "rummage"];
const INVENTORY_VERBS: &[&str] = &["inventory", "i", "inv"];
const TAKE_VERBS: &[&str] = &["take", "get", "grab", "carry"];
const DROP_VERBS: &[&str] = &["drop", "discard"];
const PUT_VERBS: &[&str] = &["put", "insert", "place", "stash"];
const OPEN_VERBS: &[&str] = &["open"];
const CLOSE_VERBS: &[&str] = &["close", "shut"];
const LIGHT_VERBS: &[&str] = &["light", "ignite", "burn"];
const EXTINGUISH_VERBS: &[&str] = &["extinguish", "douse", "snuff"];
const ATTACK_VERBS: &[&str] = &["attack", "fight", "kill", "stab", "hit", "strike", "slay"];
const TALK_VERBS: &[&str] = &["talk", "greet", "hello", "hi", "speak"];
const SAY_VERBS: &[&str] = &["say", "shout", "yell", "echo"];
const POKE_VERBS: &[&str] = &["poke", "prod"];
const EAT_VERBS: &[&str] = &["eat", "consume"];
const WAIT_VERBS: &[&str] = &["wait", "z"];
const HELP_VERBS: &[&str] = &["help", "?"];
const DIAGNOSE_VERBS: &[&str] = &["diagnose", "health"];
const RESTORE_VERBS: &[&str] = &["restore", "load"];
const QUIT_VERBS: &[&str] = &["quit", "q", "exit"];
const CONTINUE_VERBS: &[&str] = &["continue", "resurrect"];

fn is(verb: &str, table: &[&str]) -> bool {
    table.contains(&verb)
}

/// Splits `rest` at the first of `preps` that appears as a whole word.
/// Returns (before, prep, after) with both sides non-empty.
fn split_prep<'a>(rest: &'a str, preps: &[&'a str]) -> Option<(String, &'a str, String)> {
    let words: Vec<&str> = rest.split_whitespace().collect();
    let idx = words.iter().position(|w| preps.contains(w))?;
    let before = words[..idx].join(" ");
    let after = words[idx + 1..].join(" ");
    if before.is_empty() || after.is_empty() {
        return None;
    }
    Some((normalize_name(&before), words[idx], normalize_name(&after)))
}

fn object_or(rest: &str, question: &'static str, build: impl FnOnce(String) -> Command) -> Command {
    let obj = normalize_name(rest);
    if obj.is_empty() { Command::Incomplete(question) } else { build(obj) }
}

/// Parse a player input string into a command.
pub fn parse_command(input: &str) -> Command {
    let line = input.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if line.is_empty() {
        return Command::Unknown(String::new());
    }

    if let Some(dir) = Direction::parse(&line) {
        return Command::Move(dir);
    }

    let (verb, rest) = match line.split_once(' ') {
        Some((v, r)) => (v, r.trim()),
        None => (line.as_str(), ""),
    };

    // Two-word verbs first.
    if let Some(cmd) = parse_phrasal(verb, rest) {
        return cmd;
    }

    if is(verb, GO_VERBS) {
        return match Direction::parse(rest) {
            Some(dir) => Command::Move(dir),
            None if rest.is_empty() => Command::Incomplete("Which way do you want to go?"),
            None => Command::Unknown(line.clone()),
        };
    }
    if is(verb, LOOK_VERBS) {
        return if rest.is_empty() { Command::Look } else { Command::Unknown(line.clone()) };
    }
    if is(verb, EXAMINE_VERBS) {
        return object_or(rest, "Examine what?", Command::Examine);
    }
    if is(verb, SEARCH_VERBS) {
        return object_or(rest, "Search what?", Command::Search);
    }
    if verb == "read" {
        return object_or(rest, "Read what?", Command::Read);
    }
    if is(verb, INVENTORY_VERBS) {
        return Command::Inventory;
    }
    if is(verb, TAKE_VERBS) {
        return parse_take(rest);
    }
    if is(verb, DROP_VERBS) {
        return parse_drop(rest);
    }
    if verb == "throw" || verb == "toss" {
        return match split_prep(rest, &["in", "into", "inside"]) {
            Some((item, _, container)) => Command::Put { item, container, prep: Prep::In },
            None => parse_drop(rest),
        };
    }
    if is(verb, PUT_VERBS) {
        return parse_put(rest);
    }
    if is(verb, OPEN_VERBS) {
        return object_or(rest, "Open what?", Command::Open);
    }
    if is(verb, CLOSE_VERBS) {
        return object_or(rest, "Close what?", Command::Close);
    }
    if verb == "lock" || verb == "unlock" {
        let (target, key) = match split_prep(rest, &["with"]) {
            Some((t, _, k)) => (t, Some(k)),
            None => (normalize_name(rest), None),
        };
        if target.is_empty() {
            return Command::Incomplete(if verb == "lock" { "Lock what?" } else { "Unlock what?" });
        }
        return if verb == "lock" { Command::Lock { target, key } } else { Command::Unlock { target, key } };
    }
    if is(verb, LIGHT_VERBS) {
        return object_or(rest, "Light what?", Command::Light);
    }
    if is(verb, EXTINGUISH_VERBS) {
        return object_or(rest, "Extinguish what?", Command::Extinguish);
    }
    if verb == "give" {
        return match split_prep(rest, &["to"]) {
            Some((item, _, npc)) => Command::Give { item, npc },
            None => object_or(rest, "Give what to whom?", |words| Command::Offer { words, bribe: false }),
        };
    }
    if verb == "bribe" {
        return match split_prep(rest, &["with"]) {
            Some((npc, _, item)) => Command::Bribe { npc, item },
            None => object_or(rest, "Bribe whom?", |words| Command::Offer { words, bribe: true }),
        };
    }
    if is(verb, ATTACK_VERBS) {
        return match split_prep(rest, &["with"]) {
            Some((target, _, weapon)) => Command::Attack { target, weapon: Some(weapon) },
            None => object_or(rest, "Attack what?", |target| Command::Attack { target, weapon: None }),
        };
    }
    if is(verb, TALK_VERBS) {
        let rest = rest.strip_prefix("to ").unwrap_or(rest);
        return object_or(rest, "Talk to whom?", Command::Talk);
    }
    if is(verb, SAY_VERBS) {
        // "echo" on its own is something to say, not a verb without an object.
        let words = if rest.is_empty() && verb == "echo" { verb } else { rest };
        return if words.is_empty() { Command::Incomplete("Say what?") } else { Command::Say(words.to_string()) };
    }
    if verb == "tie" {
        return match split_prep(rest, &["to"]) {
            Some((item, _, to)) => Command::Tie { item, to: Some(to) },
            None => object_or(rest, "Tie what?", |item| Command::Tie { item, to: None }),
        };
    }
    if is(verb, POKE_VERBS) {
        return object_or(rest, "Poke what?", Command::Poke);
    }
    if is(verb, EAT_VERBS) {
        return object_or(rest, "Eat what?", Command::Eat);
    }
    if verb == "dig" {
        let rest = rest.strip_prefix("in ").unwrap_or(rest);
        return object_or(rest, "Dig in what?", Command::Dig);
    }
    if verb == "wake" {
        return object_or(rest, "Wake whom?", Command::Wake);
    }
    if verb == "sleep" {
        return object_or(rest, "Put what to sleep?", Command::Sleep);
    }
    if is(verb, WAIT_VERBS) && rest.is_empty() {
        return Command::Wait;
    }
    if verb == "listen" {
        return Command::Listen;
    }
    if verb == "score" && rest.is_empty() {
        return Command::Score;
    }
    if is(verb, HELP_VERBS) {
        return Command::Help;
    }
    if is(verb, DIAGNOSE_VERBS) {
        return Command::Diagnose;
    }
    if verb == "save" {
        return Command::Save(file_argument(input));
    }
    if is(verb, RESTORE_VERBS) {
        return Command::Restore(file_argument(input));
    }
    if verb == "restart" && rest.is_empty() {
        return Command::Restart;
    }
    if is(verb, QUIT_VERBS) && rest.is_empty() {
        return Command::Quit;
    }
    if verb == "demo" && rest.is_empty() {
        return Command::Demo;
    }
    if is(verb, CONTINUE_VERBS) && rest.is_empty() {
        return Command::Continue;
    }

    Command::Unknown(line.clone())
}

/// File names keep the case they were typed with.
fn file_argument(input: &str) -> Option<String> {
    let rest = input.split_whitespace().skip(1).collect::<Vec<_>>().join(" ");
    (!rest.is_empty()).then_some(rest)
}

fn parse_phrasal(verb: &str, rest: &str) -> Option<Command> {
    let (particle, tail) = match rest.split_once(' ') {
        Some((p, t)) => (p, t.trim()),
        None => (rest, ""),
    };

    let cmd = match (verb, particle) {
        ("look" | "l", "at") => object_or(tail, "Look at what?", Command::Examine),
        ("look" | "l", "in" | "inside") => object_or(tail, "Look in what?", Command::Search),
        ("look" | "l", "through") => object_or(tail, "Look through what?", Command::LookThrough),
        ("pick", "up") => parse_take(tail),
        ("turn" | "switch", "on") => object_or(tail, "Turn on what?", Command::Light),
        ("turn" | "switch", "off") => object_or(tail, "Turn off what?", Command::Extinguish),
        ("blow" | "put", "out") => object_or(tail, "Put out what?", Command::Extinguish),
        ("wake", "up") => object_or(tail, "Wake whom?", Command::Wake),
        ("put", "down") => parse_drop(tail),
        _ => return None,
    };
    Some(cmd)
}

fn parse_take(rest: &str) -> Command {
    if let Some((item, _, container)) = split_prep(rest, &["from", "out"]) {
        let container = container.strip_prefix("of ").map(normalize_name).unwrap_or(container);
        return Command::TakeFrom { item, container };
    }
    match normalize_name(rest).as_str() {
        "" => Command::Incomplete("Take what?"),
        "all" | "everything" => Command::TakeAll,
        obj => Command::Take(obj.to_string()),
    }
}

fn parse_drop(rest: &str) -> Command {
    match normalize_name(rest).as_str() {
        "" => Command::Incomplete("Drop what?"),
        "all" | "everything" => Command::DropAll,
        obj => Command::Drop(obj.to_string()),
    }
}

fn parse_put(rest: &str) -> Command {
    if let Some(who) = rest.strip_suffix(" to sleep") {
        return object_or(who, "Put what to sleep?", Command::Sleep);
    }
    match split_prep(rest, &["in", "into", "inside", "on", "onto"]) {
        Some((item, prep, container)) => Command::Put {
            item,
            container,
            prep: if matches!(prep, "on" | "onto") { Prep::On } else { Prep::In },
        },
        None if rest.is_empty() => Command::Incomplete("Put what where?"),
        None => Command::Incomplete("Where do you want to put it?"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_movement() {
        assert_eq!(parse_command("n"), Command::Move(Direction::North));
        assert_eq!(parse_command("  Go   NorthEast "), Command::Move(Direction::Northeast));
        assert_eq!(parse_command("walk down"), Command::Move(Direction::Down));
        assert_eq!(parse_command("enter"), Command::Move(Direction::In));
        assert_eq!(parse_command("go"), Command::Incomplete("Which way do you want to go?"));
    }

    #[test]
    fn parses_take_variants() {
        assert_eq!(parse_command("take the lamp"), Command::Take("lamp".into()));
        assert_eq!(parse_command("pick up an egg"), Command::Take("egg".into()));
        assert_eq!(parse_command("get all"), Command::TakeAll);
        assert_eq!(
            parse_command("take leaflet from the mailbox"),
            Command::TakeFrom {
                item: "leaflet".into(),
                container: "mailbox".into()
            }
        );
        assert_eq!(parse_command("take"), Command::Incomplete("Take what?"));
    }

    #[test]
    fn parses_prepositions() {
        assert_eq!(
            parse_command("put coin in case"),
            Command::Put {
                item: "coin".into(),
                container: "case".into(),
                prep: Prep::In
            }
        );
        assert_eq!(
            parse_command("place the book on the table"),
            Command::Put {
                item: "book".into(),
                container: "table".into(),
                prep: Prep::On
            }
        );
        assert_eq!(
            parse_command("unlock mailbox with small key"),
            Command::Unlock {
                target: "mailbox".into(),
                key: Some("small key".into())
            }
        );
        assert_eq!(
            parse_command("give coin to troll"),
            Command::Give {
                item: "coin".into(),
                npc: "troll".into()
            }
        );
        assert_eq!(
            parse_command("bribe troll with coin"),
            Command::Bribe {
                npc: "troll".into(),
                item: "coin".into()
            }
        );
        assert_eq!(
            parse_command("give troll coin"),
            Command::Offer {
                words: "troll coin".into(),
                bribe: false
            }
        );
        assert_eq!(
            parse_command("tie rope to railing"),
            Command::Tie {
                item: "rope".into(),
                to: Some("railing".into())
            }
        );
    }

    #[test]
    fn parses_synonyms() {
        assert_eq!(parse_command("fight troll"), Command::Attack { target: "troll".into(), weapon: None });
        assert_eq!(
            parse_command("stab the troll with sword"),
            Command::Attack {
                target: "troll".into(),
                weapon: Some("sword".into())
            }
        );
        assert_eq!(parse_command("turn on lamp"), Command::Light("lamp".into()));
        assert_eq!(parse_command("blow out candle"), Command::Extinguish("candle".into()));
        assert_eq!(parse_command("look at leaflet"), Command::Examine("leaflet".into()));
        assert_eq!(parse_command("look in case"), Command::Search("case".into()));
        assert_eq!(parse_command("look through window"), Command::LookThrough("window".into()));
        assert_eq!(parse_command("talk to the thief"), Command::Talk("thief".into()));
        assert_eq!(parse_command("wake up cat"), Command::Wake("cat".into()));
        assert_eq!(parse_command("put the cat to sleep"), Command::Sleep("cat".into()));
        assert_eq!(parse_command("i"), Command::Inventory);
        assert_eq!(parse_command("l"), Command::Look);
        assert_eq!(parse_command("z"), Command::Wait);
        assert_eq!(parse_command("exit"), Command::Quit);
        assert_eq!(parse_command("echo"), Command::Say("echo".into()));
    }

    #[test]
    fn save_paths_keep_their_case() {
        assert_eq!(parse_command("SAVE /tmp/Game.sav"), Command::Save(Some("/tmp/Game.sav".into())));
        assert_eq!(parse_command("restore"), Command::Restore(None));
    }

    #[test]
    fn unknown_input_is_kept_for_phrase_triggers() {
        assert_eq!(parse_command("Push  Button"), Command::Unknown("push button".into()));
        assert_eq!(parse_command("xyzzy"), Command::Unknown("xyzzy".into()));
    }

    #[test]
    fn free_commands_do_not_consume_turns() {
        for free in ["i", "score", "help", "diagnose", "save", "restore", "restart", "quit", "demo", "frobnicate"] {
            assert!(!parse_command(free).consumes_turn(), "{free} should be free");
        }
        for costly in ["look", "wait", "n", "take lamp", "listen"] {
            assert!(parse_command(costly).consumes_turn(), "{costly} should cost a turn");
        }
    }
}
