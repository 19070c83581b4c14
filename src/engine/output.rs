use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OutputBlock {
    Title(String),
    Text(String),
    Event(String),
    Exits(String),
}

/// What went wrong with a command that changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Failure {
    /// No exit, locked exit, or an exit leading nowhere.
    Navigation,
    /// Nothing by that name, or it can't be used that way.
    Resolution,
    /// Too heavy, or a missing key.
    Resource,
    /// Save or restore failed.
    Persistence,
}

#[derive(Default, Debug)]
pub struct Output {
    pub blocks: Vec<OutputBlock>,
    pub score_delta: i32,
    pub failure: Option<Failure>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&mut self, s: impl Into<String>) {
        let s = s.into();
        if !s.trim().is_empty() {
            self.blocks.push(OutputBlock::Title(s));
        }
    }

    pub fn say(&mut self, s: impl Into<String>) {
        let s = s.into();
        if !s.trim().is_empty() {
            self.blocks.push(OutputBlock::Text(s));
        }
    }

    pub fn event(&mut self, s: impl Into<String>) {
        let s = s.into();
        if !s.trim().is_empty() {
            self.blocks.push(OutputBlock::Event(s));
        }
    }

    pub fn set_exits(&mut self, s: impl Into<String>) {
        let s = s.into();
        if s.trim().is_empty() {
            return;
        }

        // ensure only one Exits block exists, always last
        self.blocks.retain(|b| !matches!(b, OutputBlock::Exits(_)));
        self.blocks.push(OutputBlock::Exits(s));
    }

    /// Narrate a refusal and record its kind.
    pub fn fail(&mut self, kind: Failure, s: impl Into<String>) {
        self.failure = Some(kind);
        self.say(s);
    }

    pub fn scored(&mut self, points: i32) {
        self.score_delta += points;
    }

    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    /// All narration joined with newlines, exits included.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| match b {
                OutputBlock::Title(s) | OutputBlock::Text(s) | OutputBlock::Event(s) | OutputBlock::Exits(s) => {
                    s.as_str()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text().contains(needle)
    }
}
