use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::EngineResult;

/// Tunable engine rules. Every field has a default, so an empty TOML file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum total `osize` the player may carry (ignored in demo mode).
    pub carry_limit: u32,
    /// Consecutive dark turns before the grue warning.
    pub dark_warn_turns: u32,
    /// Consecutive dark turns before the grue strikes.
    pub dark_death_turns: u32,
    /// Deaths allowed before the adventure is over.
    pub max_deaths: u32,
    pub player_health: i32,
    pub seed: Option<u64>,
    pub demo_mode: bool,
    pub save_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            carry_limit: 20,
            dark_warn_turns: 1,
            dark_death_turns: 3,
            max_deaths: 3,
            player_health: 5,
            seed: None,
            demo_mode: false,
            save_path: PathBuf::from("phork.sav"),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let cfg = EngineConfig::from_toml_str("dark_death_turns = 2\nseed = 7\n").unwrap();
        assert_eq!(cfg.dark_death_turns, 2);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.carry_limit, 20);
    }
}
