use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the library's fallible entry points (loading, saving, restoring).
///
/// In-game failures (no exit, missing key, too heavy) are narrated instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not decode save data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("could not parse world file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid world: {0}")]
    InvalidWorld(String),

    #[error("unsupported save version {found} (expected {expected})")]
    UnsupportedSave { found: u32, expected: u32 },
}
