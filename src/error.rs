use thiserror::Error;

/// Errors raised by the game library outside of ordinary play.
///
/// Invalid player intents are never errors; they are ignored by the engine.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("word pool has {available} words but {required} rounds were requested")]
    WordPoolExhausted { available: usize, required: usize },

    #[error("invalid word {word:?}: {reason}")]
    InvalidWord { word: String, reason: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("session already started")]
    AlreadyStarted,

    #[error("session has not finished")]
    NotFinished,

    #[error("a save is already in progress")]
    SaveInFlight,

    #[error("score already saved")]
    AlreadySaved,

    #[error("failed to load word pool: {0}")]
    PoolLoad(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
