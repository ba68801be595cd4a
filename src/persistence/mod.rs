pub mod export;
pub mod rate_limit;
pub mod score_db;

pub use export::export_csv;
pub use rate_limit::RateLimiter;
pub use score_db::{SqliteScoreStore, StoredEntry};

use thiserror::Error;

pub const NAME_LEN: std::ops::RangeInclusive<usize> = 2..=50;
pub const PHONE_LEN: std::ops::RangeInclusive<usize> = 10..=15;
pub const MAX_SCORE: u32 = 1000;

/// Contact details captured at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub phone: String,
}

impl Player {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }

    /// Check the contact details against the same rules the store applies on save.
    pub fn validate(&self) -> Result<Player, SaveError> {
        let name = self.name.trim();
        let phone = self.phone.trim();
        if name.is_empty() || phone.is_empty() {
            return Err(SaveError::Rejected("name and phone are required".into()));
        }
        if !NAME_LEN.contains(&name.chars().count()) {
            return Err(SaveError::Rejected(
                "name must be between 2 and 50 characters".into(),
            ));
        }
        if !PHONE_LEN.contains(&phone.chars().count()) {
            return Err(SaveError::Rejected(
                "phone number must be between 10 and 15 characters".into(),
            ));
        }
        Ok(Player::new(name, phone))
    }
}

/// The payload handed to the persistence collaborator when a session finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    pub name: String,
    pub phone: String,
    pub score: u32,
}

impl ScoreRecord {
    pub fn new(player: &Player, score: u32) -> Self {
        Self {
            name: player.name.clone(),
            phone: player.phone.clone(),
            score,
        }
    }

    /// Trimmed copy of the record, or the reason it would be refused.
    pub fn validated(&self) -> Result<ScoreRecord, SaveError> {
        let player = Player::new(self.name.as_str(), self.phone.as_str()).validate()?;
        if self.score > MAX_SCORE {
            return Err(SaveError::Rejected(format!(
                "score must be between 0 and {MAX_SCORE}"
            )));
        }
        Ok(ScoreRecord::new(&player, self.score))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("score service unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Rejected(String),

    #[error("too many save attempts, please try again later")]
    RateLimited,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("score store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for SaveError {
    fn from(e: StoreError) -> Self {
        SaveError::Unavailable(e.to_string())
    }
}

/// Where finished scores go.
///
/// Implementations may block; the session controller always calls this off
/// the event loop.
pub trait ScorePersistence: Send + Sync + 'static {
    fn persist(&self, record: &ScoreRecord) -> Result<(), SaveError>;
}
