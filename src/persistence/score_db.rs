use super::{RateLimiter, SaveError, ScorePersistence, ScoreRecord, StoreError};
use crate::app_dirs::AppDirs;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{info, warn};

/// A saved score as read back from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub score: u32,
    pub created_at: DateTime<Local>,
}

/// SQLite-backed score store with save-side validation and rate limiting.
#[derive(Debug)]
pub struct SqliteScoreStore {
    conn: Mutex<Connection>,
    limiter: RateLimiter,
}

impl SqliteScoreStore {
    /// Open the store at the default state location.
    pub fn open_default() -> Result<Self, StoreError> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("unscramble_scores.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened score store");
        Self::with_connection(conn, RateLimiter::default())
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, RateLimiter::default())
    }

    pub fn with_limiter(self, limiter: RateLimiter) -> Self {
        Self { limiter, ..self }
    }

    fn with_connection(conn: Connection, limiter: RateLimiter) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                score INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_players_created_at ON players(created_at)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            limiter,
        })
    }

    fn insert(&self, record: &ScoreRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "INSERT INTO players (name, phone, score, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.name,
                record.phone,
                record.score,
                Local::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// All saved entries, newest first.
    pub fn list_entries(&self) -> Result<Vec<StoredEntry>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, phone, score, created_at
            FROM players
            ORDER BY created_at DESC, id DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let created_at: String = row.get(4)?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        4,
                        "created_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(StoredEntry {
                id: row.get(0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
                score: row.get(3)?,
                created_at,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }
}

impl ScorePersistence for SqliteScoreStore {
    fn persist(&self, record: &ScoreRecord) -> Result<(), SaveError> {
        let record = record.validated()?;
        if !self.limiter.check(&record.phone, Instant::now()) {
            warn!(phone = %record.phone, "score save rate limited");
            return Err(SaveError::RateLimited);
        }
        self.insert(&record)?;
        info!(name = %record.name, score = record.score, "score saved");
        Ok(())
    }
}
