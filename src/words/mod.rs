use crate::error::{GameError, Result};
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::fs;
use std::path::Path;

static WORDS_DIR: Dir = include_dir!("src/words");

/// Candidate words a session draws its targets from.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WordPool {
    pub name: String,
    pub words: Vec<String>,
}

impl WordPool {
    /// The word list bundled with the binary.
    pub fn builtin() -> Result<Self> {
        let file = WORDS_DIR
            .get_file("english.json")
            .ok_or_else(|| GameError::PoolLoad("bundled word list missing".into()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| GameError::PoolLoad("bundled word list is not utf-8".into()))?;
        Self::from_json(contents)
    }

    /// Load a pool from a JSON file shaped like `{"name": "...", "words": [...]}`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: WordPool = serde_json::from_str(json)?;
        Self::new(raw.name, raw.words)
    }

    /// Build a pool, normalizing each word to trimmed lowercase.
    pub fn new<S: AsRef<str>>(name: impl Into<String>, words: impl IntoIterator<Item = S>) -> Result<Self> {
        let words = words
            .into_iter()
            .map(|w| normalize(w.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.into(),
            words,
        })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn draw<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<String>> {
        draw_words(&self.words, count, rng)
    }
}

fn normalize(word: &str) -> Result<String> {
    let trimmed = word.trim();
    if trimmed.is_empty() {
        return Err(GameError::InvalidWord {
            word: word.to_string(),
            reason: "empty",
        });
    }
    if !trimmed.chars().all(char::is_alphabetic) {
        return Err(GameError::InvalidWord {
            word: word.to_string(),
            reason: "contains non-letter characters",
        });
    }
    Ok(trimmed.to_lowercase())
}

/// Pick `count` distinct entries of `pool`, uniformly and without replacement.
pub fn draw_words<R: Rng + ?Sized>(pool: &[String], count: usize, rng: &mut R) -> Result<Vec<String>> {
    if pool.len() < count {
        return Err(GameError::WordPoolExhausted {
            available: pool.len(),
            required: count,
        });
    }
    Ok(pool.choose_multiple(rng, count).cloned().collect())
}
