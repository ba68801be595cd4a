use crate::error::{GameError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunable game rules. Every field can be overridden from the stored config or the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
    pub total_rounds: usize,
    pub time_per_round_secs: u32,
    pub points_per_word: u32,
    /// Delay after a wrong full-length guess before the selection is cleared.
    pub shake_delay_ms: u64,
    /// Delay after a correct or timed-out round before the next round starts.
    pub advance_delay_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            total_rounds: 4,
            time_per_round_secs: 15,
            points_per_word: 25,
            shake_delay_ms: 500,
            advance_delay_ms: 2000,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<()> {
        if self.total_rounds == 0 {
            return Err(GameError::InvalidConfig(
                "total_rounds must be at least 1".into(),
            ));
        }
        if self.time_per_round_secs == 0 {
            return Err(GameError::InvalidConfig(
                "time_per_round_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn shake_delay(&self) -> Duration {
        Duration::from_millis(self.shake_delay_ms)
    }

    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }

    /// Highest score a single session can reach.
    pub fn max_score(&self) -> u32 {
        self.points_per_word
            .saturating_mul(self.total_rounds.try_into().unwrap_or(u32::MAX))
    }
}

pub trait ConfigStore {
    fn load(&self) -> GameConfig;
    fn save(&self, cfg: &GameConfig) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "unscramble") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("unscramble_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> GameConfig {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<GameConfig>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                }
            }
        }
        GameConfig::default()
    }

    fn save(&self, cfg: &GameConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
