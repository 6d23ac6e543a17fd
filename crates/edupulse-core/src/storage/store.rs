//! Typed access to persisted progress.
//!
//! Reads never fail: a missing key, a corrupt value or a broken database
//! yields the documented default for that key and a warning in the log.
//! Writes report errors so the caller can decide whether to surface them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::Database;
use crate::error::StoreError;
use crate::gamification::{achievement_by_id, Progress, UnlockedAchievement};

pub const KEY_POINTS: &str = "points";
pub const KEY_ACHIEVEMENTS: &str = "achievements";
pub const KEY_SESSIONS_COMPLETED: &str = "sessionsCompleted";

/// Older stores kept bare ids; newer ones keep full entries.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredAchievement {
    Id(String),
    Entry(UnlockedAchievement),
}

pub struct ProgressStore {
    db: Database,
}

impl ProgressStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Read `key` as JSON, falling back to `default` on any problem.
    pub fn read_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.db.kv_get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(key, %err, "malformed persisted value, using default");
                    default
                }
            },
            Ok(None) => default,
            Err(err) => {
                tracing::warn!(key, %err, "failed to read persisted value, using default");
                default
            }
        }
    }

    /// Write `value` under `key` as JSON.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|e| StoreError::EncodeFailed {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.db.kv_set(key, &raw)
    }

    pub fn load_progress(&self) -> Progress {
        let points = self.read_or(KEY_POINTS, 0u64);
        let sessions_completed = self.read_or(KEY_SESSIONS_COMPLETED, 0u64);
        let stored: Vec<StoredAchievement> = self.read_or(KEY_ACHIEVEMENTS, Vec::new());

        let mut achievements: Vec<UnlockedAchievement> = Vec::with_capacity(stored.len());
        for entry in stored {
            let unlocked = match entry {
                StoredAchievement::Entry(entry) => entry,
                StoredAchievement::Id(id) => match achievement_by_id(&id) {
                    Some(def) => UnlockedAchievement::from(def),
                    None => {
                        tracing::warn!(id, "dropping unknown achievement id");
                        continue;
                    }
                },
            };
            if !achievements.iter().any(|a| a.id == unlocked.id) {
                achievements.push(unlocked);
            }
        }

        Progress::restore(points, sessions_completed, achievements)
    }

    pub fn save_progress(&self, progress: &Progress) -> Result<(), StoreError> {
        self.write(KEY_POINTS, &progress.points())?;
        self.write(KEY_SESSIONS_COMPLETED, &progress.sessions_completed())?;
        self.write(KEY_ACHIEVEMENTS, &progress.achievements())?;
        Ok(())
    }

    /// Forget all persisted progress.
    pub fn clear(&self) -> Result<(), StoreError> {
        for key in [KEY_POINTS, KEY_SESSIONS_COMPLETED, KEY_ACHIEVEMENTS] {
            self.db.kv_delete(key)?;
        }
        Ok(())
    }
}
