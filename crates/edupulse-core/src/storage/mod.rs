mod config;
pub mod database;
pub mod store;

pub use config::{
    CameraConfig, ChallengeConfig, Config, EngagementConfig, IdlePenaltyConfig, IdlePenaltyMode,
    RewardsConfig, TimerConfig,
};
pub use database::Database;
pub use store::{ProgressStore, KEY_ACHIEVEMENTS, KEY_POINTS, KEY_SESSIONS_COMPLETED};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// Resolution order:
/// - `EDUPULSE_DATA_DIR` if set
/// - `~/.config/edupulse-dev/` when `EDUPULSE_ENV=dev`
/// - `~/.config/edupulse/` otherwise
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = if let Ok(explicit) = std::env::var("EDUPULSE_DATA_DIR") {
        PathBuf::from(explicit)
    } else {
        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config");

        let env = std::env::var("EDUPULSE_ENV").unwrap_or_else(|_| "production".to_string());

        if env == "dev" {
            base_dir.join("edupulse-dev")
        } else {
            base_dir.join("edupulse")
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
