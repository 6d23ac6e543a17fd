//! TOML-based application configuration.
//!
//! Stores tunables for:
//! - Focus/break durations and tick rate
//! - Engagement decay, bump, penalties and breach threshold
//! - Idle penalty service (simulated or remote)
//! - Camera sampling and motion threshold
//! - Remote challenge generation
//! - Reward amounts
//!
//! Configuration is stored at `~/.config/edupulse/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;

/// Session timer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_focus_secs")]
    pub focus_secs: u64,
    #[serde(default = "default_break_secs")]
    pub break_secs: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Engagement tracker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementConfig {
    /// Intervention threshold; breach fires when the score drops strictly below it.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Score removed per decay tick.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    /// Score added per activity report.
    #[serde(default = "default_activity_bump")]
    pub activity_bump: f64,
    /// Score removed when the host reports itself hidden.
    #[serde(default = "default_visibility_penalty")]
    pub visibility_penalty: f64,
    #[serde(default = "default_idle_after_secs")]
    pub idle_after_secs: u64,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_tick_ms")]
    pub idle_check_ms: u64,
}

/// Where the idle penalty is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdlePenaltyMode {
    Simulated,
    Remote,
}

/// Idle penalty service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlePenaltyConfig {
    #[serde(default = "default_penalty_mode")]
    pub mode: IdlePenaltyMode,
    #[serde(default = "default_penalty_amount")]
    pub amount: f64,
    /// Simulated latency of the penalty call.
    #[serde(default = "default_penalty_delay_ms")]
    pub delay_ms: u64,
    /// Endpoint for `remote` mode.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Camera motion sampling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    #[serde(default = "default_frame_width")]
    pub width: u32,
    #[serde(default = "default_frame_height")]
    pub height: u32,
    /// Mean per-channel delta (0-255) above which a sample counts as motion.
    #[serde(default = "default_motion_threshold")]
    pub motion_threshold: f64,
}

/// Remote challenge generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Master switch for remote generation.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_challenge_base_url")]
    pub base_url: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Points awarded for each rewarded action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_focus_completion_points")]
    pub focus_completion_points: u64,
    #[serde(default = "default_challenge_success_points")]
    pub challenge_success_points: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/edupulse/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub engagement: EngagementConfig,
    #[serde(default)]
    pub idle_penalty: IdlePenaltyConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub challenge: ChallengeConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
}

// Default functions
fn default_focus_secs() -> u64 {
    25 * 60
}
fn default_break_secs() -> u64 {
    5 * 60
}
fn default_tick_ms() -> u64 {
    1000
}
fn default_threshold() -> f64 {
    0.9
}
fn default_decay_rate() -> f64 {
    0.005
}
fn default_activity_bump() -> f64 {
    0.1
}
fn default_visibility_penalty() -> f64 {
    0.5
}
fn default_idle_after_secs() -> u64 {
    13
}
fn default_history_capacity() -> usize {
    100
}
fn default_penalty_mode() -> IdlePenaltyMode {
    IdlePenaltyMode::Simulated
}
fn default_penalty_amount() -> f64 {
    0.02
}
fn default_penalty_delay_ms() -> u64 {
    300
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_sample_interval_ms() -> u64 {
    500
}
fn default_frame_width() -> u32 {
    80
}
fn default_frame_height() -> u32 {
    45
}
fn default_motion_threshold() -> f64 {
    5.0
}
fn default_true() -> bool {
    true
}
fn default_challenge_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_text_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_image_model() -> String {
    "imagen-4.0-generate-001".into()
}
fn default_focus_completion_points() -> u64 {
    25
}
fn default_challenge_success_points() -> u64 {
    10
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_secs: default_focus_secs(),
            break_secs: default_break_secs(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl TimerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            decay_rate: default_decay_rate(),
            activity_bump: default_activity_bump(),
            visibility_penalty: default_visibility_penalty(),
            idle_after_secs: default_idle_after_secs(),
            history_capacity: default_history_capacity(),
            tick_ms: default_tick_ms(),
            idle_check_ms: default_tick_ms(),
        }
    }
}

impl EngagementConfig {
    pub fn idle_after(&self) -> Duration {
        Duration::from_secs(self.idle_after_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn idle_check_interval(&self) -> Duration {
        Duration::from_millis(self.idle_check_ms)
    }
}

impl Default for IdlePenaltyConfig {
    fn default() -> Self {
        Self {
            mode: IdlePenaltyMode::Simulated,
            amount: default_penalty_amount(),
            delay_ms: default_penalty_delay_ms(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            width: default_frame_width(),
            height: default_frame_height(),
            motion_threshold: default_motion_threshold(),
        }
    }
}

impl CameraConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: default_challenge_base_url(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ChallengeConfig {
    /// Capability flag: remote generation is only attempted when this holds.
    pub fn has_remote_challenge_provider(&self) -> bool {
        self.enabled
            && self
                .api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty())
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            focus_completion_points: default_focus_completion_points(),
            challenge_success_points: default_challenge_success_points(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(String::new()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Default config file location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Fill in the challenge API key from `GEMINI_API_KEY` or `API_KEY`
    /// when the file does not carry one. Not persisted.
    pub fn with_env_overrides(mut self) -> Self {
        if self.challenge.api_key.is_none() {
            self.challenge.api_key = ["GEMINI_API_KEY", "API_KEY"]
                .iter()
                .find_map(|name| std::env::var(name).ok())
                .filter(|key| !key.trim().is_empty());
        }
        self
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown
    /// or the resulting configuration is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Flattened `key = value` listing of every leaf.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| -> Result<(), ConfigError> {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        let e = &self.engagement;
        if !(0.0..=1.0).contains(&e.threshold) {
            return invalid("engagement.threshold", "must be within 0.0..=1.0");
        }
        for (key, value) in [
            ("engagement.decay_rate", e.decay_rate),
            ("engagement.activity_bump", e.activity_bump),
            ("engagement.visibility_penalty", e.visibility_penalty),
            ("idle_penalty.amount", self.idle_penalty.amount),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(key, "must be within 0.0..=1.0");
            }
        }
        if e.history_capacity == 0 {
            return invalid("engagement.history_capacity", "must be greater than zero");
        }
        if e.tick_ms == 0 || e.idle_check_ms == 0 || self.timer.tick_ms == 0 {
            return invalid("tick_ms", "tick intervals must be greater than zero");
        }
        if self.timer.focus_secs == 0 || self.timer.break_secs == 0 {
            return invalid("timer", "durations must be greater than zero");
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return invalid("camera", "frame size must be non-zero");
        }
        if self.camera.sample_interval_ms == 0 {
            return invalid("camera.sample_interval_ms", "must be greater than zero");
        }
        if self.idle_penalty.mode == IdlePenaltyMode::Remote && self.idle_penalty.endpoint.is_none() {
            return invalid("idle_penalty.endpoint", "required in remote mode");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.timer.focus_secs, 1500);
        assert_eq!(cfg.timer.break_secs, 300);
        assert_eq!(cfg.engagement.threshold, 0.9);
        assert_eq!(cfg.engagement.decay_rate, 0.005);
        assert_eq!(cfg.engagement.activity_bump, 0.1);
        assert_eq!(cfg.engagement.idle_after_secs, 13);
        assert_eq!(cfg.engagement.history_capacity, 100);
        assert_eq!(cfg.idle_penalty.amount, 0.02);
        assert_eq!(cfg.idle_penalty.delay_ms, 300);
        assert_eq!(cfg.camera.width, 80);
        assert_eq!(cfg.camera.height, 45);
        assert_eq!(cfg.camera.motion_threshold, 5.0);
        assert_eq!(cfg.rewards.focus_completion_points, 25);
        assert_eq!(cfg.rewards.challenge_success_points, 10);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[engagement]\nthreshold = 0.5\n").unwrap();
        assert_eq!(cfg.engagement.threshold, 0.5);
        assert_eq!(cfg.engagement.decay_rate, 0.005);
        assert_eq!(cfg.timer.focus_secs, 1500);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.focus_secs").as_deref(), Some("1500"));
        assert_eq!(cfg.get("challenge.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("idle_penalty.mode").as_deref(), Some("simulated"));
        assert!(cfg.get("timer.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_number_and_bool() {
        let mut cfg = Config::default();
        cfg.set("engagement.threshold", "0.75").unwrap();
        cfg.set("challenge.enabled", "false").unwrap();
        cfg.set("timer.break_secs", "600").unwrap();
        assert_eq!(cfg.engagement.threshold, 0.75);
        assert!(!cfg.challenge.enabled);
        assert_eq!(cfg.timer.break_secs, 600);
    }

    #[test]
    fn set_fills_optional_string() {
        let mut cfg = Config::default();
        cfg.set("challenge.api_key", "secret").unwrap();
        assert_eq!(cfg.challenge.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("timer.nonexistent", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("challenge.enabled", "not_a_bool").is_err());
        assert!(cfg.challenge.enabled);
    }

    #[test]
    fn set_rejects_out_of_range_threshold() {
        let mut cfg = Config::default();
        assert!(cfg.set("engagement.threshold", "1.5").is_err());
        assert_eq!(cfg.engagement.threshold, 0.9);
    }

    #[test]
    fn remote_mode_requires_endpoint() {
        let mut cfg = Config::default();
        assert!(cfg.set("idle_penalty.mode", "remote").is_err());
    }

    #[test]
    fn remote_capability_needs_key_and_switch() {
        let mut challenge = ChallengeConfig::default();
        assert!(!challenge.has_remote_challenge_provider());
        challenge.api_key = Some("  ".into());
        assert!(!challenge.has_remote_challenge_provider());
        challenge.api_key = Some("key".into());
        assert!(challenge.has_remote_challenge_provider());
        challenge.enabled = false;
        assert!(!challenge.has_remote_challenge_provider());
    }

    #[test]
    fn entries_lists_leaves() {
        let entries = Config::default().entries();
        assert!(entries
            .iter()
            .any(|(k, v)| k == "engagement.threshold" && v == "0.9"));
        assert!(entries.iter().any(|(k, _)| k == "camera.width"));
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
