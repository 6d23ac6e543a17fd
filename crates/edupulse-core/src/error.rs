//! Core error types for edupulse-core.
//!
//! This module defines the error hierarchy using thiserror. Most runtime
//! failures (camera, remote challenge, idle penalty, corrupt persisted
//! values) are absorbed at the component boundary with a documented
//! fallback; these types describe what went wrong before the fallback kicks in.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for edupulse-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistent store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote challenge generation errors
    #[error("Challenge error: {0}")]
    Challenge(#[from] ChallengeError),

    /// Camera device errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Idle penalty service failures
    #[error("Idle penalty failed: {0}")]
    IdlePenalty(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Value could not be encoded for storage
    #[error("Failed to encode value for '{key}': {message}")]
    EncodeFailed { key: String, message: String },

    /// Database is locked
    #[error("Store is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Remote challenge generation errors.
///
/// Never surfaced to the user: the provider falls back to the fixed fun fact.
#[derive(Error, Debug)]
pub enum ChallengeError {
    /// No API key or the remote capability is switched off
    #[error("remote challenge provider not configured")]
    NotConfigured,

    /// The remote endpoint answered with a non-success status
    #[error("{stage} request failed: HTTP {status}")]
    HttpStatus { stage: &'static str, status: u16 },

    /// The response did not contain what we asked for
    #[error("malformed {stage} response: {message}")]
    Malformed { stage: &'static str, message: String },

    /// Counting challenge image could not be produced
    #[error("image generation failed: {0}")]
    ImageFailed(String),

    /// Transport failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Invalid base URL
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
}

/// Camera device errors.
#[derive(Error, Debug)]
pub enum CameraError {
    /// Device could not be acquired (permission denied, missing device)
    #[error("failed to acquire camera: {0}")]
    AcquireFailed(String),

    /// Stream broke while sampling
    #[error("camera stream failed: {0}")]
    StreamFailed(String),

    /// Frame could not be decoded
    #[error("failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Frames with different geometry cannot be compared
    #[error("frame size mismatch: {left:?} vs {right:?}")]
    FrameSizeMismatch {
        left: (u32, u32),
        right: (u32, u32),
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Store(err.into())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_wraps_into_core() {
        let err: CoreError = StoreError::Locked.into();
        assert_eq!(err.to_string(), "Store error: Store is locked");
    }

    #[test]
    fn query_returned_no_rows_is_a_query_failure() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }

    #[test]
    fn challenge_status_message_names_stage() {
        let err = ChallengeError::HttpStatus {
            stage: "image",
            status: 503,
        };
        assert_eq!(err.to_string(), "image request failed: HTTP 503");
    }
}
