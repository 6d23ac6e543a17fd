//! # EduPulse Core Library
//!
//! Core logic for the EduPulse focus assistant: a focus/break session timer,
//! an engagement estimator fed by input activity and optional camera motion,
//! points and achievements, and short re-engagement challenges shown when
//! engagement drops. The `edupulse` CLI is a thin front end over this crate.
//!
//! ## Architecture
//!
//! - **Session Timer**: wall-clock state machine; the caller drives `tick()`
//! - **Engagement Tracker**: score with decay, activity bumps, visibility and
//!   idle penalties, a bounded history and a one-shot threshold breach
//! - **Motion**: frame-difference heuristic over a pluggable frame source
//! - **Challenges**: optional remote generation with a fixed local fallback
//! - **Storage**: SQLite key-value store for progress, TOML configuration
//!
//! ## Key Components
//!
//! - [`FocusApp`]: coordinator wiring the pieces together
//! - [`EngagementTracker`]: async engagement scoring
//! - [`SessionTimer`]: focus/break countdown
//! - [`ProgressStore`]: persisted points, sessions and achievements
//! - [`Config`]: application configuration management

pub mod app;
pub mod challenge;
pub mod dashboard;
pub mod engagement;
pub mod error;
pub mod events;
pub mod gamification;
pub mod motion;
pub mod storage;
pub mod timer;

pub use app::{FocusApp, Intervention};
pub use challenge::{ChallengeKind, ChallengeProvider, EngagementChallenge};
pub use dashboard::{DashboardSummary, GaugeBand, GaugeView};
pub use engagement::{
    EngagementRecord, EngagementSnapshot, EngagementTracker, IdlePenalty, IdlePenaltyService,
};
pub use error::{CameraError, ChallengeError, ConfigError, CoreError, StoreError, ValidationError};
pub use events::Event;
pub use gamification::{Achievement, Progress, UnlockedAchievement, ACHIEVEMENTS};
pub use motion::{CameraMonitor, FrameSource, ImageDirSource, MotionDetector};
pub use storage::{Config, Database, ProgressStore};
pub use timer::{SessionPhase, SessionTimer, TimerMode, TimerSnapshot};
