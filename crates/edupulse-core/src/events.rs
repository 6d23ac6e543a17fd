use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::challenge::EngagementChallenge;
use crate::timer::{SessionPhase, TimerMode};

/// Every state change in the system produces an Event.
/// The CLI prints them; the coordinator reacts to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TrackingStarted {
        session_id: String,
        at: DateTime<Utc>,
    },
    TrackingStopped {
        session_id: Option<String>,
        at: DateTime<Utc>,
    },
    EngagementReset {
        at: DateTime<Utc>,
    },
    /// One decay tick; carries the score that was appended to the history.
    EngagementTick {
        score: f64,
        at: DateTime<Utc>,
    },
    ActivityReported {
        score: f64,
        at: DateTime<Utc>,
    },
    VisibilityPenalty {
        score_before: f64,
        score_after: f64,
        at: DateTime<Utc>,
    },
    IdlePenaltyRequested {
        score: f64,
        idle_ms: u64,
        at: DateTime<Utc>,
    },
    IdlePenaltyApplied {
        score_before: f64,
        score_after: f64,
        at: DateTime<Utc>,
    },
    IdlePenaltyFailed {
        reason: String,
        at: DateTime<Utc>,
    },
    /// Fired at most once per tracking session.
    ThresholdBreached {
        score: f64,
        threshold: f64,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        phase: SessionPhase,
        mode: TimerMode,
        time_left_secs: u64,
        at: DateTime<Utc>,
    },
    /// A countdown reached zero.
    TimerCompleted {
        mode: TimerMode,
        at: DateTime<Utc>,
    },
    FocusCompleted {
        sessions_completed: u64,
        at: DateTime<Utc>,
    },
    PointsAwarded {
        amount: u64,
        total: u64,
        reason: String,
        at: DateTime<Utc>,
    },
    AchievementUnlocked {
        id: String,
        name: String,
        at: DateTime<Utc>,
    },
    CameraStateChanged {
        on: bool,
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    MotionDetected {
        mean_delta: f64,
        at: DateTime<Utc>,
    },
    /// A breach opened an intervention; its challenge may still be loading.
    InterventionOpened {
        id: u64,
        at: DateTime<Utc>,
    },
    /// The challenge for intervention `id` is available.
    InterventionReady {
        id: u64,
        challenge: EngagementChallenge,
        at: DateTime<Utc>,
    },
    InterventionResolved {
        success: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// High-frequency events that front ends usually do not print.
    pub fn is_periodic(&self) -> bool {
        matches!(
            self,
            Event::EngagementTick { .. } | Event::ActivityReported { .. } | Event::MotionDetected { .. }
        )
    }
}
