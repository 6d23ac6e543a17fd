//! Focus/break session timer.
//!
//! The timer is a wall-clock state machine. It does not own a thread or a
//! task; the caller invokes `tick()` periodically (see [`crate::app`] for the
//! async driver). Remaining time is always recomputed from an absolute
//! deadline so that late or missed ticks never accumulate drift.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Focus -> (Paused | Stopped) -> Break -> Stopped -> Focus ...
//! ```
//!
//! Reaching zero never auto-starts the next phase: the timer flips its mode,
//! loads the full duration of the new mode and reports `Stopped`.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::storage::TimerConfig;

/// Which countdown is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Focus,
    Break,
}

/// Externally observed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Stopped,
    Focus,
    Break,
    Paused,
}

impl SessionPhase {
    fn running(mode: TimerMode) -> Self {
        match mode {
            TimerMode::Focus => SessionPhase::Focus,
            TimerMode::Break => SessionPhase::Break,
        }
    }
}

/// Point-in-time view of the timer for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub phase: SessionPhase,
    pub time_left_secs: u64,
    /// `MM:SS`
    pub display: String,
    /// 0.0 .. 100.0 progress within the current mode.
    pub progress_pct: f64,
}

/// Focus/break countdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTimer {
    focus_secs: u64,
    break_secs: u64,
    mode: TimerMode,
    phase: SessionPhase,
    time_left_secs: u64,
    /// Absolute end of the running countdown (ms since epoch).
    #[serde(default)]
    target_epoch_ms: Option<u64>,
}

impl SessionTimer {
    pub fn new(config: &TimerConfig) -> Self {
        Self {
            focus_secs: config.focus_secs,
            break_secs: config.break_secs,
            mode: TimerMode::Focus,
            phase: SessionPhase::Stopped,
            time_left_secs: config.focus_secs,
            target_epoch_ms: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn time_left_secs(&self) -> u64 {
        self.time_left_secs
    }

    pub fn is_active(&self) -> bool {
        self.target_epoch_ms.is_some()
    }

    pub fn total_secs(&self) -> u64 {
        self.duration_of(self.mode)
    }

    /// 0.0 .. 1.0 progress within the current mode.
    pub fn progress(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.time_left_secs.min(total) as f64 / total as f64)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            phase: self.phase,
            time_left_secs: self.time_left_secs,
            display: format_clock(self.time_left_secs),
            progress_pct: self.progress() * 100.0,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        self.start_at(now_ms())
    }

    pub fn pause(&mut self) -> Option<Event> {
        self.pause_at(now_ms())
    }

    pub fn tick(&mut self) -> Vec<Event> {
        self.tick_at(now_ms())
    }

    /// Start or resume. Returns `None` when already running.
    pub fn start_at(&mut self, now_ms: u64) -> Option<Event> {
        if self.is_active() {
            return None;
        }
        self.target_epoch_ms = Some(now_ms + self.time_left_secs * 1000);
        Some(self.set_phase(SessionPhase::running(self.mode)))
    }

    /// Pause, keeping the remaining time. Returns `None` unless running.
    pub fn pause_at(&mut self, now_ms: u64) -> Option<Event> {
        let target = self.target_epoch_ms?;
        self.time_left_secs = secs_left(target, now_ms);
        self.target_epoch_ms = None;
        Some(self.set_phase(SessionPhase::Paused))
    }

    /// Back to a full focus countdown, stopped.
    pub fn reset(&mut self) -> Event {
        self.target_epoch_ms = None;
        self.mode = TimerMode::Focus;
        self.time_left_secs = self.focus_secs;
        self.set_phase(SessionPhase::Stopped)
    }

    /// Recompute the remaining time from the deadline.
    ///
    /// When the countdown reaches zero this returns `TimerCompleted` for the
    /// finished mode followed by the `PhaseChanged` into the stopped next mode.
    pub fn tick_at(&mut self, now_ms: u64) -> Vec<Event> {
        let Some(target) = self.target_epoch_ms else {
            return Vec::new();
        };
        if now_ms >= target {
            return self.switch_mode();
        }
        self.time_left_secs = secs_left(target, now_ms);
        Vec::new()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn switch_mode(&mut self) -> Vec<Event> {
        let finished = self.mode;
        self.target_epoch_ms = None;
        self.mode = match finished {
            TimerMode::Focus => TimerMode::Break,
            TimerMode::Break => TimerMode::Focus,
        };
        self.time_left_secs = self.duration_of(self.mode);
        tracing::info!(?finished, next = ?self.mode, "timer phase finished");
        vec![
            Event::TimerCompleted {
                mode: finished,
                at: Utc::now(),
            },
            self.set_phase(SessionPhase::Stopped),
        ]
    }

    fn set_phase(&mut self, phase: SessionPhase) -> Event {
        self.phase = phase;
        Event::PhaseChanged {
            phase,
            mode: self.mode,
            time_left_secs: self.time_left_secs,
            at: Utc::now(),
        }
    }

    fn duration_of(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Focus => self.focus_secs,
            TimerMode::Break => self.break_secs,
        }
    }
}

/// Whole seconds left until `target`, rounded up.
fn secs_left(target_ms: u64, now_ms: u64) -> u64 {
    target_ms.saturating_sub(now_ms).div_ceil(1000)
}

/// `MM:SS`, minutes are not wrapped at 60.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
