//! Engagement score state.
//!
//! Pure, synchronous state owned by the tracker. Every mutation goes through
//! a method here and leaves the score clamped to [0, 1]. Time is passed in
//! explicitly so the rules can be exercised without a runtime.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::storage::EngagementConfig;

pub const MAX_SCORE: f64 = 1.0;
pub const MIN_SCORE: f64 = 0.0;

/// Clamp into [0, 1]. NaN collapses to 0.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_SCORE;
    }
    value.clamp(MIN_SCORE, MAX_SCORE)
}

/// One decay tick's worth of history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
}

/// Bounded FIFO of records; the oldest is evicted first.
#[derive(Debug, Clone)]
pub struct EngagementHistory {
    records: VecDeque<EngagementRecord>,
    capacity: usize,
}

impl EngagementHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: EngagementRecord) {
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngagementRecord> {
        self.records.iter()
    }

    pub fn to_vec(&self) -> Vec<EngagementRecord> {
        self.records.iter().copied().collect()
    }
}

/// Result of one decay tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayOutcome {
    pub score: f64,
    /// True only on the tick that first crossed below the threshold.
    pub breached: bool,
}

#[derive(Debug, Clone)]
pub struct EngagementState {
    threshold: f64,
    decay_rate: f64,
    activity_bump: f64,
    visibility_penalty: f64,
    idle_after: Duration,
    score: f64,
    history: EngagementHistory,
    breached: bool,
    idle_penalty_applied: bool,
    last_activity: Instant,
}

impl EngagementState {
    pub fn new(config: &EngagementConfig, now: Instant) -> Self {
        Self {
            threshold: config.threshold,
            decay_rate: config.decay_rate,
            activity_bump: config.activity_bump,
            visibility_penalty: config.visibility_penalty,
            idle_after: config.idle_after(),
            score: MAX_SCORE,
            history: EngagementHistory::with_capacity(config.history_capacity),
            breached: false,
            idle_penalty_applied: false,
            last_activity: now,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn history(&self) -> &EngagementHistory {
        &self.history
    }

    pub fn breached(&self) -> bool {
        self.breached
    }

    pub fn idle_penalty_applied(&self) -> bool {
        self.idle_penalty_applied
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Fresh tracking session.
    pub fn restart(&mut self, now: Instant) {
        self.score = MAX_SCORE;
        self.history.clear();
        self.breached = false;
        self.idle_penalty_applied = false;
        self.last_activity = now;
    }

    /// Tracking stopped: score back to full, history discarded.
    pub fn clear(&mut self) {
        self.score = MAX_SCORE;
        self.history.clear();
    }

    /// Re-arm after an intervention. History is kept.
    pub fn reset(&mut self, now: Instant) {
        self.score = MAX_SCORE;
        self.breached = false;
        self.idle_penalty_applied = false;
        self.last_activity = now;
    }

    pub fn report_activity(&mut self, now: Instant) -> f64 {
        self.last_activity = now;
        self.idle_penalty_applied = false;
        self.score = clamp_score(self.score + self.activity_bump);
        self.score
    }

    pub fn decay(&mut self, at: DateTime<Utc>) -> DecayOutcome {
        self.score = clamp_score(self.score - self.decay_rate);
        self.history.push(EngagementRecord {
            timestamp: at,
            score: self.score,
        });
        let breached = self.score < self.threshold && !self.breached;
        if breached {
            self.breached = true;
        }
        DecayOutcome {
            score: self.score,
            breached,
        }
    }

    /// Returns (before, after).
    pub fn apply_visibility_penalty(&mut self) -> (f64, f64) {
        let before = self.score;
        self.score = clamp_score(self.score - self.visibility_penalty);
        (before, self.score)
    }

    /// Arms the idle penalty when the user has been idle long enough.
    ///
    /// Returns the idle duration when a penalty should be requested. The flag
    /// stays set until activity or a reset, so at most one request is made
    /// per idle period.
    pub fn take_idle_penalty(&mut self, now: Instant) -> Option<Duration> {
        if self.idle_penalty_applied {
            return None;
        }
        let idle = now.saturating_duration_since(self.last_activity);
        if idle <= self.idle_after {
            return None;
        }
        self.idle_penalty_applied = true;
        Some(idle)
    }

    /// Overwrite the score with a penalty result. Returns (before, after).
    pub fn apply_penalty_result(&mut self, score: f64) -> (f64, f64) {
        let before = self.score;
        self.score = clamp_score(score);
        (before, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> (EngagementState, Instant) {
        let now = Instant::now();
        (EngagementState::new(&EngagementConfig::default(), now), now)
    }

    #[test]
    fn clamp_handles_bounds_and_nan() {
        assert_eq!(clamp_score(1.4), 1.0);
        assert_eq!(clamp_score(-0.3), 0.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(0.42), 0.42);
    }

    #[test]
    fn history_evicts_oldest_first() {
        let mut history = EngagementHistory::with_capacity(3);
        for i in 0..5 {
            history.push(EngagementRecord {
                timestamp: Utc::now(),
                score: i as f64 / 10.0,
            });
        }
        let scores: Vec<f64> = history.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![0.2, 0.3, 0.4]);
    }

    #[test]
    fn activity_bumps_and_clears_idle_flag() {
        let (mut s, now) = state();
        s.apply_penalty_result(0.5);
        assert!(s.take_idle_penalty(now + Duration::from_secs(14)).is_some());
        assert!(s.idle_penalty_applied());

        let score = s.report_activity(now + Duration::from_secs(15));
        assert!((score - 0.6).abs() < 1e-12);
        assert!(!s.idle_penalty_applied());

        s.apply_penalty_result(0.95);
        assert_eq!(s.report_activity(now), 1.0);
    }

    #[test]
    fn breach_fires_once_per_session() {
        let (mut s, now) = state();
        let mut fired = 0;
        for _ in 0..60 {
            let before = s.breached();
            let outcome = s.decay(Utc::now());
            if outcome.breached {
                fired += 1;
                assert!(!before);
                assert!(outcome.score < s.threshold());
            } else if !before {
                assert!(outcome.score >= s.threshold());
            }
        }
        assert_eq!(fired, 1);

        s.reset(now);
        assert!(!s.breached());
        assert_eq!(s.score(), 1.0);
        assert_eq!(s.history().len(), 60);
    }

    #[test]
    fn idle_penalty_needs_strictly_more_than_idle_window() {
        let (mut s, now) = state();
        assert!(s.take_idle_penalty(now + Duration::from_secs(13)).is_none());
        assert!(s.take_idle_penalty(now + Duration::from_secs(14)).is_some());
        assert!(s.take_idle_penalty(now + Duration::from_secs(30)).is_none());
    }

    #[test]
    fn visibility_penalty_clamps_at_zero() {
        let (mut s, _) = state();
        assert_eq!(s.apply_visibility_penalty(), (1.0, 0.5));
        assert_eq!(s.apply_visibility_penalty(), (0.5, 0.0));
        assert_eq!(s.apply_visibility_penalty(), (0.0, 0.0));
    }

    #[test]
    fn restart_and_clear() {
        let (mut s, now) = state();
        for _ in 0..25 {
            s.decay(Utc::now());
        }
        s.clear();
        assert_eq!(s.score(), 1.0);
        assert!(s.history().is_empty());
        // clear keeps the breach flag; only restart or reset re-arm it
        assert!(s.breached());
        s.restart(now);
        assert!(!s.breached());
    }
}
