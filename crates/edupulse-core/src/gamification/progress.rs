use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::achievements::{evaluate, UnlockedAchievement, ACHIEVEMENTS};
use crate::events::Event;

/// Points, completed focus sessions and unlocked achievements.
///
/// Every mutation re-runs the evaluator; the unlocked list only grows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    points: u64,
    sessions_completed: u64,
    achievements: Vec<UnlockedAchievement>,
}

impl Progress {
    /// Rebuild from persisted values without evaluating.
    pub fn restore(points: u64, sessions_completed: u64, achievements: Vec<UnlockedAchievement>) -> Self {
        Self {
            points,
            sessions_completed,
            achievements,
        }
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn sessions_completed(&self) -> u64 {
        self.sessions_completed
    }

    pub fn achievements(&self) -> &[UnlockedAchievement] {
        &self.achievements
    }

    pub fn remaining_achievements(&self) -> usize {
        ACHIEVEMENTS.len().saturating_sub(self.achievements.len())
    }

    pub fn award(&mut self, amount: u64, reason: &str) -> Vec<Event> {
        self.points = self.points.saturating_add(amount);
        let mut events = vec![Event::PointsAwarded {
            amount,
            total: self.points,
            reason: reason.to_string(),
            at: Utc::now(),
        }];
        events.extend(self.sync_achievements());
        events
    }

    pub fn record_focus_completion(&mut self, points: u64) -> Vec<Event> {
        self.sessions_completed += 1;
        let mut events = vec![Event::FocusCompleted {
            sessions_completed: self.sessions_completed,
            at: Utc::now(),
        }];
        events.extend(self.award(points, "focus session completed"));
        events
    }

    pub fn record_challenge_success(&mut self, points: u64) -> Vec<Event> {
        self.award(points, "challenge completed")
    }

    /// Unlock whatever qualifies now. Idempotent.
    pub fn sync_achievements(&mut self) -> Vec<Event> {
        let fresh = evaluate(self.points, self.sessions_completed, &self.achievements);
        let mut events = Vec::with_capacity(fresh.len());
        for achievement in fresh {
            tracing::info!(id = achievement.id, "achievement unlocked");
            events.push(Event::AchievementUnlocked {
                id: achievement.id.to_string(),
                name: achievement.name.to_string(),
                at: Utc::now(),
            });
            self.achievements.push(UnlockedAchievement::from(achievement));
        }
        events
    }

    /// Back to zero. Used by `progress reset`.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
