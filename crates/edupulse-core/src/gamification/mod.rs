//! Points and achievements.

mod achievements;
mod progress;

pub use achievements::{
    achievement_by_id, evaluate, Achievement, AchievementIcon, UnlockedAchievement, ACHIEVEMENTS,
};
pub use progress::Progress;
