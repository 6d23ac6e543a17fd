//! Static achievement catalog and the unlock evaluator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementIcon {
    Star,
    Brain,
    Trophy,
}

impl AchievementIcon {
    /// Single-glyph rendering for terminals.
    pub fn glyph(self) -> &'static str {
        match self {
            AchievementIcon::Star => "*",
            AchievementIcon::Brain => "@",
            AchievementIcon::Trophy => "#",
        }
    }
}

/// Catalog entry. `condition` receives (points, sessions_completed).
#[derive(Debug, Clone, Copy)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: AchievementIcon,
    pub condition: fn(u64, u64) -> bool,
}

impl Achievement {
    pub fn is_met(&self, points: u64, sessions_completed: u64) -> bool {
        (self.condition)(points, sessions_completed)
    }
}

pub const ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "first_points",
        name: "Point Scorer",
        description: "Earn your first 10 points.",
        icon: AchievementIcon::Star,
        condition: |points, _| points >= 10,
    },
    Achievement {
        id: "first_pomodoro",
        name: "Focus Starter",
        description: "Complete your first Focus session.",
        icon: AchievementIcon::Brain,
        condition: |_, sessions| sessions >= 1,
    },
    Achievement {
        id: "master_pomodoro",
        name: "Focus Master",
        description: "Complete 5 Focus sessions.",
        icon: AchievementIcon::Brain,
        condition: |_, sessions| sessions >= 5,
    },
    Achievement {
        id: "point_collector",
        name: "Point Collector",
        description: "Reach 100 points.",
        icon: AchievementIcon::Trophy,
        condition: |points, _| points >= 100,
    },
    Achievement {
        id: "point_hoarder",
        name: "Point Hoarder",
        description: "Reach 500 points.",
        icon: AchievementIcon::Trophy,
        condition: |points, _| points >= 500,
    },
];

pub fn achievement_by_id(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Persisted form of an unlocked catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: AchievementIcon,
}

impl From<&Achievement> for UnlockedAchievement {
    fn from(a: &Achievement) -> Self {
        Self {
            id: a.id.to_string(),
            name: a.name.to_string(),
            description: a.description.to_string(),
            icon: a.icon,
        }
    }
}

/// Catalog entries that qualify now and are not unlocked yet, in catalog order.
pub fn evaluate(
    points: u64,
    sessions_completed: u64,
    unlocked: &[UnlockedAchievement],
) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| !unlocked.iter().any(|u| u.id == a.id))
        .filter(|a| a.is_met(points, sessions_completed))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&Achievement]) -> Vec<&'static str> {
        list.iter().map(|a| a.id).collect()
    }

    #[test]
    fn nothing_at_zero() {
        assert!(evaluate(0, 0, &[]).is_empty());
    }

    #[test]
    fn ten_points_unlocks_point_scorer() {
        assert_eq!(ids(&evaluate(10, 0, &[])), ["first_points"]);
        assert!(evaluate(9, 0, &[]).is_empty());
    }

    #[test]
    fn first_session_unlocks_focus_starter() {
        assert_eq!(ids(&evaluate(0, 1, &[])), ["first_pomodoro"]);
    }

    #[test]
    fn hundred_points_unlocks_two_at_once() {
        assert_eq!(ids(&evaluate(100, 0, &[])), ["first_points", "point_collector"]);
    }

    #[test]
    fn already_unlocked_entries_are_skipped() {
        let unlocked: Vec<UnlockedAchievement> = evaluate(600, 5, &[])
            .into_iter()
            .map(UnlockedAchievement::from)
            .collect();
        assert_eq!(unlocked.len(), ACHIEVEMENTS.len());
        assert!(evaluate(600, 5, &unlocked).is_empty());
    }

    #[test]
    fn catalog_ids_are_unique() {
        for (i, a) in ACHIEVEMENTS.iter().enumerate() {
            assert!(ACHIEVEMENTS[i + 1..].iter().all(|b| b.id != a.id));
        }
        assert_eq!(achievement_by_id("point_hoarder").unwrap().name, "Point Hoarder");
        assert!(achievement_by_id("nope").is_none());
    }
}
