//! Derived view models: the engagement gauge and the progress dashboard.
//!
//! Pure functions over tracker and progress state; front ends only format.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engagement::{EngagementRecord, MAX_SCORE};
use crate::gamification::{Progress, ACHIEVEMENTS};

const TREND_WINDOW: usize = 10;
const CHART_POINTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeBand {
    High,
    Medium,
    Low,
}

impl GaugeBand {
    pub fn for_score(score: f64) -> Self {
        if score > 0.7 {
            GaugeBand::High
        } else if score > 0.4 {
            GaugeBand::Medium
        } else {
            GaugeBand::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeView {
    /// Shown score: live while tracking, full otherwise.
    pub score: f64,
    pub percent: u32,
    pub band: GaugeBand,
    pub caption: &'static str,
}

impl GaugeView {
    pub fn new(score: f64, tracking: bool) -> Self {
        let score = if tracking { score } else { MAX_SCORE };
        Self {
            score,
            percent: to_percent(score),
            band: GaugeBand::for_score(score),
            caption: if tracking {
                "Stay Focused!"
            } else {
                "Start a session to begin."
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub focus_minutes: u64,
    pub focus_hours_part: u64,
    pub focus_minutes_part: u64,
    pub sessions_completed: u64,
    pub points: u64,
    pub current_percent: u32,
    pub average_engagement: f64,
    /// Mean of the last ten records minus mean of the first ten.
    pub engagement_trend: f64,
    pub best_score: Option<f64>,
    pub achievements_unlocked: usize,
    pub achievements_remaining: usize,
    pub chart: Vec<ChartPoint>,
    pub recommendations: Vec<&'static str>,
}

impl DashboardSummary {
    pub fn build(
        progress: &Progress,
        focus_minutes_per_session: u64,
        current_score: f64,
        history: &[EngagementRecord],
    ) -> Self {
        let focus_minutes = progress.sessions_completed() * focus_minutes_per_session;
        let average_engagement = mean(history.iter());
        let head = history.iter().take(TREND_WINDOW);
        let tail = history.iter().skip(history.len().saturating_sub(TREND_WINDOW));
        let engagement_trend = mean(tail) - mean(head);
        let best_score = history.iter().map(|r| r.score).reduce(f64::max);
        let unlocked = progress.achievements().len();

        let chart = history
            .iter()
            .skip(history.len().saturating_sub(CHART_POINTS))
            .map(|r| ChartPoint {
                timestamp: r.timestamp,
                percent: to_percent(r.score),
            })
            .collect();

        let mut recommendations = Vec::new();
        if average_engagement < 0.8 {
            recommendations.push("Try shorter focus sessions to maintain higher engagement");
        }
        if progress.sessions_completed() < 5 {
            recommendations.push("Complete more sessions to unlock achievements");
        }
        if engagement_trend < 0.0 {
            recommendations.push("Take regular breaks to prevent engagement decline");
        }
        recommendations.push("Keep your camera on for enhanced tracking accuracy");

        Self {
            focus_minutes,
            focus_hours_part: focus_minutes / 60,
            focus_minutes_part: focus_minutes % 60,
            sessions_completed: progress.sessions_completed(),
            points: progress.points(),
            current_percent: to_percent(current_score),
            average_engagement,
            engagement_trend,
            best_score,
            achievements_unlocked: unlocked,
            achievements_remaining: ACHIEVEMENTS.len().saturating_sub(unlocked),
            chart,
            recommendations,
        }
    }

    /// e.g. `2h 5m`
    pub fn focus_time_display(&self) -> String {
        format!("{}h {}m", self.focus_hours_part, self.focus_minutes_part)
    }

    /// Signed whole percent, e.g. `+3%` or `-12%`.
    pub fn trend_display(&self) -> String {
        let pct = (self.engagement_trend * 100.0).round() as i64;
        if self.engagement_trend > 0.0 {
            format!("+{pct}%")
        } else {
            format!("{pct}%")
        }
    }
}

fn mean<'a>(records: impl Iterator<Item = &'a EngagementRecord>) -> f64 {
    let (sum, count) = records.fold((0.0, 0usize), |(s, n), r| (s + r.score, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub fn to_percent(score: f64) -> u32 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u32
}
