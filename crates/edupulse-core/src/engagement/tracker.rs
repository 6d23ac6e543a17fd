//! Async engagement tracker.
//!
//! Owns the [`EngagementState`] behind a tokio mutex and runs two periodic
//! tasks per tracking session: the decay tick and the idle check. Every
//! session gets a generation number; tasks from an older generation exit on
//! their next wake-up even if the abort has not landed yet, so starting and
//! stopping never leaves duplicate timers behind.
//!
//! Idle penalties are fire-and-forget. The request is spawned detached and
//! its result overwrites the score whenever it resolves, including after
//! activity, decay ticks or a stop in the meantime.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use super::penalty::{IdlePenalty, IdlePenaltyService};
use super::score::{EngagementRecord, EngagementState};
use crate::events::Event;
use crate::storage::EngagementConfig;

/// Read-only view for gauges and charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementSnapshot {
    pub tracking: bool,
    pub session_id: Option<String>,
    pub score: f64,
    pub threshold: f64,
    pub breached: bool,
    pub idle_penalty_applied: bool,
    pub history: Vec<EngagementRecord>,
}

struct Session {
    id: String,
    generation: u64,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner {
    state: EngagementState,
    session: Option<Session>,
    generation: u64,
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.generation == generation)
    }

    /// Abort the running session's tasks. Returns its id.
    fn teardown(&mut self) -> Option<String> {
        let session = self.session.take()?;
        for task in session.tasks {
            task.abort();
        }
        Some(session.id)
    }
}

pub struct EngagementTracker<P = IdlePenalty> {
    inner: Arc<Mutex<Inner>>,
    penalty: Arc<P>,
    events: mpsc::UnboundedSender<Event>,
    tick_interval: Duration,
    idle_check_interval: Duration,
}

impl<P: IdlePenaltyService> EngagementTracker<P> {
    pub fn new(config: &EngagementConfig, penalty: P, events: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: EngagementState::new(config, Instant::now()),
                session: None,
                generation: 0,
            })),
            penalty: Arc::new(penalty),
            events,
            tick_interval: config.tick_interval(),
            idle_check_interval: config.idle_check_interval(),
        }
    }

    /// Tracker plus the receiving end of its event stream.
    pub fn with_channel(config: &EngagementConfig, penalty: P) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(config, penalty, tx), rx)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh tracking session, replacing any running one.
    pub async fn start(&self) -> String {
        let mut inner = self.inner.lock().await;
        if let Some(previous) = inner.teardown() {
            tracing::debug!(session_id = %previous, "replacing tracking session");
        }
        inner.generation += 1;
        let generation = inner.generation;
        inner.state.restart(Instant::now());

        let id = Uuid::new_v4().to_string();
        let tasks = vec![self.spawn_decay(generation), self.spawn_idle_check(generation)];
        inner.session = Some(Session {
            id: id.clone(),
            generation,
            tasks,
        });
        drop(inner);

        tracing::info!(session_id = %id, "engagement tracking started");
        self.emit(Event::TrackingStarted {
            session_id: id.clone(),
            at: Utc::now(),
        });
        id
    }

    /// Halt the periodic tasks and discard the session's history.
    ///
    /// Returns false when nothing was being tracked.
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let session_id = inner.teardown();
        inner.state.clear();
        drop(inner);

        let Some(session_id) = session_id else {
            return false;
        };
        tracing::info!(session_id = %session_id, "engagement tracking stopped");
        self.emit(Event::TrackingStopped {
            session_id: Some(session_id),
            at: Utc::now(),
        });
        true
    }

    /// Full score, breach and idle flags re-armed. History is kept.
    pub async fn reset(&self) {
        self.inner.lock().await.state.reset(Instant::now());
        tracing::debug!("engagement reset");
        self.emit(Event::EngagementReset { at: Utc::now() });
    }

    /// Any input activity. Valid whether or not tracking is running.
    pub async fn report_activity(&self) -> f64 {
        let score = self.inner.lock().await.state.report_activity(Instant::now());
        self.emit(Event::ActivityReported {
            score,
            at: Utc::now(),
        });
        score
    }

    /// The host went to the background. Ignored while not tracking.
    pub async fn report_hidden(&self) -> Option<f64> {
        let mut inner = self.inner.lock().await;
        if inner.session.is_none() {
            return None;
        }
        let (before, after) = inner.state.apply_visibility_penalty();
        drop(inner);

        tracing::info!(score_before = before, score_after = after, "visibility penalty");
        self.emit(Event::VisibilityPenalty {
            score_before: before,
            score_after: after,
            at: Utc::now(),
        });
        Some(after)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn score(&self) -> f64 {
        self.inner.lock().await.state.score()
    }

    pub async fn is_tracking(&self) -> bool {
        self.inner.lock().await.session.is_some()
    }

    pub async fn history(&self) -> Vec<EngagementRecord> {
        self.inner.lock().await.state.history().to_vec()
    }

    pub async fn snapshot(&self) -> EngagementSnapshot {
        let inner = self.inner.lock().await;
        EngagementSnapshot {
            tracking: inner.session.is_some(),
            session_id: inner.session.as_ref().map(|s| s.id.clone()),
            score: inner.state.score(),
            threshold: inner.state.threshold(),
            breached: inner.state.breached(),
            idle_penalty_applied: inner.state.idle_penalty_applied(),
            history: inner.state.history().to_vec(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn emit(&self, event: Event) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn spawn_decay(&self, generation: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let events = self.events.clone();
        let period = self.tick_interval;

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let mut guard = inner.lock().await;
                if !guard.is_current(generation) {
                    break;
                }
                let outcome = guard.state.decay(Utc::now());
                let threshold = guard.state.threshold();
                drop(guard);

                tracing::debug!(score = outcome.score, "engagement decay");
                let _ = events.send(Event::EngagementTick {
                    score: outcome.score,
                    at: Utc::now(),
                });
                if outcome.breached {
                    tracing::info!(score = outcome.score, threshold, "engagement threshold breached");
                    let _ = events.send(Event::ThresholdBreached {
                        score: outcome.score,
                        threshold,
                        at: Utc::now(),
                    });
                }
            }
        })
    }

    fn spawn_idle_check(&self, generation: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let events = self.events.clone();
        let penalty = Arc::clone(&self.penalty);
        let period = self.idle_check_interval;

        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let mut guard = inner.lock().await;
                if !guard.is_current(generation) {
                    break;
                }
                let due = guard.state.take_idle_penalty(Instant::now());
                let score = guard.state.score();
                drop(guard);

                if let Some(idle) = due {
                    let idle_ms = idle.as_millis() as u64;
                    tracing::info!(score, idle_ms, "requesting idle penalty");
                    let _ = events.send(Event::IdlePenaltyRequested {
                        score,
                        idle_ms,
                        at: Utc::now(),
                    });
                    spawn_penalty(Arc::clone(&penalty), weak.clone(), events.clone(), score);
                }
            }
        })
    }
}

/// Run one penalty request and apply its result unconditionally.
fn spawn_penalty<P: IdlePenaltyService>(
    penalty: Arc<P>,
    inner: Weak<Mutex<Inner>>,
    events: mpsc::UnboundedSender<Event>,
    score: f64,
) {
    tokio::spawn(async move {
        match penalty.penalize(score).await {
            Ok(new_score) => {
                let Some(inner) = inner.upgrade() else { return };
                let (before, after) = inner.lock().await.state.apply_penalty_result(new_score);
                tracing::info!(score_before = before, score_after = after, "idle penalty applied");
                let _ = events.send(Event::IdlePenaltyApplied {
                    score_before: before,
                    score_after: after,
                    at: Utc::now(),
                });
            }
            Err(err) => {
                tracing::warn!(%err, "idle penalty failed, score left unchanged");
                let _ = events.send(Event::IdlePenaltyFailed {
                    reason: err.to_string(),
                    at: Utc::now(),
                });
            }
        }
    });
}

impl<P> Drop for EngagementTracker<P> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_lock() {
            inner.teardown();
        }
    }
}
