//! Top-level coordinator.
//!
//! Wires the session timer to the engagement tracker, turns threshold
//! breaches into interventions and keeps persisted progress current. All
//! events, including the tracker's own, flow through one unbounded channel
//! whose receiver is handed to the front end; the front end passes each one
//! back through [`FocusApp::handle`] so the coordinator can react.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::challenge::{ChallengeProvider, EngagementChallenge};
use crate::dashboard::{DashboardSummary, GaugeView};
use crate::engagement::{EngagementSnapshot, EngagementTracker, IdlePenalty, IdlePenaltyService};
use crate::error::CoreError;
use crate::events::Event;
use crate::gamification::Progress;
use crate::storage::{Config, ProgressStore};
use crate::timer::{now_ms, SessionPhase, SessionTimer, TimerMode, TimerSnapshot};

/// An open re-engagement prompt. `challenge` is `None` while it loads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intervention {
    pub id: u64,
    pub challenge: Option<EngagementChallenge>,
    pub opened_at: DateTime<Utc>,
}

impl Intervention {
    pub fn is_loading(&self) -> bool {
        self.challenge.is_none()
    }
}

pub struct FocusApp<P = IdlePenalty> {
    config: Config,
    timer: SessionTimer,
    tracker: Arc<EngagementTracker<P>>,
    provider: Arc<ChallengeProvider>,
    store: ProgressStore,
    progress: Progress,
    intervention: Option<Intervention>,
    next_intervention: u64,
    loading: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<Event>,
}

impl FocusApp<IdlePenalty> {
    /// Build everything from configuration.
    pub fn from_config(
        config: Config,
        store: ProgressStore,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Event>), CoreError> {
        let penalty = IdlePenalty::from_config(&config.idle_penalty)?;
        let provider = ChallengeProvider::new(&config.challenge);
        Ok(Self::new(config, store, penalty, provider))
    }
}

impl<P: IdlePenaltyService> FocusApp<P> {
    pub fn new(
        config: Config,
        store: ProgressStore,
        penalty: P,
        provider: ChallengeProvider,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = Arc::new(EngagementTracker::new(&config.engagement, penalty, tx.clone()));
        let mut progress = store.load_progress();
        let unlocked = progress.sync_achievements();

        let mut app = Self {
            timer: SessionTimer::new(&config.timer),
            config,
            tracker,
            provider: Arc::new(provider),
            store,
            progress,
            intervention: None,
            next_intervention: 0,
            loading: None,
            events: tx,
        };
        if !unlocked.is_empty() {
            app.persist();
            app.emit_all(unlocked);
        }
        (app, rx)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    pub fn timer_snapshot(&self) -> TimerSnapshot {
        self.timer.snapshot()
    }

    pub fn tracker(&self) -> &Arc<EngagementTracker<P>> {
        &self.tracker
    }

    pub fn intervention(&self) -> Option<&Intervention> {
        self.intervention.as_ref()
    }

    /// Sender for collaborators that publish into the same stream.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<Event> {
        self.events.clone()
    }

    pub async fn engagement(&self) -> EngagementSnapshot {
        self.tracker.snapshot().await
    }

    pub async fn gauge(&self) -> GaugeView {
        let snap = self.tracker.snapshot().await;
        GaugeView::new(snap.score, snap.tracking)
    }

    pub async fn dashboard(&self) -> DashboardSummary {
        let snap = self.tracker.snapshot().await;
        DashboardSummary::build(
            &self.progress,
            self.config.timer.focus_secs / 60,
            snap.score,
            &snap.history,
        )
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub async fn start_timer(&mut self) {
        self.start_timer_at(now_ms()).await;
    }

    pub async fn pause_timer(&mut self) {
        self.pause_timer_at(now_ms()).await;
    }

    pub async fn tick(&mut self) {
        self.tick_at(now_ms()).await;
    }

    pub async fn start_timer_at(&mut self, now_ms: u64) {
        if let Some(event) = self.timer.start_at(now_ms) {
            self.on_timer_events(vec![event]).await;
        }
    }

    pub async fn pause_timer_at(&mut self, now_ms: u64) {
        if let Some(event) = self.timer.pause_at(now_ms) {
            self.on_timer_events(vec![event]).await;
        }
    }

    /// Start when stopped or paused, pause when running.
    pub async fn toggle_timer(&mut self) {
        if self.timer.is_active() {
            self.pause_timer().await;
        } else {
            self.start_timer().await;
        }
    }

    pub async fn reset_timer(&mut self) {
        let event = self.timer.reset();
        self.on_timer_events(vec![event]).await;
    }

    pub async fn tick_at(&mut self, now_ms: u64) {
        let events = self.timer.tick_at(now_ms);
        if !events.is_empty() {
            self.on_timer_events(events).await;
        }
    }

    // ── Input ────────────────────────────────────────────────────────

    pub async fn report_activity(&self) -> f64 {
        self.tracker.report_activity().await
    }

    pub async fn report_hidden(&self) -> Option<f64> {
        self.tracker.report_hidden().await
    }

    // ── Reactions ────────────────────────────────────────────────────

    /// React to an event taken off the stream.
    pub async fn handle(&mut self, event: &Event) {
        match event {
            Event::ThresholdBreached { score, .. } => self.on_breach(*score),
            Event::InterventionReady { id, challenge, .. } => {
                self.on_challenge_ready(*id, challenge.clone())
            }
            _ => {}
        }
    }

    /// Close the open intervention. Success awards points and re-arms the
    /// tracker. Returns false when nothing was open.
    pub async fn resolve_intervention(&mut self, success: bool) -> bool {
        if self.intervention.take().is_none() {
            return false;
        }
        self.cancel_loading();
        tracing::info!(success, "intervention resolved");
        self.emit(Event::InterventionResolved {
            success,
            at: Utc::now(),
        });
        if success {
            let events = self
                .progress
                .record_challenge_success(self.config.rewards.challenge_success_points);
            self.persist();
            self.emit_all(events);
            self.tracker.reset().await;
        }
        true
    }

    /// Check `answer` against the open challenge and resolve with the result.
    /// Returns `None` when nothing is open or the challenge is still loading.
    pub async fn answer_intervention(&mut self, answer: &str) -> Option<bool> {
        let challenge = self.intervention.as_ref()?.challenge.as_ref()?;
        let success = challenge.check_answer(answer);
        self.resolve_intervention(success).await;
        Some(success)
    }

    /// Shut down timers and tracking.
    pub async fn shutdown(&mut self) {
        self.cancel_loading();
        self.tracker.stop().await;
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn on_timer_events(&mut self, events: Vec<Event>) {
        for event in events {
            match &event {
                Event::TimerCompleted {
                    mode: TimerMode::Focus,
                    ..
                } => {
                    self.emit(event);
                    let earned = self
                        .progress
                        .record_focus_completion(self.config.rewards.focus_completion_points);
                    self.persist();
                    self.emit_all(earned);
                }
                Event::PhaseChanged { phase, .. } => {
                    let phase = *phase;
                    tracing::info!(?phase, "session phase changed");
                    self.emit(event);
                    if phase == SessionPhase::Focus {
                        self.tracker.start().await;
                    } else {
                        self.tracker.stop().await;
                    }
                }
                _ => self.emit(event),
            }
        }
    }

    /// Opens the intervention right away. Remote generation runs on its own
    /// task and comes back as `InterventionReady`, so the caller's loop keeps
    /// reading input while the challenge loads.
    fn on_breach(&mut self, score: f64) {
        if self.timer.phase() != SessionPhase::Focus {
            tracing::debug!(score, "breach outside focus ignored");
            return;
        }
        if self.intervention.is_some() {
            return;
        }
        self.next_intervention += 1;
        let id = self.next_intervention;
        tracing::info!(score, id, "intervention opened");
        self.intervention = Some(Intervention {
            id,
            challenge: None,
            opened_at: Utc::now(),
        });
        self.emit(Event::InterventionOpened { id, at: Utc::now() });

        if !self.provider.has_remote_challenge_provider() {
            let challenge = EngagementChallenge::fallback();
            self.emit(Event::InterventionReady {
                id,
                challenge: challenge.clone(),
                at: Utc::now(),
            });
            self.on_challenge_ready(id, challenge);
            return;
        }

        let provider = Arc::clone(&self.provider);
        let events = self.events.clone();
        self.loading = Some(tokio::spawn(async move {
            let challenge = provider.generate().await;
            let _ = events.send(Event::InterventionReady {
                id,
                challenge,
                at: Utc::now(),
            });
        }));
    }

    fn on_challenge_ready(&mut self, id: u64, challenge: EngagementChallenge) {
        match self.intervention.as_mut() {
            Some(open) if open.id == id && open.challenge.is_none() => {
                tracing::info!(id, kind = ?challenge.kind(), "challenge ready");
                open.challenge = Some(challenge);
                self.loading = None;
            }
            _ => tracing::debug!(id, "stale challenge dropped"),
        }
    }

    fn cancel_loading(&mut self) {
        if let Some(task) = self.loading.take() {
            task.abort();
        }
    }

    fn persist(&self) {
        if let Err(err) = self.store.save_progress(&self.progress) {
            tracing::warn!(%err, "failed to persist progress");
        }
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }

    fn emit_all(&self, events: Vec<Event>) {
        for event in events {
            self.emit(event);
        }
    }
}
