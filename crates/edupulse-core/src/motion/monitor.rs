//! Periodic camera sampling.
//!
//! While the camera is on, a task pulls a frame every sample interval, runs
//! it through the [`MotionDetector`] and reports activity to the engagement
//! tracker when motion is seen. Acquisition or stream failures switch the
//! camera off and drop the frame buffer; they never propagate as panics.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};

use super::detector::MotionDetector;
use super::source::FrameSource;
use crate::engagement::{EngagementTracker, IdlePenaltyService};
use crate::error::CameraError;
use crate::events::Event;
use crate::storage::CameraConfig;

pub struct CameraMonitor {
    config: CameraConfig,
    events: mpsc::UnboundedSender<Event>,
    state: Arc<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl CameraMonitor {
    pub fn new(config: &CameraConfig, events: mpsc::UnboundedSender<Event>) -> Self {
        let (state, _) = watch::channel(false);
        Self {
            config: config.clone(),
            events,
            state: Arc::new(state),
            task: None,
        }
    }

    pub fn is_on(&self) -> bool {
        *self.state.borrow()
    }

    /// Observe on/off transitions, including ones forced by failures.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Acquire `source` and start sampling.
    ///
    /// On acquisition failure the camera is reported off and the error is
    /// returned; no task is left running.
    pub fn turn_on<S, P>(
        &mut self,
        mut source: S,
        tracker: Arc<EngagementTracker<P>>,
    ) -> Result<(), CameraError>
    where
        S: FrameSource,
        P: IdlePenaltyService,
    {
        self.stop_task();
        if let Err(err) = source.open() {
            tracing::error!(%err, "camera acquisition failed");
            set_camera_state(&self.state, &self.events, false, Some(err.to_string()));
            return Err(err);
        }
        set_camera_state(&self.state, &self.events, true, None);
        tracing::info!("camera on");

        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let period = self.config.sample_interval();
        let detector = MotionDetector::new(&self.config);

        self.task = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut worker = Some((source, detector));
            loop {
                interval.tick().await;
                let Some((source, detector)) = worker.take() else {
                    break;
                };
                // Frame reads, decoding and resizing block; keep them off the runtime.
                let (source, mut detector, sampled) = match task::spawn_blocking(move || {
                    let (mut source, mut detector) = (source, detector);
                    let sampled = source.next_frame().map(|frame| detector.sample(&frame));
                    (source, detector, sampled)
                })
                .await
                {
                    Ok(done) => done,
                    Err(err) => {
                        tracing::error!(%err, "camera sampling task failed");
                        set_camera_state(&state, &events, false, Some(err.to_string()));
                        break;
                    }
                };
                let reading = match sampled {
                    Ok(reading) => reading,
                    Err(err) => {
                        tracing::error!(%err, "camera stream failed");
                        detector.clear();
                        drop(source);
                        set_camera_state(&state, &events, false, Some(err.to_string()));
                        break;
                    }
                };
                worker = Some((source, detector));
                let Some(reading) = reading else {
                    continue;
                };
                tracing::trace!(mean_delta = reading.mean_delta, "frame sampled");
                if reading.motion {
                    let _ = events.send(Event::MotionDetected {
                        mean_delta: reading.mean_delta,
                        at: Utc::now(),
                    });
                    tracker.report_activity().await;
                }
            }
        }));
        Ok(())
    }

    /// Stop sampling and release the source. Reports a transition only when
    /// the camera was still on.
    pub fn turn_off(&mut self) {
        self.stop_task();
        if self.is_on() {
            set_camera_state(&self.state, &self.events, false, None);
            tracing::info!("camera off");
        }
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CameraMonitor {
    fn drop(&mut self) {
        self.stop_task();
    }
}

fn set_camera_state(
    state: &watch::Sender<bool>,
    events: &mpsc::UnboundedSender<Event>,
    on: bool,
    reason: Option<String>,
) {
    state.send_replace(on);
    let _ = events.send(Event::CameraStateChanged {
        on,
        reason,
        at: Utc::now(),
    });
}
