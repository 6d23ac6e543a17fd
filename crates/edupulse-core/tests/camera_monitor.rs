use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use edupulse_core::engagement::{EngagementTracker, IdlePenalty};
use edupulse_core::motion::{CameraMonitor, FrameSource};
use edupulse_core::storage::{CameraConfig, EngagementConfig};
use edupulse_core::{CameraError, Event};
use image::{DynamicImage, Rgba, RgbaImage};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::sleep;

/// Plays solid-colour frames, then reports the stream as broken.
struct ScriptedSource {
    frames: VecDeque<u8>,
    fail_open: bool,
}

impl ScriptedSource {
    fn new(frames: &[u8]) -> Self {
        Self {
            frames: frames.iter().copied().collect(),
            fail_open: false,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn open(&mut self) -> Result<(), CameraError> {
        if self.fail_open {
            return Err(CameraError::AcquireFailed("permission denied".into()));
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<DynamicImage, CameraError> {
        let value = self
            .frames
            .pop_front()
            .ok_or_else(|| CameraError::StreamFailed("device unplugged".into()))?;
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            160,
            90,
            Rgba([value, value, value, 255]),
        )))
    }
}

fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn setup() -> (
    Arc<EngagementTracker>,
    CameraMonitor,
    UnboundedReceiver<Event>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let engagement = EngagementConfig {
        idle_after_secs: 10_000,
        ..EngagementConfig::default()
    };
    let tracker = Arc::new(EngagementTracker::new(&engagement, IdlePenalty::default(), tx.clone()));
    let monitor = CameraMonitor::new(&CameraConfig::default(), tx);
    (tracker, monitor, rx)
}

#[tokio::test(start_paused = true)]
async fn motion_reports_activity_until_stream_breaks() {
    let (tracker, mut monitor, mut rx) = setup();
    tracker.start().await;
    tracker.report_hidden().await;
    let state = monitor.subscribe();

    monitor
        .turn_on(ScriptedSource::new(&[0, 0, 200, 200]), Arc::clone(&tracker))
        .unwrap();
    assert!(monitor.is_on());

    // Samples at 0.5s (prime), 1.0s, 1.5s (motion), 2.0s, then 2.5s breaks.
    sleep(Duration::from_millis(3_250)).await;

    let events = drain(&mut rx);
    let motion = events
        .iter()
        .filter(|e| matches!(e, Event::MotionDetected { .. }))
        .count();
    assert_eq!(motion, 1);

    let camera: Vec<(bool, bool)> = events
        .iter()
        .filter_map(|e| match e {
            Event::CameraStateChanged { on, reason, .. } => Some((*on, reason.is_some())),
            _ => None,
        })
        .collect();
    assert_eq!(camera, vec![(true, false), (false, true)]);
    assert!(!monitor.is_on());
    assert!(!*state.borrow());

    // 0.5 after the hidden penalty, three decays, one bump.
    assert!((tracker.score().await - 0.585).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn acquisition_failure_reports_camera_off() {
    let (tracker, mut monitor, mut rx) = setup();
    let source = ScriptedSource {
        frames: VecDeque::new(),
        fail_open: true,
    };

    let err = monitor.turn_on(source, tracker).unwrap_err();
    assert!(matches!(err, CameraError::AcquireFailed(_)));
    assert!(!monitor.is_on());

    let events = drain(&mut rx);
    assert!(matches!(
        events.as_slice(),
        [Event::CameraStateChanged { on: false, reason: Some(_), .. }]
    ));
}

#[tokio::test(start_paused = true)]
async fn turning_off_stops_sampling() {
    let (tracker, mut monitor, mut rx) = setup();
    let frames: Vec<u8> = (0..40).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect();
    monitor
        .turn_on(ScriptedSource::new(&frames), Arc::clone(&tracker))
        .unwrap();

    sleep(Duration::from_millis(1_250)).await;
    monitor.turn_off();
    assert!(!monitor.is_on());
    drain(&mut rx);

    sleep(Duration::from_millis(5_000)).await;
    let events = drain(&mut rx);
    assert!(!events.iter().any(|e| matches!(e, Event::MotionDetected { .. })));
}

#[tokio::test(start_paused = true)]
async fn turning_off_after_stream_failure_reports_off_once() {
    let (tracker, mut monitor, mut rx) = setup();
    monitor
        .turn_on(ScriptedSource::new(&[0]), Arc::clone(&tracker))
        .unwrap();

    // 0.5s primes, 1.0s breaks the stream.
    sleep(Duration::from_millis(1_250)).await;
    assert!(!monitor.is_on());
    monitor.turn_off();

    let off = drain(&mut rx)
        .iter()
        .filter(|e| matches!(e, Event::CameraStateChanged { on: false, .. }))
        .count();
    assert_eq!(off, 1);
}
