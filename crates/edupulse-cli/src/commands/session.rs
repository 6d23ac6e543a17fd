//! Interactive focus session.
//!
//! stdout carries one JSON event per line; prompts and help go to stderr so
//! the event stream stays machine-readable.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use edupulse_core::{
    CameraMonitor, Config, EngagementChallenge, Event, FocusApp, ImageDirSource, ProgressStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::MissedTickBehavior;

use super::challenge::describe;
use super::{load_config, open_store, runtime, CmdResult};

#[derive(Args)]
pub struct SessionArgs {
    /// Directory of PNG/JPEG frames to sample for motion
    #[arg(long)]
    pub camera_dir: Option<PathBuf>,
    /// Replay camera frames from the first one when they run out
    #[arg(long)]
    pub loop_frames: bool,
    /// Start the focus countdown immediately
    #[arg(long)]
    pub start: bool,
    /// Also print engagement ticks, activity and motion events
    #[arg(long)]
    pub verbose: bool,
}

const HELP: &str = "\
keys: <Enter> activity | p start/pause | r reset | h tab hidden | s status | q quit";

pub fn run(args: SessionArgs) -> CmdResult {
    let config = load_config()?;
    let store = open_store()?;
    let rt = runtime()?;
    let result = rt.block_on(session(config, store, args));
    // A pending stdin read must not hold the process open.
    rt.shutdown_background();
    result
}

async fn session(config: Config, store: ProgressStore, args: SessionArgs) -> CmdResult {
    let tick_every = config.timer.tick_interval();
    let (mut app, mut events) = FocusApp::from_config(config, store)?;

    let mut camera = None;
    if let Some(dir) = args.camera_dir {
        let mut monitor = CameraMonitor::new(&app.config().camera, app.event_sender());
        let source = ImageDirSource::new(dir).looping(args.loop_frames);
        if let Err(err) = monitor.turn_on(source, Arc::clone(app.tracker())) {
            eprintln!("camera unavailable: {err}");
        }
        camera = Some(monitor);
    }

    eprintln!("{HELP}");
    if args.start {
        app.start_timer().await;
    }

    let mut ticker = tokio::time::interval(tick_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => app.tick().await,
            Some(event) = events.recv() => {
                on_event(&mut app, &event, args.verbose).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !on_input(&mut app, line.trim()).await? {
                    break;
                }
            }
        }
    }

    if let Some(monitor) = camera.as_mut() {
        monitor.turn_off();
    }
    app.shutdown().await;
    drain(&mut app, &mut events, args.verbose).await?;

    let summary = app.dashboard().await;
    eprintln!(
        "session over: {} points, {} sessions completed, {} focus time",
        summary.points,
        summary.sessions_completed,
        summary.focus_time_display()
    );
    Ok(())
}

async fn on_event(app: &mut FocusApp, event: &Event, verbose: bool) -> CmdResult {
    if verbose || !event.is_periodic() {
        println!("{}", serde_json::to_string(event)?);
    }
    app.handle(event).await;

    match event {
        Event::InterventionOpened { .. } if app.intervention().is_some_and(|i| i.is_loading()) => {
            eprintln!("engagement dropped, loading a challenge...");
        }
        Event::InterventionReady { id, .. } => {
            if let Some(challenge) = app
                .intervention()
                .filter(|open| open.id == *id)
                .and_then(|open| open.challenge.as_ref())
            {
                eprintln!("{}", prompt(challenge));
            }
        }
        _ => {}
    }
    Ok(())
}

async fn drain(
    app: &mut FocusApp,
    events: &mut UnboundedReceiver<Event>,
    verbose: bool,
) -> CmdResult {
    while let Ok(event) = events.try_recv() {
        on_event(app, &event, verbose).await?;
    }
    Ok(())
}

/// Returns false when the user asked to quit.
async fn on_input(app: &mut FocusApp, input: &str) -> Result<bool, Box<dyn std::error::Error>> {
    if input == "q" {
        return Ok(false);
    }

    // Keys keep working while a challenge is still loading.
    if let Some(challenge) = app.intervention().and_then(|open| open.challenge.clone()) {
        let success = app.answer_intervention(input).await.unwrap_or(false);
        if let EngagementChallenge::Joke { punchline, .. } = &challenge {
            eprintln!("{punchline}");
        }
        if success {
            eprintln!(
                "nice! +{} points",
                app.config().rewards.challenge_success_points
            );
        } else {
            eprintln!("not quite, back to work");
        }
        return Ok(true);
    }

    match input {
        "" => {
            app.report_activity().await;
        }
        "p" => app.toggle_timer().await,
        "r" => app.reset_timer().await,
        "h" => {
            app.report_hidden().await;
        }
        "s" => {
            let status = serde_json::json!({
                "timer": app.timer_snapshot(),
                "gauge": app.gauge().await,
                "points": app.progress().points(),
            });
            eprintln!("{}", serde_json::to_string_pretty(&status)?);
        }
        "?" => eprintln!("{HELP}"),
        other => eprintln!("unknown key {other:?}, ? for help"),
    }
    Ok(true)
}

fn prompt(challenge: &EngagementChallenge) -> String {
    match challenge {
        EngagementChallenge::Joke { question, .. } => {
            format!("Joke: {question}\n  (press Enter for the punchline)")
        }
        EngagementChallenge::Counting { .. } => {
            format!("{}\n  type your answer:", describe(challenge))
        }
        EngagementChallenge::FunFact { .. } => {
            format!("{}\n  (press Enter to continue)", describe(challenge))
        }
    }
}
