use std::path::PathBuf;

use clap::Subcommand;
use edupulse_core::motion::{downscale, mean_delta};
use serde::Serialize;

use super::{load_config, print_json, CmdResult};

#[derive(Subcommand)]
pub enum MotionAction {
    /// Compare two frames the way the camera sampler does
    Diff {
        /// Reference frame
        a: PathBuf,
        /// Current frame
        b: PathBuf,
        /// Override the configured motion threshold
        #[arg(long)]
        threshold: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct DiffReport {
    mean_delta: f64,
    threshold: f64,
    motion: bool,
}

pub fn run(action: MotionAction) -> CmdResult {
    match action {
        MotionAction::Diff {
            a,
            b,
            threshold,
            json,
        } => {
            let camera = load_config()?.camera;
            let threshold = threshold.unwrap_or(camera.motion_threshold);
            let first = downscale(&image::open(&a)?, camera.width, camera.height);
            let second = downscale(&image::open(&b)?, camera.width, camera.height);
            let delta = mean_delta(&first, &second)?;
            let report = DiffReport {
                mean_delta: delta,
                threshold,
                motion: delta > threshold,
            };

            if json {
                return print_json(&report);
            }
            println!("mean delta: {:.3}", report.mean_delta);
            println!(
                "motion:     {} (threshold {})",
                if report.motion { "yes" } else { "no" },
                report.threshold
            );
        }
    }
    Ok(())
}
