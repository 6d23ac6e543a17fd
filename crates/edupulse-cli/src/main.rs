use std::panic::{self, AssertUnwindSafe};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "edupulse", version, about = "EduPulse focus assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive focus session on the terminal
    Session(commands::session::SessionArgs),
    /// Points, sessions and unlocked achievements
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// List the achievement catalog with unlock status
    Achievements {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate one engagement challenge
    Challenge {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the progress dashboard
    Dashboard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Frame comparison utilities
    Motion {
        #[command(subcommand)]
        action: commands::motion::MotionAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("edupulse=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Session(args) => commands::session::run(args),
        Commands::Progress { action } => commands::progress::run(action),
        Commands::Achievements { json } => commands::achievements::run(json),
        Commands::Challenge { json } => commands::challenge::run(json),
        Commands::Dashboard { json } => commands::dashboard::run(json),
        Commands::Motion { action } => commands::motion::run(action),
        Commands::Config { action } => commands::config::run(action),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging();
    panic::set_hook(Box::new(|info| {
        tracing::error!("unhandled panic: {info}");
    }));

    match panic::catch_unwind(AssertUnwindSafe(|| run(cli.command))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("error: something went wrong. Please restart edupulse.");
            std::process::exit(1);
        }
    }
}
