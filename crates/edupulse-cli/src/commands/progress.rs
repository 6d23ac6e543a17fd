use clap::Subcommand;

use super::{open_store, print_json, CmdResult};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Show points, completed sessions and unlocked achievements
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Erase all stored progress
    Reset,
}

pub fn run(action: ProgressAction) -> CmdResult {
    let store = open_store()?;
    match action {
        ProgressAction::Show { json } => {
            let progress = store.load_progress();
            if json {
                return print_json(&progress);
            }
            println!("Points:             {}", progress.points());
            println!("Sessions completed: {}", progress.sessions_completed());
            println!(
                "Achievements:       {} unlocked, {} remaining",
                progress.achievements().len(),
                progress.remaining_achievements()
            );
            for a in progress.achievements() {
                println!("  {} {}", a.icon.glyph(), a.name);
            }
        }
        ProgressAction::Reset => {
            store.clear()?;
            println!("progress reset");
        }
    }
    Ok(())
}
