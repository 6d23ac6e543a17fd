use edupulse_core::DashboardSummary;

use super::{load_config, open_store, print_json, CmdResult};

pub fn run(json: bool) -> CmdResult {
    let config = load_config()?;
    let progress = open_store()?.load_progress();
    // Outside a session there is no live history and the gauge reads full.
    let summary = DashboardSummary::build(&progress, config.timer.focus_secs / 60, 1.0, &[]);

    if json {
        return print_json(&summary);
    }
    println!("Total focus time:   {}", summary.focus_time_display());
    println!("Sessions completed: {}", summary.sessions_completed);
    println!("Current engagement: {}%", summary.current_percent);
    println!("Points:             {}", summary.points);
    println!(
        "Achievements:       {} unlocked, {} remaining",
        summary.achievements_unlocked, summary.achievements_remaining
    );
    println!("Recommendations:");
    for tip in &summary.recommendations {
        println!("  - {tip}");
    }
    Ok(())
}
