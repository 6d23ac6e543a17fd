use edupulse_core::ACHIEVEMENTS;
use serde::Serialize;

use super::{open_store, print_json, CmdResult};

#[derive(Serialize)]
struct Row {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    unlocked: bool,
}

pub fn run(json: bool) -> CmdResult {
    let progress = open_store()?.load_progress();
    let rows: Vec<Row> = ACHIEVEMENTS
        .iter()
        .map(|a| Row {
            id: a.id,
            name: a.name,
            description: a.description,
            unlocked: progress.achievements().iter().any(|u| u.id == a.id),
        })
        .collect();

    if json {
        return print_json(&rows);
    }
    for (row, a) in rows.iter().zip(ACHIEVEMENTS) {
        let mark = if row.unlocked { "x" } else { " " };
        println!("[{mark}] {} {:<16} {}", a.icon.glyph(), row.name, row.description);
    }
    Ok(())
}
