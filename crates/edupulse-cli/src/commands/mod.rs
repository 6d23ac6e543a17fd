pub mod achievements;
pub mod challenge;
pub mod config;
pub mod dashboard;
pub mod motion;
pub mod progress;
pub mod session;

use edupulse_core::{Config, Database, ProgressStore};

pub(crate) type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    Ok(Config::load()?.with_env_overrides())
}

pub(crate) fn open_store() -> Result<ProgressStore, Box<dyn std::error::Error>> {
    Ok(ProgressStore::new(Database::open()?))
}

pub(crate) fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
