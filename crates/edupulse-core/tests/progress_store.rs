use edupulse_core::storage::{KEY_ACHIEVEMENTS, KEY_POINTS, KEY_SESSIONS_COMPLETED};
use edupulse_core::{Database, Progress, ProgressStore};

fn open(dir: &tempfile::TempDir) -> ProgressStore {
    ProgressStore::new(Database::open_path(&dir.path().join("edupulse.db")).unwrap())
}

#[test]
fn progress_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open(&dir);
        let mut progress = Progress::default();
        progress.record_focus_completion(25);
        progress.record_challenge_success(10);
        store.save_progress(&progress).unwrap();
    }

    let progress = open(&dir).load_progress();
    assert_eq!(progress.points(), 35);
    assert_eq!(progress.sessions_completed(), 1);
    let ids: Vec<&str> = progress.achievements().iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["first_points", "first_pomodoro"]);
}

#[test]
fn values_are_stored_as_json_under_named_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let mut progress = Progress::default();
    progress.award(12, "test");
    store.save_progress(&progress).unwrap();

    let db = store.database();
    assert_eq!(db.kv_get(KEY_POINTS).unwrap().as_deref(), Some("12"));
    assert_eq!(db.kv_get(KEY_SESSIONS_COMPLETED).unwrap().as_deref(), Some("0"));
    let raw = db.kv_get(KEY_ACHIEVEMENTS).unwrap().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed[0]["id"], "first_points");
    assert_eq!(parsed[0]["icon"], "star");
}

#[test]
fn corrupt_values_read_as_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    store.database().kv_set(KEY_POINTS, "{broken").unwrap();
    store.database().kv_set(KEY_SESSIONS_COMPLETED, "3").unwrap();

    let progress = store.load_progress();
    assert_eq!(progress.points(), 0);
    assert_eq!(progress.sessions_completed(), 3);
}

#[test]
fn achievements_never_shrink_across_saves() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let mut progress = Progress::default();
    progress.award(150, "test");
    store.save_progress(&progress).unwrap();

    let mut reloaded = store.load_progress();
    assert!(reloaded.sync_achievements().is_empty());
    store.save_progress(&reloaded).unwrap();
    assert_eq!(store.load_progress().achievements().len(), 2);
}
