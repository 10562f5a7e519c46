use std::time::Duration;

use cast_proto::protocol::{Episode, PlayerState};
use cast_proto::store::StateStore;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

fn sample_state() -> PlayerState {
    let episodes = vec![
        Episode {
            title: "Monday".into(),
            date: Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).unwrap(),
            audio_url: "https://cdn.example.org/mon.mp3".into(),
            ilpost_id: Some("mon".into()),
            duration_secs: Some(1500),
        },
        Episode {
            title: "Tuesday".into(),
            date: Utc.with_ymd_and_hms(2024, 3, 5, 6, 0, 0).unwrap(),
            audio_url: "https://cdn.example.org/tue.mp3".into(),
            ilpost_id: None,
            duration_secs: None,
        },
    ];
    PlayerState {
        current_time: 93.2,
        src: episodes[0].audio_url.clone(),
        title: episodes[0].title.clone(),
        podcast_id: Some("12".into()),
        episode_index: Some(0),
        episodes,
        is_playing: true,
        is_minimized: true,
        cover_image: Some("https://cdn.example.org/cover.jpg".into()),
        background_image: None,
        description: Some("<p>morning news</p>".into()),
    }
}

#[test]
fn save_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let store: StateStore<PlayerState> = StateStore::open(dir.path(), "player_state");

    let state = sample_state();
    store.save(&state).unwrap();

    let loaded = store.load().expect("snapshot should load");
    assert_eq!(loaded.src, state.src);
    assert_eq!(loaded.episode_index, state.episode_index);
    assert_eq!(loaded.episodes.len(), state.episodes.len());
    assert_eq!(loaded, state);
}

#[test]
fn clear_removes_the_snapshot() {
    let dir = TempDir::new().unwrap();
    let store: StateStore<PlayerState> = StateStore::open(dir.path(), "player_state");

    store.save(&sample_state()).unwrap();
    assert!(store.exists());

    store.clear();
    assert!(!store.exists());
    assert!(store.load().is_none());

    // Clearing an already-empty store is fine.
    store.clear();
}

#[test]
fn corrupt_file_loads_as_none() {
    let dir = TempDir::new().unwrap();
    let store: StateStore<PlayerState> = StateStore::open(dir.path(), "player_state");

    std::fs::write(store.path(), "{ not json").unwrap();
    assert!(store.load().is_none());

    // Valid JSON that is not a record envelope is equally ignored.
    std::fs::write(store.path(), "{\"src\": \"x\"}").unwrap();
    assert!(store.load().is_none());
}

#[test]
fn foreign_slice_is_ignored() {
    let dir = TempDir::new().unwrap();
    let prefs: StateStore<PlayerState> = StateStore::open(dir.path(), "player_state");
    prefs.save(&sample_state()).unwrap();

    // Point a differently-named store at the same file contents.
    let other: StateStore<PlayerState> = StateStore::open(dir.path(), "ui_prefs");
    std::fs::copy(prefs.path(), other.path()).unwrap();
    assert!(other.load().is_none());
}

#[test]
fn version_mismatch_is_ignored() {
    let dir = TempDir::new().unwrap();
    let store: StateStore<PlayerState> = StateStore::open(dir.path(), "player_state");
    store.save(&sample_state()).unwrap();

    let content = std::fs::read_to_string(store.path()).unwrap();
    let bumped = content.replace("\"version\": 1", "\"version\": 99");
    assert_ne!(content, bumped);
    std::fs::write(store.path(), bumped).unwrap();

    assert!(store.load().is_none());
}

#[test]
fn load_fresh_honors_max_age() {
    let dir = TempDir::new().unwrap();
    let store: StateStore<PlayerState> = StateStore::open(dir.path(), "player_state");
    store.save(&sample_state()).unwrap();

    assert!(store.load_fresh(Duration::from_secs(3600)).is_some());

    // Backdate the record two days.
    let content = std::fs::read_to_string(store.path()).unwrap();
    let saved_at = chrono::Utc::now().timestamp();
    let mut backdated = None;
    // saved_at was written within the last couple of seconds.
    for ts in (saved_at - 2)..=saved_at {
        let needle = format!("\"saved_at\": {ts}");
        if content.contains(&needle) {
            backdated = Some(content.replace(
                &needle,
                &format!("\"saved_at\": {}", ts - 2 * 24 * 3600),
            ));
            break;
        }
    }
    std::fs::write(store.path(), backdated.expect("saved_at not found")).unwrap();

    assert!(store.load_fresh(Duration::from_secs(24 * 3600)).is_none());
    // A plain load still works — expiry is opt-in per slice.
    assert!(store.load().is_some());
}
