use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tunelist::collection::Collection;
use tunelist::config;
use tunelist::core::PlaylistCore;
use tunelist::model::{PersistedState, PlaybackMode, Track};
use tunelist::shuffle::SequenceWeights;

#[test]
fn playlist_survives_exit_and_autoload() {
    let dir = tempdir().expect("tempdir");
    unsafe {
        std::env::set_var("TUNELIST_CONFIG_DIR", dir.path().to_string_lossy().as_ref());
    }

    let mut core = PlaylistCore::seeded(PersistedState::default(), 1);
    for name in ["c", "a", "b"] {
        core.add_track(Track::from_path(format!("/music/{name}.mp3")));
    }
    core.set_mode(PlaybackMode::Shuffle);
    core.follow = true;
    core.exit().expect("exit");

    let state = config::load_state().expect("load state");
    assert_eq!(state.playback_mode, PlaybackMode::Shuffle);
    assert!(state.follow);

    let mut restored = PlaylistCore::seeded(state, 2);
    restored.load_autosave().expect("autoload");
    assert!(restored.wait_for_loader(Duration::from_secs(10)));
    assert_eq!(
        restored.track_paths(),
        vec![
            PathBuf::from("/music/c.mp3"),
            PathBuf::from("/music/a.mp3"),
            PathBuf::from("/music/b.mp3"),
        ]
    );
    assert_eq!(restored.mode(), PlaybackMode::Shuffle);
}

#[test]
fn folder_load_then_walk_both_orders() {
    let dir = tempdir().expect("tempdir");
    for name in ["01 intro.mp3", "02 verse.flac", "03 outro.ogg", "readme.txt"] {
        fs::write(dir.path().join(name), b"x").expect("write");
    }

    let mut core = PlaylistCore::seeded(PersistedState::default(), 5);
    core.load_folder(dir.path());
    assert!(core.wait_for_loader(Duration::from_secs(10)));
    assert_eq!(core.collection().len(), 3);

    let mut sequential = Vec::new();
    while let Some(track) = core.goto_next() {
        sequential.push(track.title.clone());
    }
    assert_eq!(sequential, vec!["01 intro", "02 verse", "03 outro"]);

    core.clear();
    core.load_folder(dir.path());
    assert!(core.wait_for_loader(Duration::from_secs(10)));
    core.set_mode(PlaybackMode::Shuffle);

    let mut shuffled = Vec::new();
    while let Some(track) = core.goto_next() {
        shuffled.push(track.title.clone());
    }
    shuffled.sort();
    assert_eq!(shuffled, sequential);
}

#[test]
fn clear_cancels_pending_load() {
    let dir = tempdir().expect("tempdir");
    let list = dir.path().join("huge.pl");
    let body: String = (0..5_000).map(|n| format!("/music/{n}.mp3\n")).collect();
    fs::write(&list, body).expect("write");

    let mut core = PlaylistCore::seeded(PersistedState::default(), 8);
    core.load_extern(&list);
    core.clear();

    assert!(!core.is_loading());
    assert_eq!(core.pump_loader(), 0);
    assert!(core.collection().is_empty());
}

#[test]
fn removal_mid_playback_restarts_from_first() {
    let mut collection = Collection::with_weights(SequenceWeights::new(vec![3, 1, 2]));
    let a = Arc::new(Track::from_path("a.mp3"));
    let b = Arc::new(Track::from_path("b.mp3"));
    let c = Arc::new(Track::from_path("c.mp3"));
    collection.add(Arc::clone(&a));
    let b_id = collection.add(Arc::clone(&b));
    collection.add(Arc::clone(&c));

    let playing = collection.activate(b_id).expect("activate");
    assert_eq!(playing.title, "b");
    assert!(collection.remove(b_id));
    assert_eq!(collection.current(), None);

    // The caller's reference outlives the entry.
    assert_eq!(Arc::strong_count(&b), 2);
    drop(playing);
    assert_eq!(Arc::strong_count(&b), 1);

    assert_eq!(collection.goto_next().map(|t| t.title.clone()).as_deref(), Some("a"));

    collection.set_mode(PlaybackMode::Shuffle);
    let shuffled: Vec<String> = collection
        .shuffle_iter()
        .map(|(_, entry)| entry.descriptor().title.clone())
        .collect();
    assert_eq!(shuffled, vec!["c", "a"]);
}
