use crate::model::PersistedState;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "tunelist";
const STATE_FILE: &str = "state.json";
const AUTOSAVE_PLAYLIST: &str = "playlist.pl";

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("TUNELIST_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn state_path() -> Result<PathBuf> {
    Ok(config_root()?.join(STATE_FILE))
}

pub fn autosave_playlist_path() -> Result<PathBuf> {
    Ok(config_root()?.join(AUTOSAVE_PLAYLIST))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

pub fn load_state() -> Result<PersistedState> {
    load_state_from(&state_path()?)
}

pub fn save_state(state: &PersistedState) -> Result<()> {
    ensure_config_dir()?;
    save_state_to(&state_path()?, state)
}

/// Reads a state file, falling back to defaults when it does not exist.
pub fn load_state_from(path: &Path) -> Result<PersistedState> {
    if !path.exists() {
        log::debug!("no state file at {}, using defaults", path.display());
        return Ok(PersistedState::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse state file {}", path.display()))
}

pub fn save_state_to(path: &Path, state: &PersistedState) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    log::debug!("wrote state to {}", path.display());
    Ok(())
}

pub fn strip_windows_verbatim_prefix(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();

    if let Some(trimmed) = raw.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{trimmed}"));
    }

    if let Some(trimmed) = raw.strip_prefix(r"\\?\") {
        return PathBuf::from(trimmed);
    }

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlaybackMode, SortKey};
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        unsafe {
            env::set_var("TUNELIST_CONFIG_DIR", dir.path().to_string_lossy().as_ref());
        }

        let state = PersistedState {
            playback_mode: PlaybackMode::Shuffle,
            follow: true,
            sort_keys: vec![SortKey::Artist, SortKey::Title],
            ..PersistedState::default()
        };
        save_state(&state).expect("save");
        let loaded = load_state().expect("load");
        assert_eq!(loaded.playback_mode, PlaybackMode::Shuffle);
        assert!(loaded.follow);
        assert_eq!(loaded.sort_keys, vec![SortKey::Artist, SortKey::Title]);
        assert_eq!(
            autosave_playlist_path().expect("autosave path"),
            dir.path().join("playlist.pl")
        );
    }

    #[test]
    fn missing_state_file_gives_defaults() {
        let dir = tempdir().expect("tempdir");
        let state = load_state_from(&dir.path().join("state.json")).expect("load");
        assert_eq!(state.playback_mode, PlaybackMode::Sequential);
        assert!(!state.follow);
        assert!(state.sort_keys.is_empty());
    }

    #[test]
    fn partial_state_file_fills_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"playback_mode":"Shuffle"}"#).expect("write");

        let state = load_state_from(&path).expect("load");
        assert_eq!(state.playback_mode, PlaybackMode::Shuffle);
        assert!(state.playlist_path.is_none());
    }

    #[test]
    fn malformed_state_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").expect("write");

        let err = load_state_from(&path).expect_err("should fail");
        assert!(err.to_string().contains("failed to parse state file"));
    }

    #[test]
    fn strips_windows_verbatim_prefix() {
        let cleaned = strip_windows_verbatim_prefix(Path::new(r"\\?\E:\LOCALMUSIC\a.mp3"));
        assert_eq!(cleaned, PathBuf::from(r"E:\LOCALMUSIC\a.mp3"));
    }

    #[test]
    fn strips_unc_verbatim_prefix() {
        let cleaned = strip_windows_verbatim_prefix(Path::new(r"\\?\UNC\server\share\a.mp3"));
        assert_eq!(cleaned, PathBuf::from(r"\\server\share\a.mp3"));
    }
}
