use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlaybackMode {
    #[default]
    Sequential,
    Shuffle,
}

impl PlaybackMode {
    pub fn next(self) -> Self {
        match self {
            Self::Sequential => Self::Shuffle,
            Self::Shuffle => Self::Sequential,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Shuffle => "shuffle",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

impl Track {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            title,
            artist: None,
            album: None,
            duration_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    Path,
    Title,
    Artist,
    Album,
    Duration,
}

impl SortKey {
    pub fn compare(self, a: &Track, b: &Track) -> Ordering {
        match self {
            Self::Path => a.path.cmp(&b.path),
            Self::Title => a
                .title
                .to_ascii_lowercase()
                .cmp(&b.title.to_ascii_lowercase()),
            Self::Artist => cmp_optional_text(a.artist.as_deref(), b.artist.as_deref()),
            Self::Album => cmp_optional_text(a.album.as_deref(), b.album.as_deref()),
            Self::Duration => a.duration_seconds.cmp(&b.duration_seconds),
        }
    }
}

/// Compares by each key in turn until one of them decides.
pub fn compare_by_keys(keys: &[SortKey], a: &Track, b: &Track) -> Ordering {
    keys.iter()
        .map(|key| key.compare(a, b))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn cmp_optional_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub playback_mode: PlaybackMode,
    #[serde(default)]
    pub follow: bool,
    #[serde(default)]
    pub sort_keys: Vec<SortKey>,
    #[serde(default)]
    pub playlist_path: Option<PathBuf>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            playback_mode: PlaybackMode::Sequential,
            follow: false,
            sort_keys: Vec::new(),
            playlist_path: None,
        }
    }
}
