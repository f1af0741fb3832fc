use crate::model::Track;
use anyhow::{Context, Result};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::ItemKey;
use lofty::probe::Probe;
use lofty::tag::Tag;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];

#[derive(Default)]
struct TrackMetadata {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    duration_seconds: Option<u32>,
}

/// Audio files below `root`, sorted by path.
pub fn scan_folder(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_audio(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();
    paths
}

/// Builds a track for `path`, using embedded tags when they can be read.
pub fn track_for_path(path: &Path) -> Track {
    let cleaned = crate::config::strip_windows_verbatim_prefix(path);
    let metadata = metadata_for(&cleaned);
    let fallback = Track::from_path(cleaned);
    Track {
        title: metadata.title.unwrap_or(fallback.title),
        artist: metadata.artist,
        album: metadata.album,
        duration_seconds: metadata.duration_seconds,
        path: fallback.path,
    }
}

fn metadata_for(path: &Path) -> TrackMetadata {
    if !is_audio(path) || !path.is_file() {
        return TrackMetadata::default();
    }

    let Ok(tagged_file) = Probe::open(path).and_then(|probe| probe.read()) else {
        log::debug!("no readable tags in {}", path.display());
        return TrackMetadata::default();
    };

    let duration = tagged_file.properties().duration().as_secs();
    let duration_seconds = (duration > 0).then(|| u32::try_from(duration).unwrap_or(u32::MAX));

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        return TrackMetadata {
            duration_seconds,
            ..TrackMetadata::default()
        };
    };

    TrackMetadata {
        title: tag_text(tag, ItemKey::TrackTitle),
        artist: tag_text(tag, ItemKey::TrackArtist),
        album: tag_text(tag, ItemKey::AlbumTitle),
        duration_seconds,
    }
}

fn tag_text(tag: &Tag, key: ItemKey) -> Option<String> {
    tag.get_string(key).and_then(clean_metadata_value)
}

fn clean_metadata_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Reads a playlist file: one path per line, `#` lines and blank lines are
/// skipped, relative paths resolve against the playlist's directory.
pub fn read_playlist(path: &Path) -> Result<Vec<PathBuf>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read playlist {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let entry = Path::new(line);
            if entry.is_absolute() {
                entry.to_path_buf()
            } else {
                base.join(entry)
            }
        })
        .collect())
}

pub fn write_playlist<'a>(path: &Path, tracks: impl IntoIterator<Item = &'a Path>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut body = String::new();
    for track in tracks {
        body.push_str(&track.to_string_lossy());
        body.push('\n');
    }
    fs::write(path, body).with_context(|| format!("failed to write playlist {}", path.display()))
}

pub fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}
