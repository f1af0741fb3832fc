use crate::collection::Collection;
use crate::config;
use crate::entry::EntryId;
use crate::library;
use crate::loader::{LoadSource, Loader};
use crate::model::{PersistedState, PlaybackMode, SortKey, Track, compare_by_keys};
use crate::shuffle::{RandomWeights, WeightSource};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const LOADER_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// The playlist: a track collection plus the selection cursor, options and
/// background loading around it.
#[derive(Debug)]
pub struct PlaylistCore {
    // Dropped first: pending loads are cancelled before the entries go.
    loader: Loader,
    collection: Collection<Track>,
    selected: Option<EntryId>,
    playlist_path: Option<PathBuf>,
    sort_keys: Vec<SortKey>,
    rng: SmallRng,
    pub follow: bool,
    pub dirty: bool,
    pub status: String,
}

impl PlaylistCore {
    pub fn from_persisted(state: PersistedState) -> Self {
        Self::with_weights(state, RandomWeights::new(), SmallRng::from_rng(&mut rand::rng()))
    }

    /// Like [`from_persisted`](Self::from_persisted) with fixed randomness.
    pub fn seeded(state: PersistedState, seed: u64) -> Self {
        Self::with_weights(
            state,
            RandomWeights::seeded(seed),
            SmallRng::seed_from_u64(seed.wrapping_add(1)),
        )
    }

    fn with_weights(state: PersistedState, weights: impl WeightSource + 'static, rng: SmallRng) -> Self {
        let mut collection = Collection::with_weights(weights);
        collection.set_mode(state.playback_mode);
        Self {
            collection,
            loader: Loader::new(),
            selected: None,
            playlist_path: state.playlist_path,
            sort_keys: state.sort_keys,
            rng,
            follow: state.follow,
            dirty: true,
            status: String::from("Ready"),
        }
    }

    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            playback_mode: self.collection.mode(),
            follow: self.follow,
            sort_keys: self.sort_keys.clone(),
            playlist_path: self.playlist_path.clone(),
        }
    }

    pub fn collection(&self) -> &Collection<Track> {
        &self.collection
    }

    pub fn playlist_path(&self) -> Option<&Path> {
        self.playlist_path.as_deref()
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort_keys
    }

    pub fn mode(&self) -> PlaybackMode {
        self.collection.mode()
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.collection.set_mode(mode);
        self.set_status(&format!("Playback mode: {}", mode.label()));
    }

    pub fn cycle_mode(&mut self) {
        self.set_mode(self.collection.mode().next());
    }

    /// Adds one track. This is the only way tracks enter the playlist. With
    /// sort keys set the track goes to its sorted position, otherwise it is
    /// appended.
    pub fn add_track(&mut self, track: Track) -> EntryId {
        let track = Arc::new(track);
        let id = if self.sort_keys.is_empty() {
            self.collection.add(track)
        } else {
            let keys = &self.sort_keys;
            self.collection
                .add_sorted(track, |a, b| compare_by_keys(keys, a, b))
        };
        if self.selected().is_none() {
            self.selected = Some(id);
        }
        self.dirty = true;
        id
    }

    /// Starts loading tracks from the autosaved playlist, if there is one.
    pub fn load_autosave(&mut self) -> anyhow::Result<()> {
        let path = config::autosave_playlist_path()?;
        if path.exists() {
            self.loader.spawn(LoadSource::PlaylistFile(path));
        }
        Ok(())
    }

    /// Replaces the playlist with the contents of `path` and remembers it for
    /// [`update`](Self::update).
    pub fn load_extern(&mut self, path: &Path) {
        self.clear();
        self.loader.spawn(LoadSource::PlaylistFile(path.to_path_buf()));
        self.playlist_path = Some(path.to_path_buf());
        self.set_status(&format!("Loading {}", path.display()));
    }

    /// Adds every audio file below `dir` without clearing first.
    pub fn load_folder(&mut self, dir: &Path) {
        self.loader.spawn(LoadSource::Folder(dir.to_path_buf()));
        self.set_status(&format!("Scanning {}", dir.display()));
    }

    /// Reloads the remembered playlist file from disk.
    pub fn update(&mut self) {
        let Some(path) = self.playlist_path.clone() else {
            self.set_status("No playlist file to reload");
            return;
        };
        self.clear();
        self.loader.spawn(LoadSource::PlaylistFile(path));
        self.set_status("Reloading playlist");
    }

    /// Cancels pending loads, then drops every track.
    pub fn clear(&mut self) {
        self.loader.cancel_all();
        self.collection.clear();
        self.selected = None;
        self.set_status("Playlist cleared");
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_busy()
    }

    /// Moves tracks received by background loads into the collection.
    pub fn pump_loader(&mut self) -> usize {
        let mut received = Vec::new();
        let summary = self.loader.drain(|track| received.push(track));
        for track in received {
            self.add_track(track);
        }

        if let Some(error) = summary.errors.last() {
            self.set_status(&format!("Load failed: {error}"));
        } else if summary.finished > 0 && !self.loader.is_busy() {
            let count = self.collection.len();
            self.set_status(&format!("Loaded {count} tracks"));
        }
        summary.added
    }

    /// Pumps until every load job is done or `timeout` passes. Returns
    /// whether the loader went idle.
    pub fn wait_for_loader(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump_loader();
            if !self.loader.is_busy() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(LOADER_POLL_INTERVAL);
        }
    }

    pub fn goto_next(&mut self) -> Option<Arc<Track>> {
        let track = self.collection.goto_next();
        self.after_navigation(track)
    }

    pub fn goto_prev(&mut self) -> Option<Arc<Track>> {
        let track = self.collection.goto_prev();
        self.after_navigation(track)
    }

    pub fn activate_selected(&mut self) -> Option<Arc<Track>> {
        let Some(selected) = self.selected.filter(|id| self.collection.contains(*id)) else {
            self.set_status("Nothing selected");
            return None;
        };
        let track = self.collection.activate(selected);
        self.after_navigation(track)
    }

    fn after_navigation(&mut self, track: Option<Arc<Track>>) -> Option<Arc<Track>> {
        match &track {
            Some(track) => {
                if self.follow {
                    self.select_current();
                }
                self.set_status(&format!("Playing {}", track.title));
            }
            None if self.collection.is_empty() => self.set_status("Playlist is empty"),
            None => self.set_status("No more tracks"),
        }
        track
    }

    pub fn current(&self) -> Option<EntryId> {
        self.collection.current()
    }

    pub fn current_track(&self) -> Option<Arc<Track>> {
        self.collection.current_descriptor()
    }

    pub fn selected(&self) -> Option<EntryId> {
        self.selected.filter(|id| self.collection.contains(*id))
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.selected()
            .and_then(|id| self.collection.get(id))
            .map(|entry| entry.descriptor().as_ref())
    }

    pub fn select(&mut self, id: EntryId) -> bool {
        if !self.collection.contains(id) {
            return false;
        }
        self.selected = Some(id);
        self.dirty = true;
        true
    }

    /// Points the selection at the current track.
    pub fn select_current(&mut self) {
        if let Some(current) = self.collection.current() {
            self.selected = Some(current);
            self.dirty = true;
        }
    }

    pub fn select_next(&mut self) {
        let next = match self.selected() {
            Some(id) => self.collection.next_of(id).or(Some(id)),
            None => self.collection.first(),
        };
        self.selected = next;
        self.dirty = true;
    }

    pub fn select_prev(&mut self) {
        let prev = match self.selected() {
            Some(id) => self.collection.prev_of(id).or(Some(id)),
            None => self.collection.first(),
        };
        self.selected = prev;
        self.dirty = true;
    }

    /// Removes the selected track; the selection moves to its neighbour.
    pub fn remove_selected(&mut self) {
        let Some(selected) = self.selected() else {
            self.set_status("Nothing selected");
            return;
        };
        let neighbour = self
            .collection
            .next_of(selected)
            .or_else(|| self.collection.prev_of(selected));
        self.collection.remove(selected);
        self.selected = neighbour;
        self.set_status("Track removed");
    }

    pub fn toggle_selected_mark(&mut self) {
        if let Some(selected) = self.selected() {
            self.collection.toggle_mark(selected);
            self.select_next();
        }
    }

    pub fn mark_where(&mut self, pred: impl FnMut(&Track) -> bool) -> usize {
        let count = self.collection.mark_where(pred);
        self.set_status(&format!("Marked {count} tracks"));
        count
    }

    pub fn unmark(&mut self) {
        self.collection.unmark_all();
        self.dirty = true;
    }

    pub fn invert_marks(&mut self) {
        self.collection.invert_marks();
        self.dirty = true;
    }

    pub fn remove_marked(&mut self) -> usize {
        let removed = self.collection.remove_marked();
        if self.selected().is_none() {
            self.selected = self.collection.first();
        }
        self.set_status(&format!("Removed {removed} tracks"));
        removed
    }

    pub fn move_marked_after_selected(&mut self) -> usize {
        let Some(selected) = self.selected() else {
            return 0;
        };
        let moved = self.collection.move_marked_after(selected);
        self.dirty = true;
        moved
    }

    pub fn move_marked_before_selected(&mut self) -> usize {
        let Some(selected) = self.selected() else {
            return 0;
        };
        let moved = self.collection.move_marked_before(selected);
        self.dirty = true;
        moved
    }

    /// Randomizes the sequential order.
    pub fn randomize(&mut self) {
        self.collection.randomize_sequential(&mut self.rng);
        self.set_status("Playlist order randomized");
    }

    pub fn reshuffle(&mut self) {
        self.collection.reshuffle();
        self.set_status("Shuffle order renewed");
    }

    pub fn set_sort_keys(&mut self, keys: Vec<SortKey>) {
        self.sort_keys = keys;
        self.apply_sort();
        self.set_status("Playlist sorted");
    }

    fn apply_sort(&mut self) {
        if self.sort_keys.is_empty() {
            return;
        }
        let keys = &self.sort_keys;
        self.collection.sort_by(|a, b| compare_by_keys(keys, a, b));
    }

    pub fn total_duration_seconds(&self) -> u64 {
        self.collection
            .iter()
            .filter_map(|(_, entry)| entry.descriptor().duration_seconds)
            .map(u64::from)
            .sum()
    }

    pub fn track_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(self.collection.len());
        let _ = self.collection.for_each(|track| {
            paths.push(track.path.clone());
            ControlFlow::<()>::Continue(())
        });
        paths
    }

    /// Writes every track path in sequential order, whatever the mode.
    pub fn save_playlist(&mut self, path: &Path) -> anyhow::Result<()> {
        let paths = self.track_paths();
        library::write_playlist(path, paths.iter().map(PathBuf::as_path))?;
        self.set_status(&format!("Saved {} tracks", paths.len()));
        Ok(())
    }

    /// Stops loading, then writes the autosave playlist and the state file.
    pub fn exit(&mut self) -> anyhow::Result<()> {
        self.loader.cancel_all();
        let path = config::autosave_playlist_path()?;
        self.save_playlist(&path)?;
        config::save_state(&self.persisted_state())?;
        log::info!("saved {} tracks to {}", self.collection.len(), path.display());
        Ok(())
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}
