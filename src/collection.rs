//! The track collection: one set of entries, two traversal orders.
//!
//! Every entry is linked into the [`SequentialIndex`] and the
//! [`ShuffleIndex`] for exactly as long as it is a member. Navigation
//! consults one of them depending on [`PlaybackMode`], so the mode can be
//! flipped between calls without any reconciliation.

use crate::entry::{EntryArena, EntryId, TrackEntry};
use crate::model::PlaybackMode;
use crate::sequential::SequentialIndex;
use crate::shuffle::{RandomWeights, ShuffleIndex, WeightSource};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::ops::ControlFlow;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

#[derive(Debug)]
pub struct Collection<D> {
    entries: EntryArena<D>,
    sequential: SequentialIndex,
    shuffle: ShuffleIndex,
    current: Option<EntryId>,
    mode: PlaybackMode,
}

impl<D> Default for Collection<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Collection<D> {
    pub fn new() -> Self {
        Self::with_weights(RandomWeights::new())
    }

    /// Uses `weights` for every shuffle key drawn by this collection.
    pub fn with_weights(weights: impl WeightSource + 'static) -> Self {
        Self {
            entries: EntryArena::default(),
            sequential: SequentialIndex::default(),
            shuffle: ShuffleIndex::new(weights),
            current: None,
            mode: PlaybackMode::Sequential,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains(id)
    }

    pub fn get(&self, id: EntryId) -> Option<&TrackEntry<D>> {
        self.entries.get(id)
    }

    pub fn current(&self) -> Option<EntryId> {
        self.current
    }

    pub fn current_descriptor(&self) -> Option<Arc<D>> {
        self.current
            .and_then(|id| self.entries.get(id))
            .map(|entry| Arc::clone(entry.descriptor()))
    }

    /// Takes ownership of one reference to `descriptor` and appends it to the
    /// sequential order at a random shuffle position.
    pub fn add(&mut self, descriptor: Arc<D>) -> EntryId {
        let id = self.insert_entry(descriptor);
        self.sequential.push_back(&mut self.entries, id);
        id
    }

    /// Like [`add`](Self::add), but links the entry in front of the first
    /// sequential entry that sorts after it. Equal entries keep insertion
    /// order.
    pub fn add_sorted(
        &mut self,
        descriptor: Arc<D>,
        mut cmp: impl FnMut(&D, &D) -> Ordering,
    ) -> EntryId {
        let anchor = self.sequential.iter(&self.entries).find(|other| {
            cmp(descriptor.as_ref(), self.entries[*other].descriptor().as_ref()) == Ordering::Less
        });
        let id = self.insert_entry(descriptor);
        match anchor {
            Some(anchor) => self.sequential.insert_before(&mut self.entries, anchor, id),
            None => self.sequential.push_back(&mut self.entries, id),
        }
        id
    }

    fn insert_entry(&mut self, descriptor: Arc<D>) -> EntryId {
        let id = self.entries.insert(TrackEntry::new(descriptor));
        let key = self.shuffle.insert(id);
        if let Some(entry) = self.entries.get_mut(id) {
            entry.shuffle = key;
        }
        log::trace!("added entry {id:?} with shuffle key {key:?}");
        id
    }

    /// Removes `id` from both orders and releases its descriptor. Returns
    /// `false` for handles that are no longer members.
    pub fn remove(&mut self, id: EntryId) -> bool {
        let Some(key) = self.entries.get(id).map(TrackEntry::shuffle_key) else {
            log::warn!("ignoring removal of stale entry {id:?}");
            return false;
        };

        if self.current == Some(id) {
            self.current = None;
        }
        self.sequential.unlink(&mut self.entries, id);
        self.shuffle.remove(key);
        drop(self.entries.remove(id));
        log::trace!("removed entry {id:?}");
        true
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.sequential.clear();
        self.shuffle.clear();
        let dropped = self.entries.clear();
        log::debug!("cleared collection, released {dropped} tracks");
    }

    pub fn goto_next(&mut self) -> Option<Arc<D>> {
        self.goto_next_matching(|_| true)
    }

    pub fn goto_prev(&mut self) -> Option<Arc<D>> {
        self.goto_prev_matching(|_| true)
    }

    /// Moves `current` to the nearest following entry accepted by `filter`
    /// and hands the caller a new reference to its descriptor. Leaves
    /// `current` alone when nothing matches.
    pub fn goto_next_matching(
        &mut self,
        filter: impl FnMut(&TrackEntry<D>) -> bool,
    ) -> Option<Arc<D>> {
        let found = self.find(Direction::Forward, filter);
        self.set_current(found)
    }

    pub fn goto_prev_matching(
        &mut self,
        filter: impl FnMut(&TrackEntry<D>) -> bool,
    ) -> Option<Arc<D>> {
        let found = self.find(Direction::Backward, filter);
        self.set_current(found)
    }

    /// Makes `id` the current entry. Stale handles yield `None` and leave
    /// `current` untouched.
    pub fn activate(&mut self, id: EntryId) -> Option<Arc<D>> {
        if !self.entries.contains(id) {
            log::warn!("cannot activate stale entry {id:?}");
            return None;
        }
        self.set_current(Some(id))
    }

    fn find(
        &self,
        direction: Direction,
        mut filter: impl FnMut(&TrackEntry<D>) -> bool,
    ) -> Option<EntryId> {
        if self.is_empty() {
            return None;
        }

        let entries = &self.entries;
        let accept = |id: EntryId| filter(&entries[id]);
        match (self.mode, direction) {
            (PlaybackMode::Sequential, Direction::Forward) => {
                self.sequential.next(entries, self.current, accept)
            }
            (PlaybackMode::Sequential, Direction::Backward) => {
                self.sequential.prev(entries, self.current, accept)
            }
            (PlaybackMode::Shuffle, Direction::Forward) => {
                let from = self.current.map(|id| entries[id].shuffle_key());
                self.shuffle.next(from, accept)
            }
            (PlaybackMode::Shuffle, Direction::Backward) => {
                let from = self.current.map(|id| entries[id].shuffle_key());
                self.shuffle.prev(from, accept)
            }
        }
    }

    fn set_current(&mut self, found: Option<EntryId>) -> Option<Arc<D>> {
        let id = found?;
        let descriptor = Arc::clone(self.entries.get(id)?.descriptor());
        self.current = Some(id);
        Some(descriptor)
    }

    /// Draws a fresh shuffle order. Membership, sequential order and
    /// `current` are unaffected.
    pub fn reshuffle(&mut self) {
        let entries = &mut self.entries;
        self.shuffle.reshuffle(|id, key| {
            if let Some(entry) = entries.get_mut(id) {
                entry.shuffle = key;
            }
        });
        log::debug!("reshuffled {} tracks", self.shuffle.len());
    }

    /// Visits every descriptor in sequential order, whatever the mode.
    /// Stops at the first `Break` and returns it.
    pub fn for_each<B>(&self, mut visit: impl FnMut(&Arc<D>) -> ControlFlow<B>) -> ControlFlow<B> {
        for id in self.sequential.iter(&self.entries) {
            if let ControlFlow::Break(value) = visit(self.entries[id].descriptor()) {
                return ControlFlow::Break(value);
            }
        }
        ControlFlow::Continue(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &TrackEntry<D>)> + '_ {
        self.sequential
            .iter(&self.entries)
            .map(move |id| (id, &self.entries[id]))
    }

    pub fn shuffle_iter(&self) -> impl Iterator<Item = (EntryId, &TrackEntry<D>)> + '_ {
        self.shuffle.iter().map(move |id| (id, &self.entries[id]))
    }

    pub fn first(&self) -> Option<EntryId> {
        self.sequential.first()
    }

    pub fn last(&self) -> Option<EntryId> {
        self.sequential.last()
    }

    /// Sequential neighbour after `id`, ignoring the mode.
    pub fn next_of(&self, id: EntryId) -> Option<EntryId> {
        if !self.entries.contains(id) {
            return None;
        }
        self.sequential.next(&self.entries, Some(id), |_| true)
    }

    /// Sequential neighbour before `id`, ignoring the mode.
    pub fn prev_of(&self, id: EntryId) -> Option<EntryId> {
        if !self.entries.contains(id) {
            return None;
        }
        self.sequential.prev(&self.entries, Some(id), |_| true)
    }

    pub fn set_marked(&mut self, id: EntryId, marked: bool) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.set_marked(marked);
                true
            }
            None => false,
        }
    }

    /// Flips the mark of `id` and returns the new state.
    pub fn toggle_mark(&mut self, id: EntryId) -> Option<bool> {
        let entry = self.entries.get_mut(id)?;
        let marked = !entry.is_marked();
        entry.set_marked(marked);
        Some(marked)
    }

    /// Marks every entry whose descriptor satisfies `pred`. Existing marks
    /// are kept.
    pub fn mark_where(&mut self, mut pred: impl FnMut(&D) -> bool) -> usize {
        let mut count = 0;
        for entry in self.entries.iter_mut() {
            if pred(entry.descriptor().as_ref()) {
                entry.set_marked(true);
                count += 1;
            }
        }
        count
    }

    pub fn unmark_all(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.set_marked(false);
        }
    }

    pub fn invert_marks(&mut self) {
        for entry in self.entries.iter_mut() {
            let marked = entry.is_marked();
            entry.set_marked(!marked);
        }
    }

    /// Marked entries in sequential order.
    pub fn marked(&self) -> Vec<EntryId> {
        self.iter()
            .filter(|(_, entry)| entry.is_marked())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn remove_marked(&mut self) -> usize {
        let marked = self.marked();
        for id in &marked {
            self.remove(*id);
        }
        marked.len()
    }

    /// Moves the marked entries, in their current sequential order, to sit
    /// right after `anchor`. The anchor itself never moves.
    pub fn move_marked_after(&mut self, anchor: EntryId) -> usize {
        if !self.entries.contains(anchor) {
            log::warn!("cannot move tracks after stale entry {anchor:?}");
            return 0;
        }

        let moving = self.marked_except(anchor);
        let mut after = anchor;
        for id in &moving {
            self.sequential.unlink(&mut self.entries, *id);
            self.sequential.insert_after(&mut self.entries, after, *id);
            after = *id;
        }
        moving.len()
    }

    /// Moves the marked entries, in their current sequential order, to sit
    /// right before `anchor`.
    pub fn move_marked_before(&mut self, anchor: EntryId) -> usize {
        if !self.entries.contains(anchor) {
            log::warn!("cannot move tracks before stale entry {anchor:?}");
            return 0;
        }

        let moving = self.marked_except(anchor);
        for id in &moving {
            self.sequential.unlink(&mut self.entries, *id);
            self.sequential.insert_before(&mut self.entries, anchor, *id);
        }
        moving.len()
    }

    fn marked_except(&self, anchor: EntryId) -> Vec<EntryId> {
        self.iter()
            .filter(|(id, entry)| *id != anchor && entry.is_marked())
            .map(|(id, _)| id)
            .collect()
    }

    /// Stable sort of the sequential order. Shuffle order and `current` stay
    /// as they are.
    pub fn sort_by(&mut self, mut cmp: impl FnMut(&D, &D) -> Ordering) {
        let mut order: Vec<EntryId> = self.sequential.iter(&self.entries).collect();
        order.sort_by(|a, b| {
            cmp(
                self.entries[*a].descriptor().as_ref(),
                self.entries[*b].descriptor().as_ref(),
            )
        });
        self.sequential.relink(&mut self.entries, &order);
    }

    /// Random permutation of the sequential order.
    pub fn randomize_sequential(&mut self, rng: &mut SmallRng) {
        let mut order: Vec<EntryId> = self.sequential.iter(&self.entries).collect();
        order.shuffle(rng);
        self.sequential.relink(&mut self.entries, &order);
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        use std::collections::BTreeSet;

        let members: BTreeSet<EntryId> = self.entries.ids().collect();
        let sequential: Vec<EntryId> = self.sequential.iter(&self.entries).collect();
        let shuffled: Vec<EntryId> = self.shuffle.iter().collect();

        assert_eq!(sequential.len(), members.len());
        assert_eq!(shuffled.len(), members.len());
        assert_eq!(self.sequential.len(), members.len());
        assert_eq!(sequential.iter().copied().collect::<BTreeSet<_>>(), members);
        assert_eq!(shuffled.iter().copied().collect::<BTreeSet<_>>(), members);

        let keys: Vec<_> = shuffled
            .iter()
            .map(|id| self.entries[*id].shuffle_key())
            .collect();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));

        if let Some(current) = self.current {
            assert!(members.contains(&current));
        }
    }
}
