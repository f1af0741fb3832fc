use crate::sequential::{SeqLink, SeqLinks};
use crate::shuffle::ShuffleKey;
use std::ops::Index;
use std::sync::Arc;

/// Handle to an entry of a [`Collection`](crate::collection::Collection).
///
/// Handles are generational: once the entry is removed the handle stops
/// resolving, even if its slot is reused by a later insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId {
    slot: usize,
    generation: u32,
}

/// One track's membership record.
///
/// Holds the collection's own reference to the descriptor plus the nodes of
/// both ordering structures. Dropping the entry releases the reference.
#[derive(Debug)]
pub struct TrackEntry<D> {
    descriptor: Arc<D>,
    pub(crate) seq: SeqLink,
    pub(crate) shuffle: ShuffleKey,
    marked: bool,
}

impl<D> TrackEntry<D> {
    pub(crate) fn new(descriptor: Arc<D>) -> Self {
        Self {
            descriptor,
            seq: SeqLink::default(),
            shuffle: ShuffleKey::default(),
            marked: false,
        }
    }

    pub fn descriptor(&self) -> &Arc<D> {
        &self.descriptor
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub(crate) fn set_marked(&mut self, marked: bool) {
        self.marked = marked;
    }

    pub fn shuffle_key(&self) -> ShuffleKey {
        self.shuffle
    }
}

#[derive(Debug)]
struct Slot<D> {
    generation: u32,
    entry: Option<TrackEntry<D>>,
}

#[derive(Debug)]
pub(crate) struct EntryArena<D> {
    slots: Vec<Slot<D>>,
    free: Vec<usize>,
    len: usize,
}

impl<D> Default for EntryArena<D> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<D> EntryArena<D> {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, entry: TrackEntry<D>) -> EntryId {
        self.len += 1;
        if let Some(slot) = self.free.pop() {
            let cell = &mut self.slots[slot];
            cell.entry = Some(entry);
            return EntryId {
                slot,
                generation: cell.generation,
            };
        }

        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        EntryId {
            slot: self.slots.len() - 1,
            generation: 0,
        }
    }

    pub(crate) fn remove(&mut self, id: EntryId) -> Option<TrackEntry<D>> {
        let cell = self.slots.get_mut(id.slot)?;
        if cell.generation != id.generation {
            return None;
        }
        let entry = cell.entry.take()?;
        cell.generation = cell.generation.wrapping_add(1);
        self.free.push(id.slot);
        self.len -= 1;
        Some(entry)
    }

    pub(crate) fn get(&self, id: EntryId) -> Option<&TrackEntry<D>> {
        self.slots
            .get(id.slot)
            .filter(|cell| cell.generation == id.generation)
            .and_then(|cell| cell.entry.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: EntryId) -> Option<&mut TrackEntry<D>> {
        self.slots
            .get_mut(id.slot)
            .filter(|cell| cell.generation == id.generation)
            .and_then(|cell| cell.entry.as_mut())
    }

    pub(crate) fn contains(&self, id: EntryId) -> bool {
        self.get(id).is_some()
    }

    /// Drops every entry, invalidating all handles handed out so far.
    pub(crate) fn clear(&mut self) -> usize {
        let mut dropped = 0;
        for (slot, cell) in self.slots.iter_mut().enumerate() {
            if cell.entry.take().is_some() {
                cell.generation = cell.generation.wrapping_add(1);
                self.free.push(slot);
                dropped += 1;
            }
        }
        self.len = 0;
        dropped
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackEntry<D>> + '_ {
        self.slots.iter_mut().filter_map(|cell| cell.entry.as_mut())
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.slots.iter().enumerate().filter_map(|(slot, cell)| {
            cell.entry.as_ref().map(|_| EntryId {
                slot,
                generation: cell.generation,
            })
        })
    }
}

impl<D> Index<EntryId> for EntryArena<D> {
    type Output = TrackEntry<D>;

    fn index(&self, id: EntryId) -> &Self::Output {
        match self.get(id) {
            Some(entry) => entry,
            None => panic!("entry {id:?} is not a member of the arena"),
        }
    }
}

impl<D> SeqLinks for EntryArena<D> {
    fn link(&self, id: EntryId) -> SeqLink {
        self[id].seq
    }

    fn set_link(&mut self, id: EntryId, link: SeqLink) {
        if let Some(entry) = self.get_mut(id) {
            entry.seq = link;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_handle_does_not_resolve_after_slot_reuse() {
        let mut arena = EntryArena::default();
        let first = arena.insert(TrackEntry::new(Arc::new("a")));
        assert!(arena.remove(first).is_some());

        let second = arena.insert(TrackEntry::new(Arc::new("b")));
        assert_eq!(second.slot, first.slot);
        assert!(arena.get(first).is_none());
        assert_eq!(**arena[second].descriptor(), "b");
        assert!(arena.remove(first).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn dropping_entry_releases_descriptor() {
        let descriptor = Arc::new(String::from("song.mp3"));
        let mut arena = EntryArena::default();
        let id = arena.insert(TrackEntry::new(Arc::clone(&descriptor)));
        assert_eq!(Arc::strong_count(&descriptor), 2);

        drop(arena.remove(id));
        assert_eq!(Arc::strong_count(&descriptor), 1);
    }

    #[test]
    fn clear_invalidates_every_handle() {
        let mut arena = EntryArena::default();
        let ids: Vec<EntryId> = (0..4)
            .map(|n| arena.insert(TrackEntry::new(Arc::new(n))))
            .collect();

        assert_eq!(arena.clear(), 4);
        assert_eq!(arena.len(), 0);
        assert!(ids.iter().all(|id| !arena.contains(*id)));
        assert_eq!(arena.ids().count(), 0);
    }
}
