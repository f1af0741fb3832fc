//! Insertion-ordered traversal over collection entries.
//!
//! The list is intrusive: each entry carries its own [`SeqLink`] and the
//! index only remembers both ends. Link storage is reached through
//! [`SeqLinks`] so the index never owns entries.

use crate::entry::EntryId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeqLink {
    pub prev: Option<EntryId>,
    pub next: Option<EntryId>,
}

pub trait SeqLinks {
    fn link(&self, id: EntryId) -> SeqLink;
    fn set_link(&mut self, id: EntryId, link: SeqLink);
}

#[derive(Debug, Default)]
pub struct SequentialIndex {
    head: Option<EntryId>,
    tail: Option<EntryId>,
    len: usize,
}

impl SequentialIndex {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn first(&self) -> Option<EntryId> {
        self.head
    }

    pub fn last(&self) -> Option<EntryId> {
        self.tail
    }

    pub fn push_back(&mut self, links: &mut impl SeqLinks, id: EntryId) {
        links.set_link(
            id,
            SeqLink {
                prev: self.tail,
                next: None,
            },
        );
        match self.tail {
            Some(tail) => {
                let mut link = links.link(tail);
                link.next = Some(id);
                links.set_link(tail, link);
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
    }

    /// Links `id` directly after `anchor`. `id` must not currently be linked.
    pub fn insert_after(&mut self, links: &mut impl SeqLinks, anchor: EntryId, id: EntryId) {
        let anchor_link = links.link(anchor);
        links.set_link(
            id,
            SeqLink {
                prev: Some(anchor),
                next: anchor_link.next,
            },
        );
        links.set_link(
            anchor,
            SeqLink {
                next: Some(id),
                ..anchor_link
            },
        );
        match anchor_link.next {
            Some(next) => {
                let mut link = links.link(next);
                link.prev = Some(id);
                links.set_link(next, link);
            }
            None => self.tail = Some(id),
        }
        self.len += 1;
    }

    /// Links `id` directly before `anchor`. `id` must not currently be linked.
    pub fn insert_before(&mut self, links: &mut impl SeqLinks, anchor: EntryId, id: EntryId) {
        let anchor_link = links.link(anchor);
        match anchor_link.prev {
            Some(prev) => self.insert_after(links, prev, id),
            None => {
                links.set_link(
                    id,
                    SeqLink {
                        prev: None,
                        next: Some(anchor),
                    },
                );
                links.set_link(
                    anchor,
                    SeqLink {
                        prev: Some(id),
                        ..anchor_link
                    },
                );
                self.head = Some(id);
                self.len += 1;
            }
        }
    }

    pub fn unlink(&mut self, links: &mut impl SeqLinks, id: EntryId) {
        let link = links.link(id);
        match link.prev {
            Some(prev) => {
                let mut prev_link = links.link(prev);
                prev_link.next = link.next;
                links.set_link(prev, prev_link);
            }
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => {
                let mut next_link = links.link(next);
                next_link.prev = link.prev;
                links.set_link(next, next_link);
            }
            None => self.tail = link.prev,
        }
        links.set_link(id, SeqLink::default());
        self.len -= 1;
    }

    /// Replaces the whole order with `order`, which must hold every linked id
    /// exactly once.
    pub fn relink(&mut self, links: &mut impl SeqLinks, order: &[EntryId]) {
        debug_assert_eq!(order.len(), self.len);
        for (pos, id) in order.iter().enumerate() {
            let prev = pos.checked_sub(1).map(|p| order[p]);
            let next = order.get(pos + 1).copied();
            links.set_link(*id, SeqLink { prev, next });
        }
        self.head = order.first().copied();
        self.tail = order.last().copied();
    }

    pub fn clear(&mut self) {
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Nearest entry after `from` accepted by `filter`, or the first accepted
    /// entry when `from` is `None`.
    pub fn next(
        &self,
        links: &impl SeqLinks,
        from: Option<EntryId>,
        mut filter: impl FnMut(EntryId) -> bool,
    ) -> Option<EntryId> {
        let mut cursor = match from {
            Some(id) => links.link(id).next,
            None => self.head,
        };
        while let Some(id) = cursor {
            if filter(id) {
                return Some(id);
            }
            cursor = links.link(id).next;
        }
        None
    }

    /// Nearest entry before `from` accepted by `filter`, or the last accepted
    /// entry when `from` is `None`.
    pub fn prev(
        &self,
        links: &impl SeqLinks,
        from: Option<EntryId>,
        mut filter: impl FnMut(EntryId) -> bool,
    ) -> Option<EntryId> {
        let mut cursor = match from {
            Some(id) => links.link(id).prev,
            None => self.tail,
        };
        while let Some(id) = cursor {
            if filter(id) {
                return Some(id);
            }
            cursor = links.link(id).prev;
        }
        None
    }

    pub fn iter<'a, L: SeqLinks>(&self, links: &'a L) -> SeqIter<'a, L> {
        SeqIter {
            links,
            cursor: self.head,
        }
    }
}

pub struct SeqIter<'a, L> {
    links: &'a L,
    cursor: Option<EntryId>,
}

impl<L: SeqLinks> Iterator for SeqIter<'_, L> {
    type Item = EntryId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        self.cursor = self.links.link(id).next;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryArena, TrackEntry};
    use std::sync::Arc;

    fn filled(count: usize) -> (EntryArena<usize>, SequentialIndex, Vec<EntryId>) {
        let mut arena = EntryArena::default();
        let mut index = SequentialIndex::default();
        let ids: Vec<EntryId> = (0..count)
            .map(|n| {
                let id = arena.insert(TrackEntry::new(Arc::new(n)));
                index.push_back(&mut arena, id);
                id
            })
            .collect();
        (arena, index, ids)
    }

    #[test]
    fn iterates_in_insertion_order() {
        let (arena, index, ids) = filled(4);
        assert_eq!(index.iter(&arena).collect::<Vec<_>>(), ids);
        assert_eq!(index.first(), Some(ids[0]));
        assert_eq!(index.last(), Some(ids[3]));
    }

    #[test]
    fn unlink_head_middle_and_tail() {
        let (mut arena, mut index, ids) = filled(5);
        index.unlink(&mut arena, ids[0]);
        index.unlink(&mut arena, ids[2]);
        index.unlink(&mut arena, ids[4]);

        assert_eq!(index.iter(&arena).collect::<Vec<_>>(), vec![ids[1], ids[3]]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.prev(&arena, Some(ids[3]), |_| true), Some(ids[1]));
        assert_eq!(index.prev(&arena, Some(ids[1]), |_| true), None);
    }

    #[test]
    fn next_and_prev_skip_rejected_entries() {
        let (arena, index, ids) = filled(5);
        let even = |id: EntryId| **arena[id].descriptor() % 2 == 0;

        assert_eq!(index.next(&arena, None, even), Some(ids[0]));
        assert_eq!(index.next(&arena, Some(ids[0]), even), Some(ids[2]));
        assert_eq!(index.next(&arena, Some(ids[4]), even), None);
        assert_eq!(index.prev(&arena, None, even), Some(ids[4]));
        assert_eq!(index.prev(&arena, Some(ids[2]), even), Some(ids[0]));
    }

    #[test]
    fn filter_sees_each_candidate_once() {
        let (arena, index, ids) = filled(6);
        let mut seen = Vec::new();
        let found = index.next(&arena, Some(ids[1]), |id| {
            seen.push(id);
            false
        });

        assert_eq!(found, None);
        assert_eq!(seen, ids[2..].to_vec());
    }

    #[test]
    fn insert_before_and_after_keep_ends_consistent() {
        let (mut arena, mut index, ids) = filled(3);
        index.unlink(&mut arena, ids[0]);
        index.insert_after(&mut arena, ids[2], ids[0]);
        assert_eq!(index.last(), Some(ids[0]));

        index.unlink(&mut arena, ids[2]);
        index.insert_before(&mut arena, ids[1], ids[2]);
        assert_eq!(index.first(), Some(ids[2]));
        assert_eq!(
            index.iter(&arena).collect::<Vec<_>>(),
            vec![ids[2], ids[1], ids[0]]
        );
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn relink_replaces_order() {
        let (mut arena, mut index, ids) = filled(4);
        let reversed: Vec<EntryId> = ids.iter().rev().copied().collect();
        index.relink(&mut arena, &reversed);

        assert_eq!(index.iter(&arena).collect::<Vec<_>>(), reversed);
        assert_eq!(index.prev(&arena, None, |_| true), Some(ids[0]));
    }
}
