//! Randomized traversal order.
//!
//! Every entry gets a [`ShuffleKey`] drawn from a [`WeightSource`] and the
//! index keeps entries in a `BTreeMap` ordered by that key. Walking the map
//! visits every entry exactly once in random order, and entries can come and
//! go at any time without disturbing the relative order of the rest.

use crate::entry::EntryId;
use rand::rngs::SmallRng;
use rand::{RngExt, SeedableRng};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

/// Position of an entry in shuffle order. `seq` breaks weight ties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShuffleKey {
    pub weight: u64,
    pub seq: u64,
}

pub trait WeightSource {
    fn next_weight(&mut self) -> u64;
}

pub struct RandomWeights {
    rng: SmallRng,
}

impl RandomWeights {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomWeights {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightSource for RandomWeights {
    fn next_weight(&mut self) -> u64 {
        self.rng.random_range(0..=u64::MAX)
    }
}

/// Replays a fixed list of weights, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct SequenceWeights {
    weights: Vec<u64>,
    pos: usize,
}

impl SequenceWeights {
    pub fn new(weights: Vec<u64>) -> Self {
        Self { weights, pos: 0 }
    }
}

impl WeightSource for SequenceWeights {
    fn next_weight(&mut self) -> u64 {
        if self.weights.is_empty() {
            return 0;
        }
        let weight = self.weights[self.pos % self.weights.len()];
        self.pos = (self.pos + 1) % self.weights.len();
        weight
    }
}

pub struct ShuffleIndex {
    tree: BTreeMap<ShuffleKey, EntryId>,
    weights: Box<dyn WeightSource>,
    counter: u64,
}

impl fmt::Debug for ShuffleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShuffleIndex")
            .field("len", &self.tree.len())
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl Default for ShuffleIndex {
    fn default() -> Self {
        Self::new(RandomWeights::new())
    }
}

impl ShuffleIndex {
    pub fn new(weights: impl WeightSource + 'static) -> Self {
        Self {
            tree: BTreeMap::new(),
            weights: Box::new(weights),
            counter: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn fresh_key(&mut self) -> ShuffleKey {
        let key = ShuffleKey {
            weight: self.weights.next_weight(),
            seq: self.counter,
        };
        self.counter += 1;
        key
    }

    /// Places `id` at a random position and returns the key it was stored under.
    pub fn insert(&mut self, id: EntryId) -> ShuffleKey {
        let key = self.fresh_key();
        self.tree.insert(key, id);
        key
    }

    pub fn remove(&mut self, key: ShuffleKey) -> Option<EntryId> {
        let removed = self.tree.remove(&key);
        debug_assert!(removed.is_some(), "shuffle key {key:?} removed twice");
        removed
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Draws new keys for every held entry. `rekey` is told each entry's new
    /// key so the owner can update the entry's node.
    pub fn reshuffle(&mut self, mut rekey: impl FnMut(EntryId, ShuffleKey)) {
        let ids: Vec<EntryId> = std::mem::take(&mut self.tree).into_values().collect();
        for id in ids {
            let key = self.fresh_key();
            self.tree.insert(key, id);
            rekey(id, key);
        }
    }

    /// Nearest entry after `from` accepted by `filter`; the lowest-keyed
    /// accepted entry when `from` is `None`.
    pub fn next(
        &self,
        from: Option<ShuffleKey>,
        mut filter: impl FnMut(EntryId) -> bool,
    ) -> Option<EntryId> {
        let lower = match from {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        self.tree
            .range((lower, Bound::Unbounded))
            .map(|(_, id)| *id)
            .find(|id| filter(*id))
    }

    /// Nearest entry before `from` accepted by `filter`; the highest-keyed
    /// accepted entry when `from` is `None`.
    pub fn prev(
        &self,
        from: Option<ShuffleKey>,
        mut filter: impl FnMut(EntryId) -> bool,
    ) -> Option<EntryId> {
        let upper = match from {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        self.tree
            .range((Bound::Unbounded, upper))
            .rev()
            .map(|(_, id)| *id)
            .find(|id| filter(*id))
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = EntryId> + '_ {
        self.tree.values().copied()
    }
}
