#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use tunelist::collection::Collection;
use tunelist::entry::EntryId;
use tunelist::shuffle::SequenceWeights;

fuzz_target!(|data: &[u8]| {
    let weights = data.iter().map(|byte| u64::from(*byte % 8)).collect();
    let mut collection = Collection::with_weights(SequenceWeights::new(weights));
    let mut ids: Vec<EntryId> = Vec::new();

    for (step, byte) in data.iter().enumerate() {
        match byte % 9 {
            0 => ids.push(collection.add(Arc::new(step))),
            1 => ids.push(collection.add_sorted(Arc::new(step % 5), |a, b| a.cmp(b))),
            2 => {
                if !ids.is_empty() {
                    let id = ids.remove(usize::from(*byte) % ids.len());
                    assert!(collection.remove(id));
                    assert_ne!(collection.current(), Some(id));
                }
            }
            3 => {
                let _ = collection.goto_next();
            }
            4 => {
                let _ = collection.goto_prev();
            }
            5 => {
                let mode = collection.mode().next();
                collection.set_mode(mode);
            }
            6 => collection.reshuffle(),
            7 => {
                if let Some(id) = ids.get(usize::from(*byte) % ids.len().max(1)) {
                    collection.toggle_mark(*id);
                    collection.move_marked_after(*id);
                }
            }
            _ => {
                if collection.len() > 8 {
                    collection.clear();
                    ids.clear();
                }
            }
        }

        assert_eq!(collection.len(), ids.len());
        assert_eq!(collection.iter().count(), ids.len());
        assert_eq!(collection.shuffle_iter().count(), ids.len());
    }
});
