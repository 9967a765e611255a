use std::{collections::HashSet, sync::Arc};

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::name::{NormalizedName, normalize};

/// The set of blocked names.
///
/// Readers work on an immutable snapshot that is swapped atomically, so a lookup sees
/// either all of a batch or none of it and is never held up by a writer. Writers are
/// serialized. There is no removal: the set only ever grows.
#[derive(Debug)]
pub struct BlackholeStore {
    names: ArcSwap<HashSet<NormalizedName>>,
    writer: Mutex<()>,
}

impl Default for BlackholeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlackholeStore {
    pub fn new() -> Self {
        Self {
            names: ArcSwap::from_pointee(HashSet::new()),
            writer: Mutex::new(()),
        }
    }

    /// Merge a batch of names into the set and publish it in one step.
    ///
    /// Returns how many of the names were not blocked before.
    pub fn insert_all<I>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = NormalizedName>,
    {
        let _guard = self.writer.lock();

        let current = self.names.load_full();
        let fresh: Vec<NormalizedName> = names.into_iter().filter(|name| !current.contains(name)).collect();

        if fresh.is_empty() {
            return 0;
        }

        let mut next = HashSet::with_capacity(current.len() + fresh.len());
        next.extend(current.iter().cloned());

        let before = next.len();
        next.extend(fresh);
        let added = next.len() - before;

        self.names.store(Arc::new(next));
        added
    }

    /// Whether the canonical `name` is blocked.
    pub fn contains(&self, name: &NormalizedName) -> bool {
        self.names.load().contains(name.as_str())
    }

    /// Normalize `raw` and check whether it is blocked.
    pub fn contains_raw(&self, raw: &str) -> bool {
        self.contains(&normalize(raw))
    }

    pub fn len(&self) -> usize {
        self.names.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.load().is_empty()
    }

    /// The current set. Later inserts are not visible through it.
    pub fn snapshot(&self) -> Arc<HashSet<NormalizedName>> {
        self.names.load_full()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn batch(names: &[&str]) -> Vec<NormalizedName> {
        names.iter().map(|n| normalize(n)).collect()
    }

    #[test]
    fn test_empty() {
        let store = BlackholeStore::new();
        assert!(store.is_empty());
        assert!(!store.contains_raw("example.com"));
    }

    #[test]
    fn test_insert_and_lookup() {
        let store = BlackholeStore::new();
        let added = store.insert_all(batch(&["ads.example", "Tracker.Example."]));

        assert_eq!(added, 2);
        assert!(store.contains_raw("ads.example"));
        assert!(store.contains_raw("ADS.EXAMPLE."));
        assert!(store.contains(&normalize("tracker.example")));
        assert!(!store.contains_raw("example"));
    }

    #[test]
    fn test_duplicates_count_once() {
        let store = BlackholeStore::new();
        assert_eq!(store.insert_all(batch(&["a.example", "A.example.", "a.example"])), 1);
        assert_eq!(store.insert_all(batch(&["a.example", "b.example"])), 1);
        assert_eq!(store.insert_all(batch(&["b.example"])), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_union_never_shrinks() {
        let store = BlackholeStore::new();
        store.insert_all(batch(&["one.example", "two.example", "three.example"]));
        store.insert_all(batch(&["one.example"]));
        store.insert_all(Vec::new());

        assert_eq!(store.len(), 3);
        assert!(store.contains_raw("three.example"));
    }

    #[test]
    fn test_snapshot_is_stable() {
        let store = BlackholeStore::new();
        store.insert_all(batch(&["one.example"]));

        let snapshot = store.snapshot();
        store.insert_all(batch(&["two.example"]));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_batches_are_all_or_nothing() {
        const BATCHES: usize = 50;
        const BATCH_SIZE: usize = 200;

        let store = Arc::new(BlackholeStore::new());

        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                for b in 0..BATCHES {
                    let names = (0..BATCH_SIZE).map(|i| normalize(&format!("n{i}.b{b}.example")));
                    store.insert_all(names);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    let mut last = 0;
                    while last < BATCHES * BATCH_SIZE {
                        let snapshot = store.snapshot();
                        let len = snapshot.len();

                        assert!(len >= last, "set shrank from {last} to {len}");
                        assert_eq!(len % BATCH_SIZE, 0, "observed a partial batch");

                        // Whole batches only: the last name of every visible batch is present.
                        for b in 0..len / BATCH_SIZE {
                            let tail = format!("n{}.b{b}.example.", BATCH_SIZE - 1);
                            assert!(snapshot.contains(tail.as_str()));
                        }

                        last = len;
                        thread::yield_now();
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(store.len(), BATCHES * BATCH_SIZE);
    }
}
