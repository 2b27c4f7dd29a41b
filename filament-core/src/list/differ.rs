//! Array Differ
//!
//! Computes the add/remove/move script between two keyed snapshots of an
//! array.
//!
//! # Algorithm
//!
//! 1. Index both snapshots by key, rejecting duplicate keys.
//! 2. For every old key missing from the new snapshot, in old order, emit a
//!    `remove` at its old position as transformed by the ops emitted so far.
//! 3. For every key of the new snapshot, in new order, look up its old
//!    position transformed by the ops emitted so far. Absent: emit `add`.
//!    Different from the new position: emit `move`. Equal: nothing.
//!
//! Every lookup folds the emitted ops over the old position, which is
//! O(ops) per key. Lists rendered in a UI are small enough for this to be
//! cheaper than maintaining an order-statistics structure.

use std::fmt::Display;
use std::hash::Hash;

use indexmap::IndexMap;

use super::mutation::{transform_index, ArrayMutation};
use crate::error::{ReactiveError, Result};

/// The result of diffing a snapshot against the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedDiff<K: Hash + Eq> {
    /// Ops turning the previous snapshot into the new one, in replay order.
    pub mutations: Vec<ArrayMutation<K>>,
    /// Key to position in the new snapshot.
    pub index_map: IndexMap<K, usize>,
}

/// Index keys by position, rejecting duplicates.
pub fn index_keys<K>(keys: impl IntoIterator<Item = K>) -> Result<IndexMap<K, usize>>
where
    K: Eq + Hash + Display,
{
    let keys = keys.into_iter();
    let mut index_map = IndexMap::with_capacity(keys.size_hint().0);
    for (index, key) in keys.enumerate() {
        if index_map.contains_key(&key) {
            return Err(ReactiveError::duplicate_key(&key));
        }
        index_map.insert(key, index);
    }
    Ok(index_map)
}

/// A differ that retains the last snapshot it was given.
#[derive(Debug, Clone)]
pub struct ArrayDiffer<K: Hash + Eq> {
    index_map: IndexMap<K, usize>,
}

impl<K: Hash + Eq> Default for ArrayDiffer<K> {
    fn default() -> Self {
        Self {
            index_map: IndexMap::new(),
        }
    }
}

impl<K> ArrayDiffer<K>
where
    K: Eq + Hash + Clone + Display,
{
    /// Create a differ whose previous snapshot is empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of the retained snapshot, in order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.index_map.keys()
    }

    pub fn len(&self) -> usize {
        self.index_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_map.is_empty()
    }

    /// Forget the retained snapshot.
    pub fn reset(&mut self) {
        self.index_map.clear();
    }

    /// Diff `keys` against the retained snapshot and retain `keys`.
    ///
    /// On a duplicate key the retained snapshot is left unchanged.
    pub fn diff(&mut self, keys: impl IntoIterator<Item = K>) -> Result<KeyedDiff<K>> {
        let index_map = index_keys(keys)?;
        let mutations = diff_index_maps(&self.index_map, &index_map);
        self.index_map = index_map.clone();
        Ok(KeyedDiff {
            mutations,
            index_map,
        })
    }
}

fn diff_index_maps<K>(old: &IndexMap<K, usize>, new: &IndexMap<K, usize>) -> Vec<ArrayMutation<K>>
where
    K: Eq + Hash + Clone,
{
    let mut mutations = Vec::new();

    for (key, &old_index) in old {
        if new.contains_key(key) {
            continue;
        }
        if let Some(index) = transform_index(&mutations, old_index) {
            mutations.push(ArrayMutation::Remove {
                key: key.clone(),
                index,
            });
        }
    }

    for (key, &new_index) in new {
        let current = old
            .get(key)
            .and_then(|&old_index| transform_index(&mutations, old_index));
        match current {
            None => mutations.push(ArrayMutation::Add {
                key: key.clone(),
                index: new_index,
            }),
            Some(from) if from != new_index => mutations.push(ArrayMutation::Move {
                key: key.clone(),
                from,
                to: new_index,
            }),
            Some(_) => {}
        }
    }

    mutations
}

/// Diff two arrays keyed by `key`.
pub fn diff<T, K>(old: &[T], new: &[T], key: impl Fn(&T) -> K) -> Result<Vec<ArrayMutation<K>>>
where
    K: Eq + Hash + Clone + Display,
{
    let old = index_keys(old.iter().map(&key))?;
    let new = index_keys(new.iter().map(&key))?;
    Ok(diff_index_maps(&old, &new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::mutation::replay;

    #[derive(Debug, Clone, PartialEq)]
    struct Book {
        name: &'static str,
    }

    fn books(names: &[&'static str]) -> Vec<Book> {
        names.iter().map(|&name| Book { name }).collect()
    }

    #[test]
    fn mixed_edit_script() {
        let old = books(&["Book1", "Book2", "Book3", "Book4"]);
        let new = books(&["Book3", "Book6", "Book1", "Book5"]);

        let mutations = diff(&old, &new, |book| book.name).unwrap();

        assert_eq!(
            mutations,
            vec![
                ArrayMutation::Remove {
                    key: "Book2",
                    index: 1
                },
                ArrayMutation::Remove {
                    key: "Book4",
                    index: 2
                },
                ArrayMutation::Move {
                    key: "Book3",
                    from: 1,
                    to: 0
                },
                ArrayMutation::Add {
                    key: "Book6",
                    index: 1
                },
                ArrayMutation::Add {
                    key: "Book5",
                    index: 3
                },
            ]
        );
    }

    #[test]
    fn sort_is_moves_only() {
        let mut differ = ArrayDiffer::new();
        let unsorted = books(&["Book3", "Book6", "Book1", "Book5"]);
        differ.diff(unsorted.iter().map(|book| book.name)).unwrap();

        let mut sorted = unsorted.clone();
        sorted.sort_by_key(|book| book.name);
        let result = differ.diff(sorted.iter().map(|book| book.name)).unwrap();

        assert_eq!(
            result.mutations,
            vec![
                ArrayMutation::Move {
                    key: "Book1",
                    from: 2,
                    to: 0
                },
                ArrayMutation::Move {
                    key: "Book5",
                    from: 3,
                    to: 2
                },
            ]
        );
        assert_eq!(result.index_map.get("Book6"), Some(&3));
    }

    #[test]
    fn first_diff_adds_everything() {
        let mut differ = ArrayDiffer::new();
        let result = differ.diff(["a", "b"]).unwrap();

        assert_eq!(
            result.mutations,
            vec![
                ArrayMutation::Add { key: "a", index: 0 },
                ArrayMutation::Add { key: "b", index: 1 },
            ]
        );
        assert_eq!(differ.keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn identical_snapshot_is_empty_script() {
        let mut differ = ArrayDiffer::new();
        differ.diff([1, 2, 3]).unwrap();
        assert!(differ.diff([1, 2, 3]).unwrap().mutations.is_empty());
    }

    #[test]
    fn clearing_removes_from_the_front() {
        let mut differ = ArrayDiffer::new();
        differ.diff(['a', 'b', 'c']).unwrap();

        let result = differ.diff([]).unwrap();
        assert_eq!(
            result.mutations,
            vec![
                ArrayMutation::Remove { key: 'a', index: 0 },
                ArrayMutation::Remove { key: 'b', index: 0 },
                ArrayMutation::Remove { key: 'c', index: 0 },
            ]
        );
        assert!(differ.is_empty());
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut differ = ArrayDiffer::new();
        differ.diff(["a", "b"]).unwrap();

        let err = differ.diff(["c", "c"]).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate key 'c'");

        // The retained snapshot is untouched.
        assert_eq!(differ.keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn scripts_replay_to_the_new_order() {
        let cases: [(&[u32], &[u32]); 5] = [
            (&[1, 2, 3, 4, 5], &[5, 4, 3, 2, 1]),
            (&[1, 2, 3], &[4, 1, 5, 3]),
            (&[], &[7, 8]),
            (&[1, 2, 3, 4], &[2, 4]),
            (&[9, 1, 8, 2, 7, 3], &[3, 10, 7, 2, 11, 8, 1, 9]),
        ];

        for (old, new) in cases {
            let mutations = diff(old, new, |key| *key).unwrap();
            assert_eq!(replay(old, &mutations), new.to_vec(), "{old:?} -> {new:?}");
        }
    }
}
