//! Array Mutations
//!
//! An [`ArrayMutation`] is one edit in a script that turns one keyed snapshot
//! of an array into the next. Indices in each op are relative to the list as
//! it stands after every earlier op of the same script has been applied, so a
//! script is replayed by applying its ops in order.

use serde::{Deserialize, Serialize};

/// One edit of a keyed list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ArrayMutation<K> {
    /// Insert `key` at `index`.
    Add { key: K, index: usize },
    /// Remove `key`, currently at `index`.
    Remove { key: K, index: usize },
    /// Move `key` from `from` to `to`.
    Move { key: K, from: usize, to: usize },
}

impl<K> ArrayMutation<K> {
    /// The key this op applies to.
    pub fn key(&self) -> &K {
        match self {
            Self::Add { key, .. } | Self::Remove { key, .. } | Self::Move { key, .. } => key,
        }
    }

    /// Map a position in the list before this op to its position after.
    ///
    /// Returns `None` for the position this op removes.
    pub fn transform_index(&self, index: usize) -> Option<usize> {
        match *self {
            Self::Remove { index: removed, .. } => match index.cmp(&removed) {
                std::cmp::Ordering::Less => Some(index),
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Greater => Some(index - 1),
            },
            Self::Add { index: added, .. } => {
                if index >= added {
                    Some(index + 1)
                } else {
                    Some(index)
                }
            }
            Self::Move { from, to, .. } => {
                if index == from {
                    Some(to)
                } else if from < to && from < index && index <= to {
                    Some(index - 1)
                } else if to < from && to <= index && index < from {
                    Some(index + 1)
                } else {
                    Some(index)
                }
            }
        }
    }

    /// Apply this op to a list of keys.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range for `keys`.
    pub fn apply(&self, keys: &mut Vec<K>)
    where
        K: Clone,
    {
        match self {
            Self::Add { key, index } => keys.insert(*index, key.clone()),
            Self::Remove { index, .. } => {
                keys.remove(*index);
            }
            Self::Move { from, to, .. } => {
                let key = keys.remove(*from);
                keys.insert(*to, key);
            }
        }
    }
}

/// Map `index` through every op of `mutations`, in order.
pub fn transform_index<K>(mutations: &[ArrayMutation<K>], index: usize) -> Option<usize> {
    mutations
        .iter()
        .try_fold(index, |index, mutation| mutation.transform_index(index))
}

/// Apply a mutation script to `keys`, returning the resulting list.
pub fn replay<K: Clone>(keys: &[K], mutations: &[ArrayMutation<K>]) -> Vec<K> {
    let mut keys = keys.to_vec();
    for mutation in mutations {
        mutation.apply(&mut keys);
    }
    keys
}
