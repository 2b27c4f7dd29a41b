//! Keyed Lists
//!
//! Rendering a list by key takes two parts:
//!
//! - `differ`: turns two keyed snapshots of an array into an ordered
//!   add/remove/move script ([`ArrayMutation`]).
//! - `reconciler`: [`for_each`], which replays each script against a
//!   [`Renderer`](crate::render::Renderer) so that each item's rendered nodes
//!   survive reordering.

mod differ;
mod mutation;
mod reconciler;

pub use differ::{diff, index_keys, ArrayDiffer, KeyedDiff};
pub use mutation::{replay, transform_index, ArrayMutation};
pub use reconciler::{for_each, ForHandle};
