//! Keyed List Reconciler
//!
//! [`for_each`] renders one subscope per list item and keeps the rendered
//! nodes in step with a reactive source array. On every change it diffs the
//! new keys against the previous ones and applies the script:
//!
//! - `remove`: dispose the item's subscope. Its cleanup removes its nodes.
//! - `add`: create a leaked subscope holding the item's `index` signal and a
//!   derived `item` signal, render it, and insert its nodes after the
//!   nearest preceding item (or the list's anchor).
//! - `move`: reinsert the item's existing nodes at the new position and
//!   update its `index` signal. Nothing is re-rendered.
//!
//! Node identity survives reordering: only added items create nodes and only
//! removed items destroy them.
//!
//! # Item Signals
//!
//! Each item's `item` signal is derived from the list's committed snapshot
//! and key-to-position map. Both are written at the end of a reconcile pass,
//! so an item never observes a half-applied script. A key missing from the
//! map keeps its last known value. Each item also re-syncs its `index` from
//! the same map.

use std::cell::RefCell;
use std::fmt::Display;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use super::differ::ArrayDiffer;
use super::mutation::ArrayMutation;
use crate::reactive::{
    create_subscope, effect, memo, on_cleanup, signal, untrack, ReadSignal, ScopeDisposer,
    Signal, SubscopeOptions,
};
use crate::render::{NodeKind, Renderer};

struct ItemEntry<N> {
    nodes: Vec<N>,
    index: Signal<usize>,
    disposer: ScopeDisposer,
}

struct ListState<N, K: Hash + Eq> {
    anchor: N,
    /// Keys in rendered order.
    order: Vec<K>,
    entries: IndexMap<K, ItemEntry<N>>,
    differ: ArrayDiffer<K>,
}

impl<N: Clone, K: Hash + Eq> ListState<N, K> {
    /// The node new content at `index` goes after: the last node of the
    /// nearest preceding item that rendered any, or the anchor.
    fn insertion_anchor(&self, index: usize) -> N {
        self.order[..index]
            .iter()
            .rev()
            .find_map(|key| self.entries.get(key).and_then(|entry| entry.nodes.last()))
            .unwrap_or(&self.anchor)
            .clone()
    }
}

fn place_nodes<R: Renderer>(renderer: &R, anchor: R::Node, nodes: &[R::Node]) {
    let mut after = anchor;
    for node in nodes {
        renderer.insert_node(&after, node);
        after = node.clone();
    }
}

/// A handle for inspecting a reconciled list.
pub struct ForHandle<N, K: Hash + Eq> {
    state: Rc<RefCell<ListState<N, K>>>,
}

impl<N: Clone, K: Hash + Eq + Clone> ForHandle<N, K> {
    /// Number of live items.
    pub fn len(&self) -> usize {
        self.state.borrow().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of the live items, in rendered order.
    pub fn keys(&self) -> Vec<K> {
        self.state.borrow().order.clone()
    }

    /// Rendered nodes of the live items, in order.
    pub fn nodes(&self) -> Vec<N> {
        let state = self.state.borrow();
        state
            .order
            .iter()
            .filter_map(|key| state.entries.get(key))
            .flat_map(|entry| entry.nodes.iter().cloned())
            .collect()
    }

    /// Nodes rendered for `key`.
    pub fn nodes_for(&self, key: &K) -> Option<Vec<N>> {
        self.state
            .borrow()
            .entries
            .get(key)
            .map(|entry| entry.nodes.clone())
    }

    /// The marker after which the list's nodes are placed.
    pub fn anchor(&self) -> N {
        self.state.borrow().anchor.clone()
    }
}

/// Render `items` as a keyed list under `parent`.
///
/// `render` receives the item's derived value and position signals and
/// returns the detached nodes for that item. The list lives as long as the
/// current scope; disposing the scope removes every node it rendered.
///
/// # Panics
///
/// A duplicate key is fatal: the reconcile pass panics with
/// `Duplicate key '<key>'`.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
/// use filament_core::list::for_each;
/// use filament_core::reactive::signal;
/// use filament_core::render::{MemoryRenderer, NodeKind, Renderer};
///
/// let renderer = Rc::new(MemoryRenderer::new());
/// let list = renderer.create_node(NodeKind::element("ul"));
/// let fruits = signal(vec!["apple", "pear"]);
///
/// let dom = renderer.clone();
/// let handle = for_each(
///     renderer.clone(),
///     &list,
///     move || fruits.get(),
///     |fruit| *fruit,
///     move |fruit, _index| vec![dom.create_node(NodeKind::text(fruit.peek()))],
/// );
///
/// fruits.set(vec!["pear", "apple", "fig"]);
/// assert_eq!(renderer.text_content(list), "pearapplefig");
/// assert_eq!(handle.len(), 3);
/// ```
pub fn for_each<R, T, K>(
    renderer: Rc<R>,
    parent: &R::Node,
    items: impl Fn() -> Vec<T> + 'static,
    key_fn: impl Fn(&T) -> K + 'static,
    render: impl Fn(ReadSignal<T>, ReadSignal<usize>) -> Vec<R::Node> + 'static,
) -> ForHandle<R::Node, K>
where
    R: Renderer + 'static,
    T: Clone + PartialEq + 'static,
    K: Eq + Hash + Clone + Display + 'static,
{
    let anchor = renderer.create_node(NodeKind::Marker);
    renderer.append_node(parent, &anchor);

    let state = Rc::new(RefCell::new(ListState {
        anchor,
        order: Vec::new(),
        entries: IndexMap::new(),
        differ: ArrayDiffer::new(),
    }));

    // Committed at the end of every pass; items derive from these.
    let snapshot: Signal<Rc<Vec<T>>> = signal(Rc::new(Vec::new()));
    let positions: Signal<Rc<IndexMap<K, usize>>> = signal(Rc::new(IndexMap::new()));

    let render = Rc::new(render);
    let state_effect = Rc::clone(&state);
    let renderer_effect = Rc::clone(&renderer);

    effect(move || {
        let items = Rc::new(items());
        let keys: Vec<K> = items.iter().map(&key_fn).collect();

        let diff = match state_effect.borrow_mut().differ.diff(keys) {
            Ok(diff) => diff,
            Err(err) => panic!("{err}"),
        };

        let (mut added, mut removed, mut moved) = (0, 0, 0);
        for mutation in diff.mutations {
            match mutation {
                ArrayMutation::Remove { key, index } => {
                    let entry = {
                        let mut state = state_effect.borrow_mut();
                        state.order.remove(index);
                        state.entries.shift_remove(&key)
                    };
                    if let Some(entry) = entry {
                        entry.disposer.dispose();
                    }
                    removed += 1;
                }
                ArrayMutation::Add { key, index } => {
                    let entry = render_item(
                        &renderer_effect,
                        &render,
                        items[index].clone(),
                        key.clone(),
                        index,
                        snapshot.read_only(),
                        positions.read_only(),
                    );
                    let mut state = state_effect.borrow_mut();
                    state.order.insert(index, key.clone());
                    let after = state.insertion_anchor(index);
                    place_nodes(&*renderer_effect, after, &entry.nodes);
                    state.entries.insert(key, entry);
                    added += 1;
                }
                ArrayMutation::Move { key, from, to } => {
                    let index = {
                        let mut state = state_effect.borrow_mut();
                        let moving = state.order.remove(from);
                        state.order.insert(to, moving);
                        let after = state.insertion_anchor(to);
                        state.entries.get(&key).map(|entry| {
                            place_nodes(&*renderer_effect, after, &entry.nodes);
                            entry.index
                        })
                    };
                    if let Some(index) = index {
                        index.set(to);
                    }
                    moved += 1;
                }
            }
        }

        snapshot.set(items);
        positions.set(Rc::new(diff.index_map));
        debug!(added, removed, moved, "reconciled keyed list");
    });

    let state_cleanup = Rc::clone(&state);
    on_cleanup(move || {
        let (entries, anchor) = {
            let mut state = state_cleanup.borrow_mut();
            state.order.clear();
            state.differ.reset();
            let entries: Vec<_> = state.entries.drain(..).map(|(_, entry)| entry).collect();
            (entries, state.anchor.clone())
        };
        for entry in entries {
            entry.disposer.dispose();
        }
        renderer.remove_node(&anchor);
    });

    ForHandle { state }
}

/// Create the leaked subscope for one item and render it.
fn render_item<R, T, K>(
    renderer: &Rc<R>,
    render: &Rc<impl Fn(ReadSignal<T>, ReadSignal<usize>) -> Vec<R::Node> + 'static>,
    initial: T,
    key: K,
    position: usize,
    snapshot: ReadSignal<Rc<Vec<T>>>,
    positions: ReadSignal<Rc<IndexMap<K, usize>>>,
) -> ItemEntry<R::Node>
where
    R: Renderer + 'static,
    T: Clone + PartialEq + 'static,
    K: Eq + Hash + Clone + 'static,
{
    let scope = create_subscope(SubscopeOptions { leaked: true });

    let (index, nodes) = untrack(|| {
        scope.run(|| {
            let index = signal(position);

            // Until the pass that adds this item commits, the key is absent
            // from `positions` and the item keeps its initial value.
            let mut latest = initial;
            let lookup = key.clone();
            let item = memo(move || {
                let fresh = positions
                    .with(|map| map.get(&lookup).copied())
                    .and_then(|at| snapshot.with(|items| items.get(at).cloned()));
                if let Some(fresh) = fresh {
                    latest = fresh;
                }
                latest.clone()
            });

            effect(move || {
                if let Some(at) = positions.with(|map| map.get(&key).copied()) {
                    index.set(at);
                }
            });

            let nodes = render(item, index.read_only());

            let owned = nodes.clone();
            let renderer = Rc::clone(renderer);
            on_cleanup(move || {
                for node in &owned {
                    renderer.remove_node(node);
                }
            });

            (index, nodes)
        })
    });

    ItemEntry {
        nodes,
        index,
        disposer: ScopeDisposer::from(scope),
    }
}
