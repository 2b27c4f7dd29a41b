//! Reactive Runtime
//!
//! The runtime is the central store that connects signals, effects, and
//! scopes. It owns every reactive node in arenas keyed by id and performs the
//! structural operations on them: dependency tracking, scope teardown, and
//! effect execution.
//!
//! # How It Works
//!
//! 1. Signals, effects, and scopes register with the runtime on creation and
//!    are addressed afterwards only through copyable ids. Parents own their
//!    children through id lists; children hold a non-owning parent id.
//!
//! 2. When an effect reads a signal, the runtime records the edge in both
//!    directions (signal listeners, effect dependencies).
//!
//! 3. When a signal is written, the write is staged into the current batch
//!    together with the signal's listeners. The batch flush (see `batch.rs`)
//!    commits the values and re-runs the effects.
//!
//! # Thread Model
//!
//! The runtime is single-threaded. Each thread owns an independent runtime in
//! thread-local storage. The state lives in a `RefCell` that is only ever
//! borrowed for short bookkeeping sections; user code (effect bodies,
//! cleanups) always runs with the borrow released.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::batch::batch;
use super::context::ReactiveContext;
use crate::config::RuntimeConfig;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Generate a new unique id.
            pub(crate) fn new() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(0);
                Self(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            /// Get the raw id value.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a signal.
    SignalId
);
define_id!(
    /// Unique identifier for an effect.
    EffectId
);
define_id!(
    /// Unique identifier for a scope.
    ScopeId
);
define_id!(
    /// Unique identifier for a context token.
    ContextId
);

pub(crate) type Value = Rc<dyn Any>;
pub(crate) type Cleanup = Box<dyn FnOnce()>;
pub(crate) type EffectFn = Rc<RefCell<Box<dyn FnMut()>>>;

pub(crate) struct SignalNode {
    pub(crate) value: Value,
    /// Effects to re-run when this signal is written. Each appears once.
    pub(crate) listeners: SmallVec<[EffectId; 4]>,
}

pub(crate) struct EffectNode {
    pub(crate) run: EffectFn,
    /// Signals read during the most recent run, in read order.
    pub(crate) dependencies: SmallVec<[SignalId; 4]>,
    /// Scope owning what the last run created and registered.
    pub(crate) clean: ScopeId,
    /// Scope this effect was created in.
    pub(crate) owner: ScopeId,
    pub(crate) untracked: bool,
    pub(crate) runs: usize,
}

#[derive(Default)]
pub(crate) struct ScopeNode {
    /// Creator of this scope. Used for context lookup, and for detaching
    /// from the creator's child list unless the scope is leaked.
    pub(crate) parent: Option<ScopeId>,
    pub(crate) leaked: bool,
    pub(crate) signals: Vec<SignalId>,
    pub(crate) effects: Vec<EffectId>,
    pub(crate) cleanups: Vec<Cleanup>,
    pub(crate) children: Vec<ScopeId>,
    pub(crate) contexts: HashMap<ContextId, Value>,
}

impl ScopeNode {
    fn new(parent: Option<ScopeId>, leaked: bool) -> Self {
        Self {
            parent,
            leaked,
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.signals.is_empty()
            && self.effects.is_empty()
            && self.cleanups.is_empty()
            && self.children.is_empty()
    }
}

pub(crate) struct RuntimeState {
    pub(crate) config: RuntimeConfig,
    pub(crate) root: ScopeId,
    pub(crate) signals: HashMap<SignalId, SignalNode>,
    pub(crate) effects: HashMap<EffectId, EffectNode>,
    pub(crate) scopes: HashMap<ScopeId, ScopeNode>,
    /// Nesting depth of `batch` calls; the flush runs at depth one.
    pub(crate) batch_depth: usize,
    pub(crate) pending_writes: Vec<(SignalId, Value)>,
    pub(crate) pending_effects: IndexSet<EffectId>,
}

impl RuntimeState {
    fn new() -> Self {
        let root = ScopeId::new();
        let mut scopes = HashMap::new();
        scopes.insert(root, ScopeNode::new(None, false));

        Self {
            config: RuntimeConfig::default(),
            root,
            signals: HashMap::new(),
            effects: HashMap::new(),
            scopes,
            batch_depth: 0,
            pending_writes: Vec::new(),
            pending_effects: IndexSet::new(),
        }
    }

    /// The value a write would compare against: the latest staged value,
    /// or the committed one when nothing is staged.
    pub(crate) fn latest_value(&self, id: SignalId) -> Option<Value> {
        self.pending_writes
            .iter()
            .rev()
            .find(|(signal, _)| *signal == id)
            .map(|(_, value)| Rc::clone(value))
            .or_else(|| self.signals.get(&id).map(|node| Rc::clone(&node.value)))
    }

    /// `scope` if it is still alive, otherwise the root.
    fn live_owner(&self, scope: ScopeId, node: &str) -> ScopeId {
        if self.scopes.contains_key(&scope) {
            scope
        } else {
            warn!(%node, ?scope, "created in a disposed scope; owned by the root");
            self.root
        }
    }

    fn detach_effect(&mut self, id: EffectId, dependencies: &[SignalId]) {
        for signal in dependencies {
            if let Some(node) = self.signals.get_mut(signal) {
                node.listeners.retain(|listener| *listener != id);
            }
        }
    }
}

thread_local! {
    static RUNTIME: RefCell<RuntimeState> = RefCell::new(RuntimeState::new());
}

/// Borrow this thread's runtime state. Must not be nested, and the closure
/// must not call user code.
pub(crate) fn with_state<R>(f: impl FnOnce(&mut RuntimeState) -> R) -> R {
    RUNTIME.with(|runtime| f(&mut runtime.borrow_mut()))
}

/// The per-thread reactive runtime.
///
/// All state is reached through associated functions; there is exactly one
/// runtime per thread.
pub struct Runtime;

impl Runtime {
    /// Install a configuration for this thread's runtime.
    pub fn configure(config: RuntimeConfig) {
        with_state(|state| state.config = config);
    }

    /// Get this thread's runtime configuration.
    pub fn config() -> RuntimeConfig {
        with_state(|state| state.config.clone())
    }

    /// Check if a batch is open on this thread.
    pub fn is_batching() -> bool {
        with_state(|state| state.batch_depth > 0)
    }

    /// Number of live signals on this thread.
    pub fn signal_count() -> usize {
        with_state(|state| state.signals.len())
    }

    /// Number of live effects on this thread.
    pub fn effect_count() -> usize {
        with_state(|state| state.effects.len())
    }

    /// Number of live scopes on this thread, the root included.
    pub fn scope_count() -> usize {
        with_state(|state| state.scopes.len())
    }

    pub(crate) fn root() -> ScopeId {
        with_state(|state| state.root)
    }

    /// The scope that owns values created right now.
    pub(crate) fn current_scope() -> ScopeId {
        ReactiveContext::current_scope().unwrap_or_else(Self::root)
    }

    // ------------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------------

    pub(crate) fn create_signal(value: Value) -> SignalId {
        let id = SignalId::new();
        let requested = Self::current_scope();

        with_state(|state| {
            let owner = state.live_owner(requested, "signal");
            state.signals.insert(
                id,
                SignalNode {
                    value,
                    listeners: SmallVec::new(),
                },
            );
            if let Some(scope) = state.scopes.get_mut(&owner) {
                scope.signals.push(id);
            }
        });

        id
    }

    /// Register the current observer as a listener of `id`.
    pub(crate) fn track(id: SignalId) {
        let Some(observer) = ReactiveContext::current_observer() else {
            return;
        };

        with_state(|state| {
            let (Some(signal), Some(effect)) =
                (state.signals.get_mut(&id), state.effects.get_mut(&observer))
            else {
                return;
            };
            if !signal.listeners.contains(&observer) {
                signal.listeners.push(observer);
            }
            if !effect.dependencies.contains(&id) {
                effect.dependencies.push(id);
            }
        });
    }

    /// Get the committed value of a signal without tracking.
    pub(crate) fn peek_signal(id: SignalId) -> Option<Value> {
        with_state(|state| state.signals.get(&id).map(|node| Rc::clone(&node.value)))
    }

    pub(crate) fn latest_value(id: SignalId) -> Option<Value> {
        with_state(|state| state.latest_value(id))
    }

    /// Stage a write into the current batch, opening one if none is active.
    pub(crate) fn stage_write(id: SignalId, value: Value, notify: bool) {
        batch(|| {
            with_state(|state| {
                let Some(node) = state.signals.get(&id) else {
                    return;
                };
                if notify {
                    let listeners = node.listeners.clone();
                    state.pending_effects.extend(listeners);
                }
                state.pending_writes.push((id, value));
            });
        });
    }

    pub(crate) fn signal_alive(id: SignalId) -> bool {
        with_state(|state| state.signals.contains_key(&id))
    }

    pub(crate) fn listener_count(id: SignalId) -> usize {
        with_state(|state| state.signals.get(&id).map_or(0, |node| node.listeners.len()))
    }

    // ------------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------------

    pub(crate) fn create_scope(parent: ScopeId, leaked: bool) -> ScopeId {
        let id = ScopeId::new();

        with_state(|state| {
            state.scopes.insert(id, ScopeNode::new(Some(parent), leaked));
            if !leaked {
                if let Some(parent) = state.scopes.get_mut(&parent) {
                    parent.children.push(id);
                }
            }
        });

        id
    }

    pub(crate) fn scope_alive(id: ScopeId) -> bool {
        with_state(|state| state.scopes.contains_key(&id))
    }

    pub(crate) fn with_scope<R>(id: ScopeId, f: impl FnOnce(&ScopeNode) -> R) -> Option<R> {
        with_state(|state| state.scopes.get(&id).map(f))
    }

    pub(crate) fn on_cleanup(scope: ScopeId, cleanup: Cleanup) {
        let rejected = with_state(|state| match state.scopes.get_mut(&scope) {
            Some(node) => {
                node.cleanups.push(cleanup);
                None
            }
            None => Some(cleanup),
        });

        // A cleanup registered on a disposed scope runs right away.
        if let Some(cleanup) = rejected {
            Self::run_cleanup(scope, cleanup);
        }
    }

    /// Run a cleanup inside its own disposable scope, so that cleanups it
    /// registers run as soon as it returns.
    fn run_cleanup(owner: ScopeId, cleanup: Cleanup) {
        let scratch = Self::create_scope(owner, true);
        {
            let _ctx = ReactiveContext::enter(None, scratch);
            cleanup();
        }
        Self::dispose_scope(scratch);
    }

    /// Tear down everything a scope owns, keeping the scope itself alive.
    ///
    /// Order: cleanups, signals, effects, child scopes. Lists are emptied as
    /// they are processed, so clearing twice is a no-op. The teardown is one
    /// batch: writes made by cleanups flush after the owned effects are gone.
    pub(crate) fn clear_scope(id: ScopeId) {
        batch(|| Self::clear_scope_now(id));
    }

    fn clear_scope_now(id: ScopeId) {
        let cleanups = with_state(|state| {
            state
                .scopes
                .get_mut(&id)
                .map(|node| mem::take(&mut node.cleanups))
                .unwrap_or_default()
        });
        for cleanup in cleanups {
            Self::run_cleanup(id, cleanup);
        }

        let signals: Vec<SignalNode> = with_state(|state| {
            let ids = state
                .scopes
                .get_mut(&id)
                .map(|node| mem::take(&mut node.signals))
                .unwrap_or_default();
            ids.iter()
                .filter_map(|signal| state.signals.remove(signal))
                .collect()
        });
        drop(signals);

        let effects = with_state(|state| {
            state
                .scopes
                .get_mut(&id)
                .map(|node| mem::take(&mut node.effects))
                .unwrap_or_default()
        });
        for effect in effects {
            Self::destroy_effect(effect);
        }

        let children = with_state(|state| {
            state
                .scopes
                .get_mut(&id)
                .map(|node| mem::take(&mut node.children))
                .unwrap_or_default()
        });
        for child in children {
            Self::dispose_scope(child);
        }
    }

    /// Detach a scope from its parent, tear it down, and free it.
    pub(crate) fn dispose_scope(id: ScopeId) {
        let found = with_state(|state| {
            let Some(node) = state.scopes.get(&id) else {
                return false;
            };
            if let (false, Some(parent)) = (node.leaked, node.parent) {
                if let Some(parent) = state.scopes.get_mut(&parent) {
                    parent.children.retain(|child| *child != id);
                }
            }
            true
        });
        if !found {
            return;
        }

        Self::clear_scope(id);

        let removed = with_state(|state| state.scopes.remove(&id));
        drop(removed);
        debug!(scope = ?id, "scope disposed");
    }

    /// Walk from `scope` towards the root, returning the nearest value
    /// provided for `context`.
    pub(crate) fn lookup_context(scope: ScopeId, context: ContextId) -> Option<Value> {
        with_state(|state| {
            let mut current = Some(scope);
            while let Some(id) = current {
                let node = state.scopes.get(&id)?;
                if let Some(value) = node.contexts.get(&context) {
                    return Some(Rc::clone(value));
                }
                current = node.parent;
            }
            None
        })
    }

    /// Replace the value provided for `context` on `scope`, returning the
    /// previous one.
    pub(crate) fn swap_context(
        scope: ScopeId,
        context: ContextId,
        value: Option<Value>,
    ) -> Option<Value> {
        with_state(|state| {
            let node = state.scopes.get_mut(&scope)?;
            match value {
                Some(value) => node.contexts.insert(context, value),
                None => node.contexts.remove(&context),
            }
        })
    }

    // ------------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------------

    /// Register an effect in the current scope and run it once.
    pub(crate) fn create_effect(run: Box<dyn FnMut()>, untracked: bool) -> EffectId {
        let id = EffectId::new();
        let requested = Self::current_scope();
        let clean = ScopeId::new();

        let owner = with_state(|state| {
            let owner = state.live_owner(requested, "effect");
            state.scopes.insert(clean, ScopeNode::new(Some(owner), true));
            state.effects.insert(
                id,
                EffectNode {
                    run: Rc::new(RefCell::new(run)),
                    dependencies: SmallVec::new(),
                    clean,
                    owner,
                    untracked,
                    runs: 0,
                },
            );
            if let Some(scope) = state.scopes.get_mut(&owner) {
                scope.effects.push(id);
            }
            owner
        });

        Self::run_effect(id);

        let pruned = with_state(|state| {
            if !state.config.prune_inert_effects {
                return None;
            }
            let effect = state.effects.get(&id)?;
            let inert = effect.dependencies.is_empty()
                && state.scopes.get(&clean).map_or(true, ScopeNode::is_empty);
            if !inert {
                return None;
            }
            if let Some(scope) = state.scopes.get_mut(&owner) {
                scope.effects.retain(|effect| *effect != id);
            }
            let scope = state.scopes.remove(&clean);
            Some((state.effects.remove(&id), scope))
        });
        if pruned.is_some() {
            debug!(effect = ?id, "pruned inert effect");
        }
        drop(pruned);

        id
    }

    /// Re-run an effect: detach it from its signals, dispose the previous
    /// run's cleanup scope, then execute under tracking.
    pub(crate) fn run_effect(id: EffectId) {
        let Some((run, clean, untracked)) = with_state(|state| {
            let effect = state.effects.get_mut(&id)?;
            let dependencies = mem::take(&mut effect.dependencies);
            let found = (Rc::clone(&effect.run), effect.clean, effect.untracked);
            state.detach_effect(id, &dependencies);
            Some(found)
        }) else {
            return;
        };

        Self::clear_scope(clean);

        let observer = (!untracked).then_some(id);
        batch(|| {
            let Ok(mut body) = run.try_borrow_mut() else {
                warn!(effect = ?id, "effect re-entered while running; skipping");
                return;
            };
            let _ctx = ReactiveContext::enter(observer, clean);
            trace!(effect = ?id, "running effect");
            (&mut **body)();
        });

        with_state(|state| {
            if let Some(effect) = state.effects.get_mut(&id) {
                effect.runs += 1;
            }
        });
    }

    /// Remove an effect and everything its last run created. The owner's
    /// effect list is not touched.
    fn destroy_effect(id: EffectId) {
        let removed = with_state(|state| {
            let effect = state.effects.remove(&id)?;
            state.detach_effect(id, &effect.dependencies);
            state.pending_effects.shift_remove(&id);
            Some(effect)
        });

        if let Some(effect) = removed {
            Self::dispose_scope(effect.clean);
        }
    }

    /// Stop an effect for good, detaching it from its owner scope.
    pub(crate) fn dispose_effect(id: EffectId) {
        with_state(|state| {
            let owner = state.effects.get(&id).map(|effect| effect.owner);
            if let Some(scope) = owner.and_then(|owner| state.scopes.get_mut(&owner)) {
                scope.effects.retain(|effect| *effect != id);
            }
        });
        Self::destroy_effect(id);
    }

    pub(crate) fn effect_alive(id: EffectId) -> bool {
        with_state(|state| state.effects.contains_key(&id))
    }

    pub(crate) fn effect_stats(id: EffectId) -> Option<(usize, usize)> {
        with_state(|state| {
            state
                .effects
                .get(&id)
                .map(|effect| (effect.dependencies.len(), effect.runs))
        })
    }

    /// Dispose the cleanup scope of an effect queued for re-run.
    pub(crate) fn clear_effect_scope(id: EffectId) {
        if let Some(clean) = with_state(|state| state.effects.get(&id).map(|effect| effect.clean)) {
            Self::clear_scope(clean);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
        let count = Rc::new(Cell::new(0));
        (count.clone(), count)
    }

    #[test]
    fn signal_registers_in_current_scope() {
        let root = Runtime::root();
        let before = Runtime::with_scope(root, |scope| scope.signals.len()).unwrap();

        let id = Runtime::create_signal(Rc::new(1_i32));

        assert!(Runtime::signal_alive(id));
        assert_eq!(
            Runtime::with_scope(root, |scope| scope.signals.len()).unwrap(),
            before + 1
        );
    }

    #[test]
    fn tracking_records_both_directions() {
        let signal = Runtime::create_signal(Rc::new(0_i32));
        let effect = Runtime::create_effect(Box::new(move || Runtime::track(signal)), false);

        assert_eq!(Runtime::listener_count(signal), 1);
        assert_eq!(Runtime::effect_stats(effect), Some((1, 1)));

        // Re-running does not duplicate the listener.
        Runtime::run_effect(effect);
        assert_eq!(Runtime::listener_count(signal), 1);
        assert_eq!(Runtime::effect_stats(effect), Some((1, 2)));
    }

    #[test]
    fn inert_effects_are_pruned() {
        let (runs, runs_clone) = counter();
        let before = Runtime::effect_count();

        let effect = Runtime::create_effect(
            Box::new(move || runs_clone.set(runs_clone.get() + 1)),
            false,
        );

        assert_eq!(runs.get(), 1);
        assert!(!Runtime::effect_alive(effect));
        assert_eq!(Runtime::effect_count(), before);
    }

    #[test]
    fn pruning_can_be_disabled() {
        Runtime::configure(RuntimeConfig {
            prune_inert_effects: false,
            ..RuntimeConfig::default()
        });

        let effect = Runtime::create_effect(Box::new(|| {}), false);
        assert!(Runtime::effect_alive(effect));

        Runtime::dispose_effect(effect);
        assert!(!Runtime::effect_alive(effect));
        Runtime::configure(RuntimeConfig::default());
    }

    #[test]
    fn disposing_scope_twice_is_a_no_op() {
        let (cleanups, cleanups_clone) = counter();
        let scope = Runtime::create_scope(Runtime::root(), false);
        Runtime::on_cleanup(
            scope,
            Box::new(move || cleanups_clone.set(cleanups_clone.get() + 1)),
        );

        Runtime::dispose_scope(scope);
        Runtime::dispose_scope(scope);

        assert_eq!(cleanups.get(), 1);
        assert!(!Runtime::scope_alive(scope));
    }

    #[test]
    fn cleanup_on_disposed_scope_runs_immediately() {
        let (cleanups, cleanups_clone) = counter();
        let scope = Runtime::create_scope(Runtime::root(), false);
        Runtime::dispose_scope(scope);

        Runtime::on_cleanup(
            scope,
            Box::new(move || cleanups_clone.set(cleanups_clone.get() + 1)),
        );
        assert_eq!(cleanups.get(), 1);
    }

    #[test]
    fn nodes_created_in_disposed_scope_belong_to_root() {
        let root = Runtime::root();
        let scope = Runtime::create_scope(root, false);
        Runtime::dispose_scope(scope);
        let root_signals = Runtime::with_scope(root, |node| node.signals.len()).unwrap();
        let root_effects = Runtime::with_scope(root, |node| node.effects.len()).unwrap();

        let (signal, effect) = {
            let _ctx = ReactiveContext::enter(None, scope);
            let signal = Runtime::create_signal(Rc::new(1_i32));
            let effect = Runtime::create_effect(Box::new(move || Runtime::track(signal)), false);
            (signal, effect)
        };

        assert!(Runtime::signal_alive(signal));
        assert!(Runtime::effect_alive(effect));
        assert_eq!(
            Runtime::with_scope(root, |node| node.signals.len()),
            Some(root_signals + 1)
        );
        assert_eq!(
            Runtime::with_scope(root, |node| node.effects.len()),
            Some(root_effects + 1)
        );

        Runtime::dispose_effect(effect);
        assert_eq!(Runtime::listener_count(signal), 0);
    }

    #[test]
    fn context_lookup_walks_parents() {
        let context = ContextId::new();
        let parent = Runtime::create_scope(Runtime::root(), false);
        let child = Runtime::create_scope(parent, true);

        assert!(Runtime::lookup_context(child, context).is_none());

        Runtime::swap_context(parent, context, Some(Rc::new("ink")));
        let found = Runtime::lookup_context(child, context).unwrap();
        assert_eq!(found.downcast_ref::<&str>(), Some(&"ink"));

        Runtime::dispose_scope(parent);
        Runtime::dispose_scope(child);
    }
}
