//! Scopes
//!
//! A scope is a node in the ownership tree of reactive values. It owns the
//! signals and effects created while it is current, the cleanups registered
//! on it, and its child scopes. Disposing a scope tears all of that down:
//!
//! 1. Detach from the parent's child list.
//! 2. Run cleanups. Each runs inside its own scratch scope, so cleanups it
//!    registers are invoked as soon as it returns.
//! 3. Drop owned signals.
//! 4. Detach owned effects from the signals they listen to and dispose
//!    their nested scopes.
//! 5. Dispose child scopes.
//!
//! Disposal empties every list it processes, so it is idempotent.
//!
//! # Leaked Scopes
//!
//! A leaked scope is not added to its creator's child list. It still sees
//! the creator's context values, but its lifetime is managed explicitly by
//! whoever holds its disposer, such as the keyed list reconciler.

use std::fmt;

use super::context::ReactiveContext;
use super::runtime::{Runtime, ScopeId};

/// Options for [`subscope_with`] and [`create_subscope`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscopeOptions {
    /// Do not link the new scope into its parent's child list.
    pub leaked: bool,
}

/// A handle to a scope.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope {
    id: ScopeId,
}

impl Scope {
    /// The thread's root scope.
    pub fn root() -> Self {
        Self { id: Runtime::root() }
    }

    /// The scope that owns values created right now.
    pub fn current() -> Self {
        Self {
            id: Runtime::current_scope(),
        }
    }

    pub(crate) fn from_id(id: ScopeId) -> Self {
        Self { id }
    }

    /// Get the scope's unique ID.
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Run `f` with this scope as the owner of newly created values.
    ///
    /// Dependency tracking is not affected: reads inside `f` still register
    /// with the running effect, if any.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = ReactiveContext::enter_scope(self.id);
        f()
    }

    /// Dispose this scope and everything it owns.
    pub fn dispose(&self) {
        Runtime::dispose_scope(self.id);
    }

    /// Check if the scope has not been disposed.
    pub fn is_alive(&self) -> bool {
        Runtime::scope_alive(self.id)
    }

    /// The scope this one was created in.
    pub fn parent(&self) -> Option<Scope> {
        Runtime::with_scope(self.id, |node| node.parent)
            .flatten()
            .map(Self::from_id)
    }

    /// Check if this scope was created leaked.
    pub fn is_leaked(&self) -> bool {
        Runtime::with_scope(self.id, |node| node.leaked).unwrap_or(false)
    }

    /// Number of effects owned directly by this scope.
    pub fn effect_count(&self) -> usize {
        Runtime::with_scope(self.id, |node| node.effects.len()).unwrap_or(0)
    }

    /// Number of linked child scopes.
    pub fn subscope_count(&self) -> usize {
        Runtime::with_scope(self.id, |node| node.children.len()).unwrap_or(0)
    }

    /// Number of signals owned directly by this scope.
    pub fn signal_count(&self) -> usize {
        Runtime::with_scope(self.id, |node| node.signals.len()).unwrap_or(0)
    }

    /// Number of cleanups waiting to run.
    pub fn cleanup_count(&self) -> usize {
        Runtime::with_scope(self.id, |node| node.cleanups.len()).unwrap_or(0)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .field("effects", &self.effect_count())
            .field("subscopes", &self.subscope_count())
            .finish()
    }
}

/// Destructor returned by [`subscope`]. Calling [`dispose`](Self::dispose)
/// more than once is harmless.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[must_use = "a leaked subscope is only disposed through its disposer"]
pub struct ScopeDisposer {
    scope: Scope,
}

impl ScopeDisposer {
    pub fn dispose(&self) {
        self.scope.dispose();
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }
}

impl From<Scope> for ScopeDisposer {
    fn from(scope: Scope) -> Self {
        Self { scope }
    }
}

/// The scope that owns values created right now.
pub fn current_scope() -> Scope {
    Scope::current()
}

/// The thread's root scope.
pub fn root_scope() -> Scope {
    Scope::root()
}

/// Create a child of the current scope without entering it.
pub fn create_subscope(options: SubscopeOptions) -> Scope {
    Scope::from_id(Runtime::create_scope(
        Runtime::current_scope(),
        options.leaked,
    ))
}

/// Run `f` in a fresh child scope and return its destructor.
pub fn subscope(f: impl FnOnce()) -> ScopeDisposer {
    subscope_with(f, SubscopeOptions::default())
}

/// Run `f` in a fresh child scope created with `options`.
pub fn subscope_with(f: impl FnOnce(), options: SubscopeOptions) -> ScopeDisposer {
    let scope = create_subscope(options);
    scope.run(f);
    ScopeDisposer { scope }
}

/// Register `f` to run when the current scope is disposed.
///
/// Inside an effect, this is before the effect's next run.
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    Runtime::on_cleanup(Runtime::current_scope(), Box::new(f));
}

/// Register `f` to run when the current scope is disposed. Same as
/// [`on_cleanup`].
pub fn cleanup(f: impl FnOnce() + 'static) {
    on_cleanup(f);
}

/// Run `f` without tracking the signals it reads.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter_untracked();
    f()
}
