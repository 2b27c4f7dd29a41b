//! Reactive Context
//!
//! The reactive context tracks which effect is currently running and which
//! scope owns newly created signals, effects, and cleanups. This enables
//! automatic dependency tracking: when a signal is read, the current effect
//! (if any) is registered as a listener.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Running an effect pushes a frame
//! naming the effect as observer and its cleanup scope as owner; `untrack`
//! pushes a frame with no observer; `Scope::run` pushes a frame with a new
//! owner and the enclosing observer. Frames are popped by a guard, so the
//! stack is restored on every exit path, unwinding included.

use std::cell::RefCell;

use super::runtime::{EffectId, ScopeId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ContextEntry {
    /// The effect whose dependencies are being collected, if any.
    observer: Option<EffectId>,
    /// The scope that owns anything created under this entry.
    /// `None` means the thread's root scope.
    scope: Option<ScopeId>,
}

/// Guard that pops the context when dropped.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub struct ReactiveContext {
    entry: ContextEntry,
}

impl ReactiveContext {
    fn push(entry: ContextEntry) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(entry));
        Self { entry }
    }

    fn top() -> Option<ContextEntry> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().copied())
    }

    /// Enter a context that tracks reads into `observer` and creates
    /// reactive values inside `scope`.
    pub(crate) fn enter(observer: Option<EffectId>, scope: ScopeId) -> Self {
        Self::push(ContextEntry {
            observer,
            scope: Some(scope),
        })
    }

    /// Enter `scope` as owner, keeping the current observer.
    pub(crate) fn enter_scope(scope: ScopeId) -> Self {
        let observer = Self::top().and_then(|entry| entry.observer);
        Self::push(ContextEntry {
            observer,
            scope: Some(scope),
        })
    }

    /// Suspend dependency tracking, keeping the current owner scope.
    pub(crate) fn enter_untracked() -> Self {
        let scope = Self::top().and_then(|entry| entry.scope);
        Self::push(ContextEntry {
            observer: None,
            scope,
        })
    }

    /// Check if reads are currently being tracked.
    pub fn is_tracking() -> bool {
        Self::current_observer().is_some()
    }

    /// Get the effect currently collecting dependencies, if any.
    pub(crate) fn current_observer() -> Option<EffectId> {
        Self::top().and_then(|entry| entry.observer)
    }

    /// Get the scope that owns newly created values, if one was entered.
    pub(crate) fn current_scope() -> Option<ScopeId> {
        Self::top().and_then(|entry| entry.scope)
    }

    /// Number of frames on this thread's stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry, self.entry,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.entry, entry
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_observer() {
        let effect = EffectId::new();
        let scope = ScopeId::new();

        assert!(!ReactiveContext::is_tracking());

        {
            let _ctx = ReactiveContext::enter(Some(effect), scope);
            assert!(ReactiveContext::is_tracking());
            assert_eq!(ReactiveContext::current_observer(), Some(effect));
            assert_eq!(ReactiveContext::current_scope(), Some(scope));
        }

        assert!(!ReactiveContext::is_tracking());
        assert_eq!(ReactiveContext::current_scope(), None);
    }

    #[test]
    fn untracked_keeps_scope() {
        let effect = EffectId::new();
        let scope = ScopeId::new();

        let _ctx = ReactiveContext::enter(Some(effect), scope);
        {
            let _untracked = ReactiveContext::enter_untracked();
            assert_eq!(ReactiveContext::current_observer(), None);
            assert_eq!(ReactiveContext::current_scope(), Some(scope));
        }
        assert_eq!(ReactiveContext::current_observer(), Some(effect));
    }

    #[test]
    fn entering_a_scope_keeps_observer() {
        let effect = EffectId::new();
        let outer = ScopeId::new();
        let inner = ScopeId::new();

        let _ctx = ReactiveContext::enter(Some(effect), outer);
        {
            let _inner = ReactiveContext::enter_scope(inner);
            assert_eq!(ReactiveContext::current_observer(), Some(effect));
            assert_eq!(ReactiveContext::current_scope(), Some(inner));
        }
        assert_eq!(ReactiveContext::current_scope(), Some(outer));
    }

    #[test]
    fn stack_unwinds_on_panic() {
        let depth = ReactiveContext::depth();
        let result = std::panic::catch_unwind(|| {
            let _ctx = ReactiveContext::enter(None, ScopeId::new());
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(ReactiveContext::depth(), depth);
    }
}
