//! Context Values
//!
//! A [`Context`] is a token for a dynamically scoped value. Providing a value
//! on a scope makes it visible to that scope and every scope created beneath
//! it, leaked ones included, for the duration of the `provide` call. Reading
//! walks the scope chain from the reading scope upwards and falls back to the
//! token's default.

use std::marker::PhantomData;
use std::rc::Rc;

use super::runtime::{ContextId, Runtime, Value};
use super::scope::Scope;

/// A dynamically scoped value with a default.
pub struct Context<T> {
    id: ContextId,
    default: Rc<T>,
    ty: PhantomData<fn() -> T>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: Rc::clone(&self.default),
            ty: PhantomData,
        }
    }
}

/// Restores the previously provided value when dropped.
struct Restore {
    scope: Scope,
    id: ContextId,
    previous: Option<Value>,
}

impl Drop for Restore {
    fn drop(&mut self) {
        let replaced = Runtime::swap_context(self.scope.id(), self.id, self.previous.take());
        drop(replaced);
    }
}

impl<T: Clone + 'static> Context<T> {
    /// Create a new context token.
    pub fn new(default: T) -> Self {
        Self {
            id: ContextId::new(),
            default: Rc::new(default),
            ty: PhantomData,
        }
    }

    /// Get the token's unique ID.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Provide `value` on `scope` while `f` runs, restoring the previous
    /// value on return.
    pub fn provide<R>(&self, scope: Scope, value: T, f: impl FnOnce() -> R) -> R {
        let previous = Runtime::swap_context(scope.id(), self.id, Some(Rc::new(value)));
        let _restore = Restore {
            scope,
            id: self.id,
            previous,
        };
        scope.run(f)
    }

    /// Read the value visible from `scope`.
    pub fn get_from(&self, scope: Scope) -> T {
        Runtime::lookup_context(scope.id(), self.id)
            .and_then(|value| (*value).downcast_ref::<T>().cloned())
            .unwrap_or_else(|| T::clone(&self.default))
    }
}

impl Scope {
    /// Read the nearest value provided for `context`, or its default.
    pub fn get<T: Clone + 'static>(&self, context: &Context<T>) -> T {
        context.get_from(*self)
    }
}

/// Read `context` from the current scope.
pub fn use_context<T: Clone + 'static>(context: &Context<T>) -> T {
    Scope::current().get(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{create_subscope, subscope, subscope_with, SubscopeOptions};
    use std::cell::RefCell;

    #[test]
    fn default_when_not_provided() {
        let depth = Context::new(0_u32);
        assert_eq!(use_context(&depth), 0);
        assert_eq!(Scope::root().get(&depth), 0);
    }

    #[test]
    fn provided_value_is_restored() {
        let depth = Context::new(0_u32);
        let scope = create_subscope(SubscopeOptions::default());

        depth.provide(scope, 1, || {
            assert_eq!(use_context(&depth), 1);
            depth.provide(scope, 2, || assert_eq!(use_context(&depth), 2));
            assert_eq!(use_context(&depth), 1);
        });

        assert_eq!(scope.get(&depth), 0);
        scope.dispose();
    }

    #[test]
    fn descendants_see_nearest_value() {
        let name = Context::new(String::from("default"));
        let seen = RefCell::new(Vec::new());
        let outer = create_subscope(SubscopeOptions::default());

        let leaked = name.provide(outer, String::from("outer"), || {
            let _a = subscope(|| seen.borrow_mut().push(use_context(&name)));
            let leaked = subscope_with(
                || seen.borrow_mut().push(use_context(&name)),
                SubscopeOptions { leaked: true },
            );
            let inner = create_subscope(SubscopeOptions::default());
            name.provide(inner, String::from("inner"), || {
                let _c = subscope(|| seen.borrow_mut().push(use_context(&name)));
            });
            leaked
        });

        assert_eq!(*seen.borrow(), vec!["outer", "outer", "inner"]);
        outer.dispose();
        leaked.dispose();
    }

    #[test]
    fn unrelated_scopes_do_not_see_value() {
        let flag = Context::new(false);
        let left = create_subscope(SubscopeOptions::default());
        let right = create_subscope(SubscopeOptions::default());

        flag.provide(left, true, || {
            assert!(left.get(&flag));
            assert!(!right.get(&flag));
        });

        left.dispose();
        right.dispose();
    }
}
