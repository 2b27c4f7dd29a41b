//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which effects depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a tracking context (an effect), the
//!    signal registers that effect as a listener and the effect records the
//!    signal as a dependency.
//!
//! 2. When a signal is written, the write is staged into the active batch
//!    (or a one-shot batch) and its listeners are queued.
//!
//! 3. The batch flush commits the value and re-runs the queued effects.
//!
//! # Handles
//!
//! `Signal<T>` is a copyable handle: an id into the thread's runtime plus a
//! type marker. The value itself is owned by the runtime and dropped when the
//! scope that created the signal is disposed.
//!
//! # Equality
//!
//! A write is skipped when the new value equals (`PartialEq`) the latest
//! value, unless `force` is set. `modify` mutates in place and always
//! notifies.

use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::rc::Rc;

use super::runtime::{Runtime, SignalId};

/// Options for a signal write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Commit and notify even if the value is equal to the current one.
    pub force: bool,
    /// Commit the value without notifying any listener.
    pub silent: bool,
}

impl WriteOptions {
    pub const FORCE: Self = Self {
        force: true,
        silent: false,
    };

    pub const SILENT: Self = Self {
        force: false,
        silent: true,
    };
}

/// Create a signal in the current scope.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::signal;
///
/// let count = signal(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub fn signal<T: 'static>(value: T) -> Signal<T> {
    Signal {
        id: Runtime::create_signal(Rc::new(value)),
        ty: PhantomData,
    }
}

/// A reactive signal holding a value of type T.
pub struct Signal<T> {
    id: SignalId,
    ty: PhantomData<fn() -> T>,
}

/// The read half of a [`Signal`].
pub struct ReadSignal<T> {
    id: SignalId,
    ty: PhantomData<fn() -> T>,
}

/// The write half of a [`Signal`].
pub struct WriteSignal<T> {
    id: SignalId,
    ty: PhantomData<fn() -> T>,
}

macro_rules! impl_handle {
    ($name:ident) => {
        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl<T> Eq for $name<T> {}

        impl<T> $name<T> {
            /// Get the signal's unique ID.
            pub fn id(&self) -> SignalId {
                self.id
            }

            /// Check if the owning scope has not yet been disposed.
            pub fn is_alive(&self) -> bool {
                Runtime::signal_alive(self.id)
            }

            /// Get the number of effects listening to this signal.
            pub fn listener_count(&self) -> usize {
                Runtime::listener_count(self.id)
            }
        }
    };
}

impl_handle!(Signal);
impl_handle!(ReadSignal);
impl_handle!(WriteSignal);

impl<T: 'static> ReadSignal<T> {
    /// Borrow the value, tracking it if an effect is running.
    ///
    /// Returns `None` if the signal was disposed.
    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        Runtime::track(self.id);
        self.try_peek_with(f)
    }

    /// Borrow the value without tracking.
    pub fn try_peek_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let value = Runtime::peek_signal(self.id)?;
        let value = (*value).downcast_ref::<T>()?;
        Some(f(value))
    }

    /// Borrow the value, tracking it if an effect is running.
    ///
    /// # Panics
    ///
    /// Panics if the signal was disposed.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.try_with(f) {
            Some(result) => result,
            None => panic!("{:?} read after its scope was disposed", self.id),
        }
    }

    /// Borrow the value without tracking.
    ///
    /// # Panics
    ///
    /// Panics if the signal was disposed.
    pub fn peek_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.try_peek_with(f) {
            Some(result) => result,
            None => panic!("{:?} read after its scope was disposed", self.id),
        }
    }
}

impl<T: Clone + 'static> ReadSignal<T> {
    /// Get the current value, tracking it if an effect is running.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value, or `None` if the signal was disposed.
    pub fn try_get(&self) -> Option<T> {
        self.try_with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    pub fn peek(&self) -> T {
        self.peek_with(T::clone)
    }
}

impl<T: 'static> WriteSignal<T> {
    /// Write `value` with the given options.
    ///
    /// Without `force`, the write is dropped if `value` equals the latest
    /// value. With `silent`, the value is committed but nobody is notified.
    pub fn set_with(&self, value: T, options: WriteOptions)
    where
        T: PartialEq,
    {
        if !options.force {
            let Some(current) = Runtime::latest_value(self.id) else {
                return;
            };
            if (*current).downcast_ref::<T>() == Some(&value) {
                return;
            }
        }
        Runtime::stage_write(self.id, Rc::new(value), !options.silent);
    }

    /// Set a new value and notify listeners if it changed.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        self.set_with(value, WriteOptions::default());
    }

    /// Compute the new value from the latest one.
    ///
    /// Inside a batch, `f` sees the most recently staged value.
    pub fn update_with(&self, f: impl FnOnce(&T) -> T, options: WriteOptions)
    where
        T: PartialEq,
    {
        let Some(current) = Runtime::latest_value(self.id) else {
            return;
        };
        let Some(current) = (*current).downcast_ref::<T>() else {
            return;
        };
        let next = f(current);
        self.set_with(next, options);
    }

    /// Compute the new value from the latest one.
    pub fn update(&self, f: impl FnOnce(&T) -> T)
    where
        T: PartialEq,
    {
        self.update_with(f, WriteOptions::default());
    }

    /// Mutate a copy of the latest value in place and always notify.
    pub fn modify(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        let Some(current) = Runtime::latest_value(self.id) else {
            return;
        };
        let Some(mut next) = (*current).downcast_ref::<T>().cloned() else {
            return;
        };
        f(&mut next);
        Runtime::stage_write(self.id, Rc::new(next), true);
    }
}

impl<T: 'static> Signal<T> {
    /// Get the read half of this signal.
    pub fn read_only(self) -> ReadSignal<T> {
        ReadSignal {
            id: self.id,
            ty: PhantomData,
        }
    }

    /// Get the write half of this signal.
    pub fn write_only(self) -> WriteSignal<T> {
        WriteSignal {
            id: self.id,
            ty: PhantomData,
        }
    }

    /// Split into read and write halves.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (self.read_only(), self.write_only())
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.read_only().with(f)
    }

    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.read_only().try_with(f)
    }

    pub fn peek_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.read_only().peek_with(f)
    }

    pub fn set_with(&self, value: T, options: WriteOptions)
    where
        T: PartialEq,
    {
        self.write_only().set_with(value, options);
    }

    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        self.write_only().set(value);
    }

    pub fn update_with(&self, f: impl FnOnce(&T) -> T, options: WriteOptions)
    where
        T: PartialEq,
    {
        self.write_only().update_with(f, options);
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T)
    where
        T: PartialEq,
    {
        self.write_only().update(f);
    }

    pub fn modify(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        self.write_only().modify(f);
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn get(&self) -> T {
        self.read_only().get()
    }

    pub fn try_get(&self) -> Option<T> {
        self.read_only().try_get()
    }

    pub fn peek(&self) -> T {
        self.read_only().peek()
    }
}

impl<T> From<Signal<T>> for ReadSignal<T> {
    fn from(signal: Signal<T>) -> Self {
        Self {
            id: signal.id,
            ty: PhantomData,
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read_only().fmt(f)
    }
}

impl<T: Debug + 'static> Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Signal");
        debug.field("id", &self.id);
        match self.try_peek_with(|value| format!("{value:?}")) {
            Some(value) => debug.field("value", &value),
            None => debug.field("value", &"<disposed>"),
        };
        debug
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

impl<T> Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal").field("id", &self.id).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
