//! Memo Implementation
//!
//! A memo is a derived signal: an effect that writes the result of a
//! computation into a signal it owns. Readers subscribe to the signal, not
//! to the computation's inputs.
//!
//! # How Memos Work
//!
//! 1. On creation the computation runs once, and its result seeds a signal
//!    owned by the scope the memo was created in.
//!
//! 2. When an input changes, the computation re-runs in the next flush pass
//!    and writes its result. Equal results are dropped by the signal's
//!    equality check, so readers only re-run on actual changes.
//!
//! 3. Writes made by an effect are committed after the effect returns, so a
//!    memo's readers observe the new value in the following flush pass.

use std::cell::Cell;
use std::rc::Rc;

use super::effect::effect;
use super::scope::Scope;
use super::signal::{signal, ReadSignal, Signal};

/// Create a derived signal from `compute`.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::{memo, signal};
///
/// let count = signal(2);
/// let doubled = memo(move || count.get() * 2);
///
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub fn memo<T>(mut compute: impl FnMut() -> T + 'static) -> ReadSignal<T>
where
    T: Clone + PartialEq + 'static,
{
    let owner = Scope::current();
    let slot: Rc<Cell<Option<Signal<T>>>> = Rc::new(Cell::new(None));
    let slot_effect = Rc::clone(&slot);

    effect(move || {
        let value = compute();
        match slot_effect.get() {
            Some(derived) => derived.set(value),
            None => slot_effect.set(Some(owner.run(|| signal(value)))),
        }
    });

    slot.get()
        .expect("memo computation runs when the memo is created")
        .read_only()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{batch, subscope};

    #[test]
    fn memo_computes_on_creation() {
        let call_count = Rc::new(Cell::new(0));
        let call_count_clone = call_count.clone();

        let memo = memo(move || {
            call_count_clone.set(call_count_clone.get() + 1);
            42
        });

        assert_eq!(call_count.get(), 1);
        assert_eq!(memo.get(), 42);
        assert_eq!(call_count.get(), 1);
    }

    #[test]
    fn memo_follows_its_inputs() {
        let base = signal(5);
        let doubled = memo(move || base.get() * 2);
        let plus_ten = memo(move || doubled.get() + 10);

        assert_eq!(doubled.get(), 10);
        assert_eq!(plus_ten.get(), 20);

        base.set(10);

        assert_eq!(doubled.get(), 20);
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn equal_results_do_not_notify() {
        let number = signal(3);
        let parity = memo(move || number.get() % 2);
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();

        effect(move || {
            parity.get();
            runs_clone.set(runs_clone.get() + 1);
        });

        number.set(5);
        assert_eq!(runs.get(), 1);

        number.set(6);
        assert_eq!(runs.get(), 2);
        assert_eq!(parity.get(), 0);
    }

    #[test]
    fn batched_inputs_recompute_once() {
        let a = signal(1);
        let b = signal(2);
        let computations = Rc::new(Cell::new(0));
        let computations_clone = computations.clone();

        let sum = memo(move || {
            computations_clone.set(computations_clone.get() + 1);
            a.get() + b.get()
        });

        batch(|| {
            a.set(10);
            b.set(20);
        });

        assert_eq!(sum.get(), 30);
        assert_eq!(computations.get(), 2);
    }

    #[test]
    fn memo_signal_belongs_to_creating_scope() {
        let mut derived = None;
        let disposer = subscope(|| {
            let base = signal(1);
            derived = Some(memo(move || base.get() + 1));
        });
        let derived = derived.unwrap();

        assert_eq!(derived.get(), 2);
        disposer.dispose();
        assert!(!derived.is_alive());
    }
}
