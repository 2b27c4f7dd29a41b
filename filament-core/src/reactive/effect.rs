//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency is written, the effect is queued in the batch.
//!
//! 3. Before re-running, the effect detaches from every signal it read, and
//!    the cleanups registered by its previous run are invoked. The new run
//!    subscribes to whatever it reads this time, so the dependency set is
//!    always exactly the last run's reads.
//!
//! # Cleanup
//!
//! Each effect owns a nested scope. Signals, effects, subscopes, and
//! cleanups created while the effect body runs belong to that scope and are
//! disposed before the next run and when the effect is disposed.
//!
//! # Pruning
//!
//! An effect that read no signal and left nothing in its scope after its
//! first run can never run again. It is detached right away, see
//! [`RuntimeConfig::prune_inert_effects`](crate::config::RuntimeConfig).

use std::fmt;

use super::runtime::{EffectId, Runtime};

/// Options for [`effect_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectOptions {
    /// Do not register dependencies for reads made by the effect body.
    pub untracked: bool,
}

/// A handle to a running effect.
///
/// Handles are copyable; the effect itself is owned by the scope it was
/// created in.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::{effect, signal};
///
/// let count = signal(0);
///
/// let effect = effect(move || {
///     println!("Count is: {}", count.get());
/// });
///
/// count.set(5); // Prints: "Count is: 5"
/// effect.dispose();
/// count.set(6); // Prints nothing
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Effect {
    id: EffectId,
}

/// Create an effect in the current scope and run it once.
pub fn effect(run: impl FnMut() + 'static) -> Effect {
    effect_with(run, EffectOptions::default())
}

/// Create an effect with options and run it once.
pub fn effect_with(run: impl FnMut() + 'static, options: EffectOptions) -> Effect {
    Effect {
        id: Runtime::create_effect(Box::new(run), options.untracked),
    }
}

impl Effect {
    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Stop the effect. It detaches from its signals, its cleanups run, and
    /// it never runs again.
    pub fn dispose(&self) {
        Runtime::dispose_effect(self.id);
    }

    /// Check if the effect is still attached to the runtime.
    ///
    /// Pruned and disposed effects are not alive.
    pub fn is_alive(&self) -> bool {
        Runtime::effect_alive(self.id)
    }

    /// Number of signals read by the most recent run.
    pub fn dependency_count(&self) -> usize {
        Runtime::effect_stats(self.id).map_or(0, |(dependencies, _)| dependencies)
    }

    /// Number of times the effect has run.
    pub fn run_count(&self) -> usize {
        Runtime::effect_stats(self.id).map_or(0, |(_, runs)| runs)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{on_cleanup, signal, use_context, Context, Scope};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        effect(move || {
            run_count_clone.set(run_count_clone.get() + 1);
        });

        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn effect_reruns_on_write() {
        let source = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let effect = effect(move || seen_clone.borrow_mut().push(source.get()));

        source.set(1);
        source.set(2);

        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert_eq!(effect.run_count(), 3);
        assert_eq!(effect.dependency_count(), 1);
    }

    #[test]
    fn dependencies_follow_the_last_run() {
        let toggle = signal(true);
        let left = signal(0);
        let right = signal(0);
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();

        let effect = effect(move || {
            runs_clone.set(runs_clone.get() + 1);
            if toggle.get() {
                left.get();
            } else {
                right.get();
            }
        });
        assert_eq!(runs.get(), 1);

        toggle.set(false);
        assert_eq!(runs.get(), 2);
        assert_eq!(effect.dependency_count(), 2);
        assert_eq!(left.listener_count(), 0);

        // `left` is no longer read, so writing it does nothing.
        left.set(1);
        assert_eq!(runs.get(), 2);

        right.set(1);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn cleanups_run_before_rerun() {
        let source = signal(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();

        effect(move || {
            let value = source.get();
            log_clone.borrow_mut().push(format!("run {value}"));
            let log = log_clone.clone();
            on_cleanup(move || log.borrow_mut().push(format!("cleanup {value}")));
        });

        source.set(1);

        assert_eq!(*log.borrow(), vec!["run 0", "cleanup 0", "run 1"]);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let source = signal(0);
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();
        let cleaned = Rc::new(Cell::new(false));
        let cleaned_clone = cleaned.clone();

        let effect = effect(move || {
            source.get();
            run_count_clone.set(run_count_clone.get() + 1);
            let cleaned = cleaned_clone.clone();
            on_cleanup(move || cleaned.set(true));
        });

        effect.dispose();
        assert!(!effect.is_alive());
        assert!(cleaned.get());
        assert_eq!(source.listener_count(), 0);

        source.set(1);
        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn untracked_effect_reads_without_subscribing() {
        let theme = Context::new("light");
        let source = signal(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let theme_clone = theme.clone();
        theme.provide(Scope::current(), "dark", || {
            effect_with(
                move || {
                    seen_clone
                        .borrow_mut()
                        .push((source.get(), use_context(&theme_clone)));
                },
                EffectOptions { untracked: true },
            );
        });

        source.set(1);
        assert_eq!(*seen.borrow(), vec![(0, "dark")]);
    }

    #[test]
    fn writes_inside_effect_are_deferred() {
        let source = signal(0);
        let mirror = signal(-1);
        let observed = Rc::new(Cell::new(0));
        let observed_clone = observed.clone();

        effect(move || {
            mirror.set(source.get());
            // Not committed until this body returns.
            observed_clone.set(mirror.peek());
        });

        assert_eq!(observed.get(), -1);
        assert_eq!(mirror.peek(), 0);

        source.set(3);
        assert_eq!(observed.get(), 0);
        assert_eq!(mirror.peek(), 3);
    }
}
