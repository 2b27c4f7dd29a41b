//! Batch Scheduler
//!
//! A batch is a transaction window. Signal writes made inside it are staged
//! instead of committed, and the effects they affect are queued once each.
//! When the outermost `batch` call returns, the queued work is flushed.
//!
//! # Algorithm
//!
//! While staged writes or queued effects remain:
//!
//! 1. Snapshot and clear the effect queue.
//! 2. Dispose each queued effect's previous cleanup scope.
//! 3. Commit every staged write, in write order.
//! 4. Clear the write queue.
//! 5. Re-run each queued effect. Their writes and the effects those writes
//!    affect land in the queues and are handled by the next iteration.
//!
//! Effects therefore always observe fully committed values, and an effect
//! hit by many writes runs once per iteration.

use std::mem;

use tracing::{error, trace};

use super::runtime::{with_state, EffectId, Runtime};
use crate::error::ReactiveError;

/// Decrements the batch depth on every exit path. If the flush is unwinding
/// out of the outermost batch, the remaining queued work is dropped.
struct DepthGuard;

impl Drop for DepthGuard {
    fn drop(&mut self) {
        let stale = with_state(|state| {
            state.batch_depth -= 1;
            if state.batch_depth == 0 && std::thread::panicking() {
                state.pending_effects.clear();
                Some(mem::take(&mut state.pending_writes))
            } else {
                None
            }
        });
        drop(stale);
    }
}

/// Run `f` as one transaction and flush once the outermost batch returns.
///
/// Nested calls join the enclosing transaction. Returns whatever `f`
/// returns, after the flush has completed.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::{batch, effect, signal};
///
/// let first = signal(1);
/// let second = signal(2);
///
/// effect(move || println!("{}", first.get() + second.get()));
///
/// batch(|| {
///     first.set(10);
///     second.set(20);
/// }); // prints "30" once
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let depth = with_state(|state| {
        state.batch_depth += 1;
        state.batch_depth
    });
    let _guard = DepthGuard;

    let result = f();
    if depth == 1 {
        flush();
    }
    result
}

fn flush() {
    let limit = with_state(|state| state.config.flush_limit);
    let mut iterations = 0;

    loop {
        let queued: Option<Vec<EffectId>> = with_state(|state| {
            if state.pending_effects.is_empty() && state.pending_writes.is_empty() {
                return None;
            }
            Some(mem::take(&mut state.pending_effects).into_iter().collect())
        });
        let Some(queued) = queued else {
            break;
        };

        iterations += 1;
        if iterations > limit {
            let stale = with_state(|state| {
                state.pending_effects.clear();
                mem::take(&mut state.pending_writes)
            });
            drop(stale);
            let err = ReactiveError::FlushLimitExceeded { limit };
            error!(%err, "aborting batch flush");
            panic!("{err}");
        }

        for effect in &queued {
            Runtime::clear_effect_scope(*effect);
        }

        let replaced = with_state(|state| {
            let writes = mem::take(&mut state.pending_writes);
            let mut replaced = Vec::with_capacity(writes.len());
            for (id, value) in writes {
                if let Some(node) = state.signals.get_mut(&id) {
                    trace!(signal = ?id, "committing signal value");
                    replaced.push(mem::replace(&mut node.value, value));
                }
            }
            replaced
        });
        drop(replaced);

        for effect in queued {
            Runtime::run_effect(effect);
        }
    }
}
