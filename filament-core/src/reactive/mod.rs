//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, effects,
//! memos, scopes, batches, and context values. These primitives form the
//! foundation of Filament's fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (an effect), the signal automatically registers
//! that effect as a listener. When the signal's value changes, all
//! listeners are re-run.
//!
//! ## Effects
//!
//! An Effect is a computation that re-runs whenever a signal it read during
//! its last run changes. Effects synchronize reactive state with the outside
//! world, such as a rendered node tree.
//!
//! ## Scopes
//!
//! Every signal, effect, and cleanup belongs to a scope. Scopes form a tree;
//! disposing a scope disposes everything beneath it, so nothing keeps
//! listening after its owner is gone.
//!
//! ## Batches
//!
//! Writes are transactional. Inside `batch` they are staged, and effects run
//! once after the outermost batch returns.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to automatically
//! detect dependencies. When a signal is read, we check if there is an active
//! tracking context and, if so, register the dependency.
//!
//! This approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") is used by SolidJS, Vue 3, and Leptos.

mod batch;
mod context;
mod effect;
mod memo;
mod provider;
mod runtime;
mod scope;
mod signal;

pub use batch::batch;
pub use context::ReactiveContext;
pub use effect::{effect, effect_with, Effect, EffectOptions};
pub use memo::memo;
pub use provider::{use_context, Context};
pub use runtime::{ContextId, EffectId, Runtime, ScopeId, SignalId};
pub use scope::{
    cleanup, create_subscope, current_scope, on_cleanup, root_scope, subscope, subscope_with,
    untrack, Scope, ScopeDisposer, SubscopeOptions,
};
pub use signal::{signal, ReadSignal, Signal, WriteOptions, WriteSignal};
