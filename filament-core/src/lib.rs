//! Filament Core
//!
//! This crate provides the core runtime for the Filament reactive UI
//! framework. It implements:
//!
//! - Reactive primitives (signals, memos, effects)
//! - An ownership tree of scopes with cleanups and context values
//! - Transactional batching of writes
//! - A keyed array differ and list reconciler
//!
//! The runtime is single-threaded: every thread gets its own reactive graph,
//! and handles are only meaningful on the thread that created them.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `list`: Keyed array diffing and the `for_each` reconciler
//! - `render`: The `Renderer` backend trait and an in-memory backend
//! - `config`: Runtime tuning
//! - `error`: The crate error type
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use filament_core::reactive::{effect, memo, signal};
//!
//! // Create a signal
//! let count = signal(0);
//!
//! // Create a derived value
//! let doubled = memo(move || count.get() * 2);
//!
//! // Create an effect
//! let seen = Rc::new(Cell::new(0));
//! let seen_effect = seen.clone();
//! effect(move || seen_effect.set(doubled.get()));
//!
//! // Update the signal
//! count.set(5);
//! // Effect automatically re-ran with the new value
//! assert_eq!(seen.get(), 10);
//! ```

pub mod config;
pub mod error;
pub mod list;
pub mod reactive;
pub mod render;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
