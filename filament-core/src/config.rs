//! Runtime Configuration
//!
//! Tunables for the per-thread reactive runtime. Configuration is plain data
//! and can be loaded from JSON, which is how host applications usually ship it.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for a thread's reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum number of flush-loop iterations an outermost batch may run
    /// before the cascade is considered runaway.
    pub flush_limit: usize,

    /// Detach effects that, after their first run, read no signal and
    /// registered no cleanup. Such effects can never run again.
    pub prune_inert_effects: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flush_limit: 10_000,
            prune_inert_effects: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
