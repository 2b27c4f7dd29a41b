//! Error types for the reactive core.

use thiserror::Error;

/// Errors surfaced by the reactive core and the list differ.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// The key function mapped two elements of one snapshot to the same key.
    #[error("Duplicate key '{key}'")]
    DuplicateKey { key: String },

    /// A batch flush kept scheduling work past the configured limit.
    #[error("batch flush exceeded {limit} iterations; a write cascade is not settling")]
    FlushLimitExceeded { limit: usize },

    /// The runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ReactiveError {
    /// Build a [`ReactiveError::DuplicateKey`] from a displayable key.
    pub fn duplicate_key<K: std::fmt::Display>(key: &K) -> Self {
        Self::DuplicateKey {
            key: key.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReactiveError>;
