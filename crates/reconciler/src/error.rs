//! Error types for the reconciler crate.

use std::path::PathBuf;

use splitter_core::ObjectKey;
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A store call failed.
    #[error("store error: {0}")]
    Store(#[from] splitter_store::Error),

    /// A leaf carries the cluster label but no owner.
    #[error("leaf '{key}' has no owner: label '{label}' is missing or empty")]
    MalformedLeaf { key: ObjectKey, label: String },

    /// The invoking context cancelled the reconcile.
    #[error("reconcile cancelled during {operation}")]
    Cancelled { operation: String },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Configuration file could not be read.
    #[error("failed to read config '{path}': {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    /// Configuration file could not be parsed.
    #[error("failed to parse config '{path}': {reason}")]
    ConfigParse { path: PathBuf, reason: String },
}

impl Error {
    /// Create a malformed leaf error.
    pub fn malformed_leaf(key: ObjectKey, label: impl Into<String>) -> Self {
        Self::MalformedLeaf {
            key,
            label: label.into(),
        }
    }

    /// Create a cancelled error.
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a config read error.
    pub fn config_read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a config parse error.
    pub fn config_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether re-running the reconcile may succeed.
    ///
    /// Store failures and cancellation are retryable; data and configuration
    /// errors are not.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Store(_) | Self::Cancelled { .. } => true,
            Self::MalformedLeaf { .. }
            | Self::InvalidConfig { .. }
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. } => false,
        }
    }

    /// Whether a store call reported a missing object.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }

    /// Whether a store create collided with an existing object.
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_already_exists())
    }

    /// Whether a store write lost an optimistic-concurrency race.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_conflict())
    }
}
