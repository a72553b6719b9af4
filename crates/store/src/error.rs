//! Error types for the store crate.

use std::fmt;

use splitter_core::ObjectKey;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Store operations, used to label errors and inject faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    List,
    Create,
    Update,
    UpdateStatus,
    ListClusters,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "get",
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::UpdateStatus => "update_status",
            Self::ListClusters => "list_clusters",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Store error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The object does not exist.
    #[error("object '{key}' not found")]
    NotFound { key: ObjectKey },

    /// An object with the same key already exists.
    #[error("object '{key}' already exists")]
    AlreadyExists { key: ObjectKey },

    /// The object changed since it was read.
    #[error("conflict on '{key}': expected resource version '{expected}', found '{actual}'")]
    Conflict {
        key: ObjectKey,
        expected: String,
        actual: String,
    },

    /// The object was rejected as written.
    #[error("invalid object '{key}': {reason}")]
    Invalid { key: ObjectKey, reason: String },

    /// The store could not serve the request.
    #[error("store operation '{operation}' failed: {reason}")]
    Unavailable { operation: Operation, reason: String },
}

impl Error {
    /// Create a not found error.
    pub const fn not_found(key: ObjectKey) -> Self {
        Self::NotFound { key }
    }

    /// Create an already exists error.
    pub const fn already_exists(key: ObjectKey) -> Self {
        Self::AlreadyExists { key }
    }

    /// Create a conflict error.
    pub fn conflict(key: ObjectKey, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Conflict {
            key,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid object error.
    pub fn invalid(key: ObjectKey, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(operation: Operation, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            operation,
            reason: reason.into(),
        }
    }

    /// Whether the target object does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether a create collided with an existing object.
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Whether an update lost an optimistic-concurrency race.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
