//! Core error types for the policy data model.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for parsing identifiers and selectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid label selector '{input}': {reason}")]
    InvalidSelector { input: String, reason: String },

    #[error("invalid object key '{input}': {reason}")]
    InvalidKey { input: String, reason: String },
}

impl Error {
    /// Create an invalid selector error.
    pub fn invalid_selector(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid key error.
    pub fn invalid_key(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_selector("owned-by", "missing '='");
        assert!(err.to_string().contains("owned-by"));
        assert!(err.to_string().contains("missing '='"));
    }
}
