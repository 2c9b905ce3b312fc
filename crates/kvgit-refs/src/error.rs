//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The ref name is not a valid canonical name.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidRefName { name: String, reason: String },

    /// A ref was written under a name that does not match its kind.
    #[error("ref name {name} does not match ref {expected}")]
    NameMismatch { name: String, expected: String },

    /// Another writer holds the ref lock.
    #[error("ref is locked: {name}")]
    Locked { name: String },

    /// The stored ref could not be parsed.
    #[error("corrupt ref {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
