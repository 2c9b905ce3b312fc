//! Error types for the index crate.

use kvgit_types::ObjectId;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A tree holds an entry that cannot be turned back into a key.
    #[error("corrupt tree {id}: {reason}")]
    CorruptTree { id: ObjectId, reason: String },

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] kvgit_store::StoreError),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
