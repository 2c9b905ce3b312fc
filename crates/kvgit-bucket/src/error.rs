use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("invalid key: {0}")]
    InvalidKey(#[from] kvgit_types::TypeError),

    #[error("{} is not empty and holds no repository", .0.display())]
    NoRepository(PathBuf),

    #[error("remote mismatch: requested {requested}, repository has {}", .configured.as_deref().unwrap_or("no remote"))]
    RemoteMismatch {
        requested: String,
        configured: Option<String>,
    },

    #[error("no remote configured")]
    NoRemote,

    #[error("staged changes would be lost; commit them or force the update")]
    ChangesNotCommitted,

    #[error("nothing to commit")]
    NothingToCommit,

    /// The push was refused; local state now mirrors the remote and the
    /// staged writes must be replayed.
    #[error("commit failed: {reason}")]
    CommitFailed { reason: String },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] kvgit_store::StoreError),

    #[error("ref error: {0}")]
    Refs(#[from] kvgit_refs::RefError),

    #[error("index error: {0}")]
    Index(#[from] kvgit_index::IndexError),

    #[error("sync error: {0}")]
    Sync(kvgit_sync::SyncError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<kvgit_sync::SyncError> for BucketError {
    fn from(err: kvgit_sync::SyncError) -> Self {
        match err {
            kvgit_sync::SyncError::ChangesNotCommitted => Self::ChangesNotCommitted,
            other => Self::Sync(other),
        }
    }
}

pub type BucketResult<T> = Result<T, BucketError>;
