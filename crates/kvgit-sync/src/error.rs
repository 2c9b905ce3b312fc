use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote refused a ref update (its ref moved since our last fetch).
    #[error("ref rejected: {name}: {reason}")]
    Rejected { name: String, reason: String },

    /// A non-forced update would discard staged changes.
    #[error("staged changes would be lost; commit them or force the update")]
    ChangesNotCommitted,

    #[error("unsupported transport: {0}")]
    UnsupportedTransport(String),

    #[error("invalid remote {url}: {reason}")]
    InvalidRemote { url: String, reason: String },

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("store error: {0}")]
    Store(#[from] kvgit_store::StoreError),

    #[error("ref error: {0}")]
    Refs(#[from] kvgit_refs::RefError),

    #[error("index error: {0}")]
    Index(#[from] kvgit_index::IndexError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
