//! Remote synchronization for kvgit.
//!
//! Provides fetch, update (fetch plus hard reset), and push between a local
//! repository and a remote authority. Concurrency between writers is settled
//! entirely by the remote's compare-and-swap on its branch ref: the first
//! push wins and every later push based on stale state is rejected.

pub mod credentials;
pub mod error;
pub mod local;
pub mod manager;
pub mod negotiation;
pub mod transport;
pub mod types;

pub use credentials::Credentials;
pub use error::{SyncError, SyncResult};
pub use local::LocalTransport;
pub use manager::SyncManager;
pub use negotiation::NegotiationEngine;
pub use transport::{open_transport, RemoteTransport};
pub use types::{FetchResult, Negotiation, PushResult, RefRejection, RefUpdate, UpdateResult};
