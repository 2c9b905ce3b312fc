//! Reference management for kvgit.
//!
//! References are mutable, named pointers to commits. A kvgit repository
//! tracks a single line of history, so in practice there are two refs:
//!
//! - **The branch** (`refs/heads/master`) points at the latest local commit.
//!   Its absence means "no commits yet".
//! - **The remote-tracking ref** (`refs/remotes/origin/master`) records the
//!   remote head as last observed by fetch or push. It is the expected value
//!   for the remote's compare-and-swap on push.
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations
//! - [`types`] -- The [`Ref`] type and canonical names
//! - [`traits`] -- The [`RefStore`] trait defining the storage interface
//! - [`names`] -- Canonical ref name validation
//! - [`memory`] -- In-memory [`InMemoryRefStore`] for tests
//! - [`file`] -- File-backed [`FileRefStore`] with lock-file updates

pub mod error;
pub mod file;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use file::FileRefStore;
pub use memory::InMemoryRefStore;
pub use names::{validate_ref_name, validate_segment};
pub use traits::RefStore;
pub use types::{Ref, DEFAULT_BRANCH, DEFAULT_REMOTE, HEADS_PREFIX, REMOTES_PREFIX};
