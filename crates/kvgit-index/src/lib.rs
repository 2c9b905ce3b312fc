//! Staging index for kvgit.
//!
//! Holds pending key writes and deletes on top of the last loaded snapshot,
//! resolves keys through nested trees, and turns the staged state into a new
//! root tree at commit time.
//!
//! # Key Types
//!
//! - [`StagingIndex`] -- The in-memory overlay (BTreeMap-backed)
//! - [`StagedEntry`] -- A pending write or deletion
//! - [`resolve`] / [`resolve_entry`] -- Key lookup against a tree
//! - [`build_tree`] -- Bottom-up tree construction with subtree sharing

pub mod builder;
pub mod entry;
pub mod error;
pub mod index;
pub mod resolver;

pub use builder::build_tree;
pub use entry::StagedEntry;
pub use error::{IndexError, IndexResult};
pub use index::StagingIndex;
pub use resolver::{leaves, resolve, resolve_entry};
