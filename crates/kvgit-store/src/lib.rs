//! Content-addressed object storage for kvgit.
//!
//! This crate implements a hash-keyed object store analogous to git's
//! `.git/objects/` directory. Every value, every level of the key namespace,
//! and every snapshot is stored as an immutable object identified by its
//! BLAKE3 hash (domain-separated by object kind).
//!
//! # Object Types
//!
//! - [`Blob`] -- one value's raw bytes
//! - [`Tree`] -- one level of the key namespace, mapping segments to objects
//! - [`Commit`] -- a snapshot: root tree, parent, authorship, message
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- process-memory store for tests and embedding
//! - [`DiskObjectStore`] -- compressed loose objects under a repository directory
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Write-then-link: write objects first, then move refs.
//! 3. The store never interprets object contents on write.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod disk;
pub mod error;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;
pub mod walk;

pub use disk::DiskObjectStore;
pub use error::{StoreError, StoreResult};
pub use hasher::ContentHasher;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryMode, ObjectKind, Signature, StoredObject, Tree, TreeEntry};
pub use traits::{ObjectStore, ObjectStoreExt};
pub use walk::{history, reachable, reachable_set};
