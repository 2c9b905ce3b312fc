//! Foundation types for kvgit.
//!
//! This crate provides the identifier, key, and identity types shared by
//! every other kvgit crate.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash)
//! - [`Key`] -- A validated, slash-delimited key path
//! - [`Identity`] -- Name/contact pair used for commit authorship

pub mod error;
pub mod identity;
pub mod key;
pub mod object;

pub use error::TypeError;
pub use identity::Identity;
pub use key::{Key, SEPARATOR};
pub use object::ObjectId;
