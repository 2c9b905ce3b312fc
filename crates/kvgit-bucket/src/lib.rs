//! Versioned key-value buckets for kvgit.
//!
//! This is the main entry point for applications embedding kvgit. A
//! [`Bucket`] maps slash-separated keys to values, stages writes in memory,
//! records them as commits in a local repository, and publishes them to a
//! remote where the first writer to push wins.
//!
//! ```no_run
//! use kvgit_bucket::{Bucket, BucketOptions, Utf8Codec};
//!
//! # fn main() -> kvgit_bucket::BucketResult<()> {
//! let mut bucket = Bucket::open(
//!     BucketOptions::new("/var/lib/app/state")
//!         .remote("/srv/state")
//!         .codec(Utf8Codec),
//! )?;
//! bucket.set("settings/theme", &"dark".to_string())?;
//! bucket.commit("switch theme")?;
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod codec;
pub mod commit;
pub mod config;
pub mod error;
pub mod options;
pub mod repository;


pub use bucket::Bucket;
pub use codec::{Codec, CodecError, FnCodec, JsonCodec, RawCodec, Utf8Codec};
pub use commit::{CommitOutcome, CommitRequest, DEFAULT_MESSAGE};
pub use config::{ConfigChain, ConfigSource, EnvSource, RepoConfig, TomlFileSource};
pub use error::{BucketError, BucketResult};
pub use options::BucketOptions;
pub use repository::Repository;

// Re-export key types
pub use kvgit_store::Commit;
pub use kvgit_sync::{Credentials, FetchResult, PushResult, UpdateResult};
pub use kvgit_types::{Identity, Key, ObjectId};
