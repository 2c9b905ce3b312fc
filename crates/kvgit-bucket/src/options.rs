use std::fmt;
use std::path::PathBuf;

use kvgit_sync::Credentials;
use kvgit_types::Identity;

use crate::codec::{Codec, RawCodec};
use crate::config::ConfigSource;

/// Everything needed to open a [`Bucket`](crate::Bucket).
pub struct BucketOptions<C = RawCodec> {
    pub path: PathBuf,
    /// Remote location; must match the configured one for an existing
    /// repository, and triggers a clone into a missing or empty `path`.
    pub remote: Option<String>,
    pub author: Option<Identity>,
    /// Defaults to the author.
    pub committer: Option<Identity>,
    /// Minutes east of UTC recorded on commits.
    pub timezone_offset: Option<i32>,
    pub credentials: Credentials,
    pub codec: C,
    /// Update from the remote right after opening an existing repository.
    pub eager_update: bool,
    /// Where settings absent from the repository config are looked up;
    /// environment and user-global file when unset.
    pub config_source: Option<Box<dyn ConfigSource>>,
}

impl BucketOptions<RawCodec> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            remote: None,
            author: None,
            committer: None,
            timezone_offset: None,
            credentials: Credentials::Anonymous,
            codec: RawCodec,
            eager_update: false,
            config_source: None,
        }
    }
}

impl<C> BucketOptions<C> {
    pub fn remote(mut self, url: impl Into<String>) -> Self {
        self.remote = Some(url.into());
        self
    }

    pub fn author(mut self, identity: impl Into<Identity>) -> Self {
        self.author = Some(identity.into());
        self
    }

    pub fn committer(mut self, identity: impl Into<Identity>) -> Self {
        self.committer = Some(identity.into());
        self
    }

    pub fn timezone_offset(mut self, minutes: i32) -> Self {
        self.timezone_offset = Some(minutes);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn eager_update(mut self, enabled: bool) -> Self {
        self.eager_update = enabled;
        self
    }

    pub fn config_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.config_source = Some(Box::new(source));
        self
    }

    /// Switch to another value codec.
    pub fn codec<D: Codec>(self, codec: D) -> BucketOptions<D> {
        BucketOptions {
            path: self.path,
            remote: self.remote,
            author: self.author,
            committer: self.committer,
            timezone_offset: self.timezone_offset,
            credentials: self.credentials,
            codec,
            eager_update: self.eager_update,
            config_source: self.config_source,
        }
    }
}

impl<C> fmt::Debug for BucketOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketOptions")
            .field("path", &self.path)
            .field("remote", &self.remote)
            .field("author", &self.author)
            .field("committer", &self.committer)
            .field("timezone_offset", &self.timezone_offset)
            .field("credentials", &self.credentials)
            .field("eager_update", &self.eager_update)
            .finish_non_exhaustive()
    }
}
