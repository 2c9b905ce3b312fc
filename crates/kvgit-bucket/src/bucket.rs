//! The bucket façade.
//!
//! A [`Bucket`] owns one repository directory, its staging index, and (when
//! a remote is configured) a [`SyncManager`]. Keys are validated and values
//! run through the bucket's codec before anything reaches the index.

use kvgit_index::StagingIndex;
use kvgit_store::{history, Commit};
use kvgit_sync::{open_transport, FetchResult, PushResult, SyncManager, UpdateResult};
use kvgit_types::{Identity, Key, ObjectId};
use tracing::{debug, info};

use crate::codec::{Codec, RawCodec};
use crate::commit::{CommitEngine, CommitOutcome, CommitRequest};
use crate::config::{check_timezone_offset, lookup_timezone_offset, resolve_identity, ConfigChain};
use crate::error::{BucketError, BucketResult};
use crate::options::BucketOptions;
use crate::repository::Repository;

/// A versioned key-value store backed by a local repository.
///
/// Writes are staged in memory until [`Bucket::commit`]. With a remote,
/// each commit is pushed; if another writer got there first the commit is
/// discarded, local state is reset to the remote, and the commit fails with
/// [`BucketError::CommitFailed`].
///
/// A bucket is not meant to be shared between threads; use one instance per
/// writer.
pub struct Bucket<C: Codec = RawCodec> {
    repo: Repository,
    index: StagingIndex,
    sync: Option<SyncManager>,
    codec: C,
    author: Identity,
    committer: Identity,
    timezone_offset: i32,
}

impl<C: Codec> std::fmt::Debug for Bucket<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("path", &self.repo.root())
            .field("remote", &self.remote())
            .field("index", &self.index)
            .field("author", &self.author)
            .finish_non_exhaustive()
    }
}

impl<C: Codec> Bucket<C> {
    /// Open the bucket at `options.path`.
    ///
    /// - An existing repository is opened; a requested remote must equal the
    ///   configured one.
    /// - A missing or empty directory is cloned from the requested remote, or
    ///   initialized empty without one.
    /// - Anything else fails with [`BucketError::NoRepository`].
    pub fn open(options: BucketOptions<C>) -> BucketResult<Self> {
        let BucketOptions {
            path,
            remote,
            author,
            committer,
            timezone_offset,
            credentials,
            codec,
            eager_update,
            config_source,
        } = options;
        let explicit_offset = timezone_offset.map(check_timezone_offset).transpose()?;

        let (repo, clone) = if Repository::is_repository(&path) {
            let repo = Repository::open(&path)?;
            if let Some(requested) = remote.as_deref() {
                if repo.remote_url() != Some(requested) {
                    return Err(BucketError::RemoteMismatch {
                        requested: requested.to_string(),
                        configured: repo.remote_url().map(str::to_string),
                    });
                }
            }
            (repo, false)
        } else if Repository::is_vacant(&path)? {
            (Repository::init(&path, remote.as_deref())?, remote.is_some())
        } else {
            return Err(BucketError::NoRepository(path));
        };

        let mut sync = None;
        if let Some(url) = repo.remote_url().map(str::to_string) {
            match open_transport(&url, &credentials) {
                Ok(transport) => sync = Some(SyncManager::new(repo.store(), repo.refs(), transport)),
                Err(e) if clone => {
                    repo.discard()?;
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut index = StagingIndex::new(repo.store(), repo.head_tree()?);
        if let Some(sync) = sync.as_ref() {
            if clone {
                if let Err(e) = sync.update(&mut index, true) {
                    repo.discard()?;
                    return Err(e.into());
                }
                info!(path = %path.display(), remote = sync.url(), "cloned");
            } else if eager_update {
                sync.update(&mut index, false)?;
            }
        }

        let ambient = config_source.unwrap_or_else(|| Box::new(ConfigChain::ambient()));
        let source = ConfigChain::new().with(repo.config().clone()).with(ambient);
        let author = resolve_identity(author, &source);
        let committer = committer.unwrap_or_else(|| author.clone());
        let timezone_offset = match explicit_offset {
            Some(minutes) => minutes,
            None => lookup_timezone_offset(&source)?.unwrap_or(0),
        };

        debug!(path = %path.display(), %author, %committer, timezone_offset, "opened bucket");
        Ok(Self {
            repo,
            index,
            sync,
            codec,
            author,
            committer,
            timezone_offset,
        })
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Value of `key`, including staged changes.
    pub fn get(&self, key: &str) -> BucketResult<Option<C::Value>> {
        self.lookup(key, true)
    }

    /// Value of `key` as of the last commit.
    pub fn get_committed(&self, key: &str) -> BucketResult<Option<C::Value>> {
        self.lookup(key, false)
    }

    /// Value of `key`; with `staged`, a pending write or delete takes
    /// precedence over the committed value.
    pub fn lookup(&self, key: &str, staged: bool) -> BucketResult<Option<C::Value>> {
        let key = Key::parse(key)?;
        let bytes = if staged {
            self.index.read(&key)?
        } else {
            self.index.read_committed(&key)?
        };
        match bytes {
            Some(bytes) => Ok(Some(self.codec.decode(bytes)?)),
            None => Ok(None),
        }
    }

    /// Value of `key`, or `default` when absent.
    pub fn get_or(&self, key: &str, default: C::Value) -> BucketResult<C::Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Value of `key`, failing with [`BucketError::KeyNotFound`] when absent.
    pub fn get_required(&self, key: &str) -> BucketResult<C::Value> {
        self.get(key)?
            .ok_or_else(|| BucketError::KeyNotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> BucketResult<bool> {
        let key = Key::parse(key)?;
        Ok(self.index.read(&key)?.is_some())
    }

    /// Keys below `prefix` with the prefix stripped, or every key.
    pub fn list(&self, prefix: Option<&str>) -> BucketResult<Vec<String>> {
        let prefix = prefix.map(Key::parse).transpose()?;
        Ok(self.index.list(prefix.as_ref())?)
    }

    // ---------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------

    /// Stage `value` at `key`.
    pub fn set(&mut self, key: &str, value: &C::Value) -> BucketResult<()> {
        let key = Key::parse(key)?;
        let bytes = self.codec.encode(value)?;
        self.index.stage_set(&key, &bytes)?;
        Ok(())
    }

    /// Stage removal of `key`. Returns `false` if the key did not exist.
    pub fn delete(&mut self, key: &str) -> BucketResult<bool> {
        let key = Key::parse(key)?;
        Ok(self.index.stage_delete(&key)?)
    }

    pub fn has_pending_changes(&self) -> bool {
        self.index.has_pending_changes()
    }

    /// Discard the staged change to `key`, or every staged change.
    pub fn rollback(&mut self, key: Option<&str>) -> BucketResult<()> {
        match key {
            Some(key) => {
                let key = Key::parse(key)?;
                self.index.rollback_key(&key);
            }
            None => self.index.seed(self.repo.head_tree()?),
        }
        Ok(())
    }

    /// Commit staged changes and push them if a remote is configured.
    pub fn commit(&mut self, message: &str) -> BucketResult<CommitOutcome> {
        self.commit_with(CommitRequest::new(message))
    }

    /// Stage `request.pairs`, then commit everything staged.
    ///
    /// Every pair is parsed and encoded before any is staged, so a bad key
    /// or value leaves the index untouched.
    pub fn commit_with(&mut self, request: CommitRequest<C::Value>) -> BucketResult<CommitOutcome> {
        let staged = request
            .pairs
            .iter()
            .map(|(key, value)| Ok((Key::parse(key)?, self.codec.encode(value)?)))
            .collect::<BucketResult<Vec<_>>>()?;
        for (key, bytes) in &staged {
            self.index.stage_set(key, bytes)?;
        }
        let engine = CommitEngine {
            repo: &self.repo,
            sync: self.sync.as_ref(),
            author: &self.author,
            committer: &self.committer,
            timezone_offset: self.timezone_offset,
        };
        engine.run(&mut self.index, &request.message, request.push)
    }

    // ---------------------------------------------------------------
    // Sync
    // ---------------------------------------------------------------

    fn sync(&self) -> BucketResult<&SyncManager> {
        self.sync.as_ref().ok_or(BucketError::NoRemote)
    }

    /// Download the remote's state without touching the local branch.
    pub fn fetch(&self) -> BucketResult<FetchResult> {
        Ok(self.sync()?.fetch()?)
    }

    /// Reset local state to the remote's. Fails with
    /// [`BucketError::ChangesNotCommitted`] if changes are staged, unless
    /// `force` is set.
    pub fn update(&mut self, force: bool) -> BucketResult<UpdateResult> {
        let sync = self.sync.as_ref().ok_or(BucketError::NoRemote)?;
        Ok(sync.update(&mut self.index, force)?)
    }

    /// Push the local branch. A rejection is returned as is; nothing local
    /// changes.
    pub fn push(&self) -> BucketResult<PushResult> {
        Ok(self.sync()?.push()?)
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn head(&self) -> BucketResult<Option<ObjectId>> {
        self.repo.head()
    }

    /// Up to `limit` commits from the branch tip, newest first.
    pub fn history(&self, limit: usize) -> BucketResult<Vec<(ObjectId, Commit)>> {
        match self.repo.head()? {
            Some(head) => Ok(history(self.repo.store().as_ref(), head, limit)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn remote(&self) -> Option<&str> {
        self.repo.remote_url()
    }

    pub fn path(&self) -> &std::path::Path {
        self.repo.root()
    }

    pub fn author(&self) -> &Identity {
        &self.author
    }

    pub fn committer(&self) -> &Identity {
        &self.committer
    }

    pub fn timezone_offset(&self) -> i32 {
        self.timezone_offset
    }
}
