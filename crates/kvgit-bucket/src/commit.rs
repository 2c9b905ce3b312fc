//! Commit engine.
//!
//! Turns the staging index into a commit on the local branch and, when a
//! remote is configured and pushing was requested, publishes it. A refused
//! push is compensated by a forced update: the new commit is dropped from
//! the branch (its objects stay in the store, unreferenced) and the caller
//! gets [`BucketError::CommitFailed`].

use kvgit_index::StagingIndex;
use kvgit_store::{Commit, ObjectStoreExt, Signature};
use kvgit_sync::SyncManager;
use kvgit_types::{Identity, ObjectId};
use tracing::{info, warn};

use crate::error::{BucketError, BucketResult};
use crate::repository::Repository;

/// Message used when none is given.
pub const DEFAULT_MESSAGE: &str = "autocommit";

/// What to commit.
#[derive(Clone, Debug)]
pub struct CommitRequest<V> {
    pub message: String,
    /// Values staged just before committing, on top of what is already staged.
    pub pairs: Vec<(String, V)>,
    pub push: bool,
}

impl<V> CommitRequest<V> {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            pairs: Vec::new(),
            push: true,
        }
    }

    pub fn with_pair(mut self, key: impl Into<String>, value: V) -> Self {
        self.pairs.push((key.into(), value));
        self
    }

    pub fn with_pairs<K: Into<String>>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        self.pairs.extend(pairs.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Commit locally only.
    pub fn without_push(mut self) -> Self {
        self.push = false;
        self
    }
}

impl<V> Default for CommitRequest<V> {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE)
    }
}

/// Result of a successful commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    pub commit_id: ObjectId,
    pub tree_id: ObjectId,
    /// Whether the commit reached the remote.
    pub pushed: bool,
}

/// Signing details applied to every commit.
#[derive(Clone, Debug)]
pub struct CommitEngine<'a> {
    pub repo: &'a Repository,
    pub sync: Option<&'a SyncManager>,
    pub author: &'a Identity,
    pub committer: &'a Identity,
    pub timezone_offset: i32,
}

impl CommitEngine<'_> {
    /// Commit everything staged in `index`.
    pub fn run(&self, index: &mut StagingIndex, message: &str, push: bool) -> BucketResult<CommitOutcome> {
        if !index.has_pending_changes() {
            return Err(BucketError::NothingToCommit);
        }

        let parent = self.repo.head()?;
        let tree_id = index.write_tree()?;
        let commit = Commit {
            tree: tree_id,
            parents: parent.into_iter().collect(),
            author: Signature::now(self.author, self.timezone_offset),
            committer: Signature::now(self.committer, self.timezone_offset),
            message: message.to_string(),
        };
        let commit_id = self.repo.store().write_commit(&commit)?;

        self.repo.set_head(Some(commit_id))?;
        index.seed(Some(tree_id));
        info!(
            commit = %commit_id.short_hex(),
            parent = ?parent.map(|id| id.short_hex()),
            %message,
            "committed"
        );

        let mut outcome = CommitOutcome {
            commit_id,
            tree_id,
            pushed: false,
        };
        let Some(sync) = self.sync.filter(|_| push) else {
            return Ok(outcome);
        };

        match sync.push() {
            Ok(_) => {
                outcome.pushed = true;
                Ok(outcome)
            }
            Err(push_err) => {
                warn!(commit = %commit_id.short_hex(), error = %push_err, "push failed; resetting to remote");
                if let Err(update_err) = sync.update(index, true) {
                    warn!(error = %update_err, "update after failed push failed; restoring previous head");
                    self.repo.set_head(parent)?;
                    index.seed(self.repo.head_tree()?);
                    return Err(update_err.into());
                }
                Err(BucketError::CommitFailed {
                    reason: push_err.to_string(),
                })
            }
        }
    }
}
