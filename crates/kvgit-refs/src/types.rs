//! Core reference types.

use kvgit_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;

/// Prefix of local branch refs.
pub const HEADS_PREFIX: &str = "refs/heads/";
/// Prefix of remote-tracking refs.
pub const REMOTES_PREFIX: &str = "refs/remotes/";
/// The single tracked branch.
pub const DEFAULT_BRANCH: &str = "master";
/// Name under which the configured remote is tracked.
pub const DEFAULT_REMOTE: &str = "origin";

/// A named pointer to a commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ref {
    /// A local branch; moves on commit, rollback-after-rejection, and update.
    Branch {
        /// Branch name (e.g. "master").
        name: String,
        /// Commit at the tip of the branch.
        target: ObjectId,
    },

    /// A remote-tracking ref; moved only by fetch and push.
    Remote {
        /// Name of the remote (e.g. "origin").
        remote: String,
        /// Branch name on the remote.
        branch: String,
        /// Remote branch tip as last observed.
        target: ObjectId,
    },
}

impl Ref {
    pub fn branch(name: impl Into<String>, target: ObjectId) -> Self {
        Ref::Branch {
            name: name.into(),
            target,
        }
    }

    pub fn remote(remote: impl Into<String>, branch: impl Into<String>, target: ObjectId) -> Self {
        Ref::Remote {
            remote: remote.into(),
            branch: branch.into(),
            target,
        }
    }

    /// Canonical name of the local branch ref `name`.
    pub fn branch_name(name: &str) -> String {
        format!("{HEADS_PREFIX}{name}")
    }

    /// Canonical name of the remote-tracking ref for `remote`/`branch`.
    pub fn remote_name(remote: &str, branch: &str) -> String {
        format!("{REMOTES_PREFIX}{remote}/{branch}")
    }

    /// Rebuild a ref from its canonical name and stored target.
    pub fn from_canonical(name: &str, target: ObjectId) -> Result<Self> {
        validate_ref_name(name)?;
        if let Some(branch) = name.strip_prefix(HEADS_PREFIX) {
            return Ok(Ref::branch(branch, target));
        }
        if let Some(rest) = name.strip_prefix(REMOTES_PREFIX) {
            if let Some((remote, branch)) = rest.split_once('/') {
                return Ok(Ref::remote(remote, branch, target));
            }
        }
        Err(RefError::InvalidRefName {
            name: name.to_string(),
            reason: "expected refs/heads/<branch> or refs/remotes/<remote>/<branch>".into(),
        })
    }

    /// Returns the canonical name for this ref (e.g. "refs/heads/master").
    pub fn canonical_name(&self) -> String {
        match self {
            Ref::Branch { name, .. } => Self::branch_name(name),
            Ref::Remote { remote, branch, .. } => Self::remote_name(remote, branch),
        }
    }

    /// Returns the short name of this ref (without the refs/ prefix).
    pub fn short_name(&self) -> &str {
        match self {
            Ref::Branch { name, .. } => name,
            Ref::Remote { branch, .. } => branch,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Ref::Branch { .. })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Ref::Remote { .. })
    }

    /// The commit this ref points to.
    pub fn target(&self) -> ObjectId {
        match self {
            Ref::Branch { target, .. } | Ref::Remote { target, .. } => *target,
        }
    }
}
