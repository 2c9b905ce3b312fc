//! Reconciliation of the local branch with the remote authority.
//!
//! Two local refs take part:
//!
//! - `refs/heads/master`, the branch the bucket reads and commits on;
//! - `refs/remotes/origin/master`, the remote tip as last observed.
//!
//! `fetch` only moves the tracking ref. `update` fetches and then hard-resets
//! the branch to the tracking ref. `push` asks the remote to move its branch
//! from the tracking value to the local tip; the remote refuses if anyone
//! else pushed in between.

use std::sync::Arc;

use kvgit_index::StagingIndex;
use kvgit_refs::{Ref, RefStore, DEFAULT_BRANCH, DEFAULT_REMOTE};
use kvgit_store::{history, reachable, reachable_set, ObjectStore, ObjectStoreExt};
use kvgit_types::ObjectId;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::negotiation::NegotiationEngine;
use crate::transport::RemoteTransport;
use crate::types::{FetchResult, PushResult, RefUpdate, UpdateResult};

pub struct SyncManager {
    store: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    transport: Box<dyn RemoteTransport>,
    remote: String,
    branch: String,
}

impl std::fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("url", &self.transport.url())
            .field("remote", &self.remote)
            .field("branch", &self.branch)
            .finish()
    }
}

impl SyncManager {
    /// Track the default branch of `transport` as `origin`.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        transport: Box<dyn RemoteTransport>,
    ) -> Self {
        Self {
            store,
            refs,
            transport,
            remote: DEFAULT_REMOTE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        self.transport.url()
    }

    /// Canonical name of the local branch.
    pub fn branch_ref(&self) -> String {
        Ref::branch_name(&self.branch)
    }

    /// Canonical name of the remote-tracking ref.
    pub fn tracking_ref(&self) -> String {
        Ref::remote_name(&self.remote, &self.branch)
    }

    /// Local branch tip.
    pub fn local_head(&self) -> SyncResult<Option<ObjectId>> {
        Ok(self.refs.target(&self.branch_ref())?)
    }

    /// Remote tip as of the last fetch or push.
    pub fn tracking_head(&self) -> SyncResult<Option<ObjectId>> {
        Ok(self.refs.target(&self.tracking_ref())?)
    }

    /// Whether `ancestor` is on the first-parent chain of `head`.
    fn descends_from(&self, head: ObjectId, ancestor: ObjectId) -> SyncResult<bool> {
        let chain = history(self.store.as_ref(), head, usize::MAX)?;
        Ok(chain.iter().any(|(id, _)| *id == ancestor))
    }

    /// Download new objects and move the tracking ref to the remote tip.
    ///
    /// The local branch is never touched.
    pub fn fetch(&self) -> SyncResult<FetchResult> {
        let branch_ref = self.branch_ref();
        let remote_refs = self.transport.list_refs()?;
        let remote_head = remote_refs
            .iter()
            .find(|(name, _)| *name == branch_ref)
            .map(|(_, id)| *id);
        let remote_refs: Vec<(String, ObjectId)> = remote_refs
            .into_iter()
            .filter(|(name, _)| *name == branch_ref)
            .collect();

        let local_refs: Vec<(String, ObjectId)> = self
            .refs
            .list_refs("")?
            .into_iter()
            .map(|(name, r)| (name, r.target()))
            .collect();
        let negotiation = NegotiationEngine::negotiate(&local_refs, &remote_refs);
        let mut wants = Vec::with_capacity(negotiation.wants.len());
        for id in negotiation.wants {
            if !self.store.exists(&id)? {
                wants.push(id);
            }
        }

        let mut result = FetchResult {
            remote_head,
            ..Default::default()
        };
        if !wants.is_empty() {
            let objects = self.transport.fetch_objects(&wants, &negotiation.haves)?;
            self.store.write_batch(&objects)?;
            result.objects_received = objects.len();
            for id in &wants {
                if !self.store.exists(id)? {
                    return Err(SyncError::TransportError(format!(
                        "remote did not send object {id}"
                    )));
                }
            }
        }
        debug!(
            wants = wants.len(),
            haves = negotiation.haves.len(),
            received = result.objects_received,
            "negotiated fetch"
        );

        let tracking = self.tracking_ref();
        let previous = self.refs.target(&tracking)?;
        if previous != remote_head {
            match remote_head {
                Some(id) => self.refs.write_ref(&tracking, &Ref::remote(&self.remote, &self.branch, id))?,
                None => {
                    self.refs.delete_ref(&tracking)?;
                }
            }
            if let Some(new) = remote_head {
                result.refs_updated.push(RefUpdate {
                    name: tracking,
                    old: previous,
                    new,
                });
            }
        }

        info!(
            url = self.url(),
            head = ?remote_head.map(|id| id.short_hex()),
            objects = result.objects_received,
            "fetched"
        );
        Ok(result)
    }

    /// Fetch, then make the local branch an exact copy of the remote tip and
    /// reseed `index` from it.
    ///
    /// Refuses with [`SyncError::ChangesNotCommitted`] while `index` holds
    /// staged changes, unless `force` is set.
    pub fn update(&self, index: &mut StagingIndex, force: bool) -> SyncResult<UpdateResult> {
        if index.has_pending_changes() && !force {
            return Err(SyncError::ChangesNotCommitted);
        }

        let fetch = self.fetch()?;
        let previous_head = self.local_head()?;
        let head = fetch.remote_head;
        let branch_ref = self.branch_ref();
        match head {
            Some(id) => self.refs.write_ref(&branch_ref, &Ref::branch(&self.branch, id))?,
            None => {
                self.refs.delete_ref(&branch_ref)?;
            }
        }

        let baseline = match head {
            Some(id) => Some(self.store.read_commit(&id)?.tree),
            None => None,
        };
        index.seed(baseline);

        info!(
            url = self.url(),
            from = ?previous_head.map(|id| id.short_hex()),
            to = ?head.map(|id| id.short_hex()),
            forced = force,
            "updated from remote"
        );
        Ok(UpdateResult {
            fetch,
            previous_head,
            head,
        })
    }

    /// Send the local branch and any objects the remote lacks.
    ///
    /// One attempt: if the remote's branch moved since the last fetch, or the
    /// local branch does not build on the fetched remote tip, the push fails
    /// with [`SyncError::Rejected`] and nothing local changes.
    pub fn push(&self) -> SyncResult<PushResult> {
        let Some(head) = self.local_head()? else {
            debug!("nothing to push: branch has no commits");
            return Ok(PushResult::default());
        };
        let tracking = self.tracking_head()?;
        if tracking == Some(head) {
            debug!(head = %head.short_hex(), "remote already up to date");
            return Ok(PushResult::default());
        }
        if let Some(observed) = tracking {
            if !self.descends_from(head, observed)? {
                info!(
                    url = self.url(),
                    head = %head.short_hex(),
                    remote = %observed.short_hex(),
                    "push rejected: branch does not build on the remote tip"
                );
                return Err(SyncError::Rejected {
                    name: self.branch_ref(),
                    reason: format!(
                        "local branch does not contain remote tip {}; update first",
                        observed.short_hex()
                    ),
                });
            }
        }

        let known = reachable_set(self.store.as_ref(), &tracking.into_iter().collect::<Vec<_>>())?;
        let ids = reachable(self.store.as_ref(), &[head], &known)?;
        let mut objects = Vec::with_capacity(ids.len());
        for id in &ids {
            objects.push(self.store.read_required(id)?);
        }
        let written = self.transport.push_objects(&objects)?;
        debug!(sent = objects.len(), written, "pushed objects");

        let update = RefUpdate {
            name: self.branch_ref(),
            old: tracking,
            new: head,
        };
        let rejected = self.transport.update_refs(std::slice::from_ref(&update))?;
        if let Some(rejection) = rejected.into_iter().next() {
            info!(url = self.url(), name = %rejection.name, reason = %rejection.reason, "push rejected");
            return Err(SyncError::Rejected {
                name: rejection.name,
                reason: rejection.reason,
            });
        }

        self.refs.write_ref(
            &self.tracking_ref(),
            &Ref::remote(&self.remote, &self.branch, head),
        )?;
        info!(url = self.url(), head = %head.short_hex(), objects = objects.len(), "pushed");
        Ok(PushResult {
            objects_sent: objects.len(),
            refs_updated: vec![update],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalTransport;
    use kvgit_refs::InMemoryRefStore;
    use kvgit_store::{Commit, InMemoryObjectStore, Signature};
    use kvgit_types::{Identity, Key};

    struct Replica {
        store: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
        sync: SyncManager,
        index: StagingIndex,
    }

    impl Replica {
        fn connect(remote: &std::path::Path) -> Self {
            let store: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
            let refs: Arc<dyn RefStore> = Arc::new(InMemoryRefStore::new());
            let transport = LocalTransport::open(&remote.to_string_lossy(), remote).unwrap();
            let sync = SyncManager::new(store.clone(), refs.clone(), Box::new(transport));
            let index = StagingIndex::new(store.clone(), None);
            Self {
                store,
                refs,
                sync,
                index,
            }
        }

        /// Stage `key = value` and commit it on the local branch.
        fn commit(&mut self, key: &str, value: &[u8]) -> ObjectId {
            self.index.stage_set(&Key::parse(key).unwrap(), value).unwrap();
            let tree = self.index.write_tree().unwrap();
            let who = Identity::new("t", "t@t");
            let id = self
                .store
                .write_commit(&Commit {
                    tree,
                    parents: self.sync.local_head().unwrap().into_iter().collect(),
                    author: Signature::new(&who, 0, 0),
                    committer: Signature::new(&who, 0, 0),
                    message: key.into(),
                })
                .unwrap();
            self.refs
                .write_ref(&self.sync.branch_ref(), &Ref::branch(DEFAULT_BRANCH, id))
                .unwrap();
            self.index.seed(Some(tree));
            id
        }

        fn get(&self, key: &str) -> Option<Vec<u8>> {
            self.index.read(&Key::parse(key).unwrap()).unwrap()
        }
    }

    fn remote() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        LocalTransport::init(dir.path()).unwrap();
        dir
    }

    #[test]
    fn push_then_update_elsewhere() {
        let dir = remote();
        let mut a = Replica::connect(dir.path());
        let mut b = Replica::connect(dir.path());

        let head = a.commit("foo", b"bar");
        let pushed = a.sync.push().unwrap();
        assert!(pushed.objects_sent >= 3);
        assert_eq!(a.sync.tracking_head().unwrap(), Some(head));

        assert!(b.get("foo").is_none());
        let updated = b.sync.update(&mut b.index, false).unwrap();
        assert!(updated.changed());
        assert_eq!(b.sync.local_head().unwrap(), Some(head));
        assert_eq!(b.get("foo").as_deref(), Some(&b"bar"[..]));
    }

    #[test]
    fn stale_push_is_rejected() {
        let dir = remote();
        let mut a = Replica::connect(dir.path());
        let mut b = Replica::connect(dir.path());

        let winner = a.commit("foo", b"bar");
        a.sync.push().unwrap();

        b.commit("foo", b"baz");
        let err = b.sync.push().unwrap_err();
        assert!(matches!(err, SyncError::Rejected { .. }));

        b.sync.update(&mut b.index, true).unwrap();
        assert_eq!(b.sync.local_head().unwrap(), Some(winner));
        assert_eq!(b.get("foo").as_deref(), Some(&b"bar"[..]));
    }

    #[test]
    fn fetched_but_not_updated_branch_cannot_rewind_remote() {
        let dir = remote();
        let mut a = Replica::connect(dir.path());
        let mut b = Replica::connect(dir.path());

        let base = b.commit("foo", b"one");
        b.sync.push().unwrap();
        a.sync.update(&mut a.index, false).unwrap();
        let winner = a.commit("foo", b"two");
        a.sync.push().unwrap();

        // b learns about the new tip but its branch still sits on `base`.
        b.sync.fetch().unwrap();
        assert_eq!(b.sync.tracking_head().unwrap(), Some(winner));
        let err = b.sync.push().unwrap_err();
        assert!(matches!(err, SyncError::Rejected { .. }));
        assert_eq!(b.sync.local_head().unwrap(), Some(base));

        b.commit("other", b"b");
        assert!(matches!(b.sync.push(), Err(SyncError::Rejected { .. })));

        let c = Replica::connect(dir.path());
        assert_eq!(c.sync.fetch().unwrap().remote_head, Some(winner));
    }

    #[test]
    fn update_refuses_to_drop_staged_changes() {
        let dir = remote();
        let mut a = Replica::connect(dir.path());
        a.index.stage_set(&Key::parse("k").unwrap(), b"v").unwrap();

        let err = a.sync.update(&mut a.index, false).unwrap_err();
        assert!(matches!(err, SyncError::ChangesNotCommitted));
        assert!(a.index.has_pending_changes());

        a.sync.update(&mut a.index, true).unwrap();
        assert!(!a.index.has_pending_changes());
    }

    #[test]
    fn update_from_empty_remote_resets_to_empty() {
        let dir = remote();
        let mut a = Replica::connect(dir.path());
        a.commit("local", b"only");

        let result = a.sync.update(&mut a.index, false).unwrap();
        assert!(result.head.is_none());
        assert!(a.sync.local_head().unwrap().is_none());
        assert!(a.get("local").is_none());
    }

    #[test]
    fn fetch_moves_only_tracking_ref() {
        let dir = remote();
        let mut a = Replica::connect(dir.path());
        let b = Replica::connect(dir.path());
        let head = a.commit("k", b"v");
        a.sync.push().unwrap();

        let fetched = b.sync.fetch().unwrap();
        assert_eq!(fetched.remote_head, Some(head));
        assert_eq!(fetched.refs_updated.len(), 1);
        assert_eq!(b.sync.tracking_head().unwrap(), Some(head));
        assert!(b.sync.local_head().unwrap().is_none());

        // Nothing new the second time around.
        let again = b.sync.fetch().unwrap();
        assert_eq!(again.objects_received, 0);
        assert!(again.refs_updated.is_empty());
    }

    #[test]
    fn push_sends_only_new_history() {
        let dir = remote();
        let mut a = Replica::connect(dir.path());
        a.commit("one", b"1");
        let first = a.sync.push().unwrap();
        a.commit("two", b"2");
        let second = a.sync.push().unwrap();
        // New commit, new root tree, new blob.
        assert_eq!(second.objects_sent, 3);
        assert!(first.objects_sent >= 3);
        assert!(a.sync.push().unwrap().is_up_to_date());
    }
}
