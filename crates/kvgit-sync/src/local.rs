//! Transport to a repository on the local filesystem.
//!
//! The remote is an ordinary repository directory (`objects/` plus
//! `refs/`). Its [`FileRefStore`] provides the compare-and-swap that makes
//! the first push win, also across processes sharing the directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use kvgit_refs::{FileRefStore, Ref, RefError, RefStore};
use kvgit_store::{reachable, reachable_set, DiskObjectStore, ObjectStore, StoredObject};
use kvgit_types::ObjectId;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteTransport;
use crate::types::{RefRejection, RefUpdate};

const OBJECTS_DIR: &str = "objects";
const REFS_DIR: &str = "refs";

#[derive(Debug)]
pub struct LocalTransport {
    url: String,
    root: PathBuf,
    objects: DiskObjectStore,
    refs: FileRefStore,
}

impl LocalTransport {
    /// Connect to the repository at `root`, reported under `url`.
    pub fn open(url: &str, root: &Path) -> SyncResult<Self> {
        let invalid = |reason: &str| SyncError::InvalidRemote {
            url: url.to_string(),
            reason: reason.to_string(),
        };
        if !root.join(OBJECTS_DIR).is_dir() || !root.join(REFS_DIR).is_dir() {
            return Err(invalid("not a kvgit repository"));
        }
        Ok(Self {
            url: url.to_string(),
            root: root.to_path_buf(),
            objects: DiskObjectStore::open(root.join(OBJECTS_DIR))?,
            refs: FileRefStore::open(root)?,
        })
    }

    /// Create an empty repository skeleton at `root` and connect to it.
    pub fn init(root: &Path) -> SyncResult<Self> {
        DiskObjectStore::init(root.join(OBJECTS_DIR))?;
        FileRefStore::open(root)?;
        Self::open(&root.to_string_lossy(), root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn apply(&self, update: &RefUpdate) -> SyncResult<Option<String>> {
        if !self.objects.exists(&update.new)? {
            return Ok(Some(format!("missing object {}", update.new.short_hex())));
        }
        let Some(branch) = update.name.strip_prefix(kvgit_refs::HEADS_PREFIX) else {
            return Ok(Some("only branch refs can be pushed".into()));
        };
        let new = Ref::branch(branch, update.new);
        match self.refs.compare_and_swap(&update.name, update.old, &new) {
            Ok(true) => Ok(None),
            Ok(false) => Ok(Some("remote ref has moved; fetch first".into())),
            Err(RefError::Locked { .. }) => Ok(Some("ref is locked by another update".into())),
            Err(e) => Err(e.into()),
        }
    }
}

impl RemoteTransport for LocalTransport {
    fn url(&self) -> &str {
        &self.url
    }

    fn list_refs(&self) -> SyncResult<Vec<(String, ObjectId)>> {
        Ok(self
            .refs
            .list_refs(kvgit_refs::HEADS_PREFIX)?
            .into_iter()
            .map(|(name, r)| (name, r.target()))
            .collect())
    }

    fn fetch_objects(&self, wants: &[ObjectId], haves: &[ObjectId]) -> SyncResult<Vec<StoredObject>> {
        let known: HashSet<ObjectId> = reachable_set(&self.objects, haves)?;
        let ids = reachable(&self.objects, wants, &known)?;
        let mut objects = Vec::with_capacity(ids.len());
        for id in &ids {
            let object = self
                .objects
                .read(id)?
                .ok_or_else(|| SyncError::TransportError(format!("remote lost object {id}")))?;
            objects.push(object);
        }
        debug!(url = %self.url, wants = wants.len(), haves = haves.len(), sent = objects.len(), "served fetch");
        Ok(objects)
    }

    fn push_objects(&self, objects: &[StoredObject]) -> SyncResult<usize> {
        let mut written = 0;
        for object in objects {
            if !self.objects.exists(&object.compute_id())? {
                self.objects.write(object)?;
                written += 1;
            }
        }
        debug!(url = %self.url, received = objects.len(), written, "accepted objects");
        Ok(written)
    }

    fn update_refs(&self, updates: &[RefUpdate]) -> SyncResult<Vec<RefRejection>> {
        let mut rejected = Vec::new();
        for update in updates {
            if let Some(reason) = self.apply(update)? {
                debug!(url = %self.url, name = %update.name, %reason, "ref update rejected");
                rejected.push(RefRejection {
                    name: update.name.clone(),
                    reason,
                });
            }
        }
        Ok(rejected)
    }
}
