//! The staging overlay.
//!
//! [`StagingIndex`] keeps a `BTreeMap<Key, StagedEntry>` of pending changes
//! on top of a baseline tree (the tree of the last loaded commit). Reads
//! consult the overlay first and fall back to the baseline. Nothing here
//! touches refs; the commit engine and sync manager reseed the index after
//! they move the branch.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use kvgit_store::{ObjectStore, ObjectStoreExt};
use kvgit_types::{Key, ObjectId};
use tracing::debug;

use crate::builder::build_tree;
use crate::entry::StagedEntry;
use crate::error::IndexResult;
use crate::resolver::{leaves, resolve_entry};

/// Pending writes and deletes layered over the last loaded snapshot.
pub struct StagingIndex {
    store: Arc<dyn ObjectStore>,
    /// Root tree of the last loaded commit; `None` for an empty history.
    baseline: Option<ObjectId>,
    entries: BTreeMap<Key, StagedEntry>,
    /// Overlay state each write displaced when it cascaded over ancestor
    /// leaves or nested keys, so rolling the write back restores them.
    displaced: BTreeMap<Key, Vec<(Key, Option<StagedEntry>)>>,
}

impl std::fmt::Debug for StagingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingIndex")
            .field("baseline", &self.baseline)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl StagingIndex {
    /// Create an index over `baseline` with nothing staged.
    pub fn new(store: Arc<dyn ObjectStore>, baseline: Option<ObjectId>) -> Self {
        Self {
            store,
            baseline,
            entries: BTreeMap::new(),
            displaced: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn baseline(&self) -> Option<ObjectId> {
        self.baseline
    }

    /// Discard every pending change and adopt `baseline` as the snapshot.
    pub fn seed(&mut self, baseline: Option<ObjectId>) {
        debug!(
            baseline = ?baseline.map(|id| id.short_hex()),
            discarded = self.entries.len(),
            "index reseeded"
        );
        self.baseline = baseline;
        self.entries.clear();
        self.displaced.clear();
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.entries.is_empty()
    }

    /// The pending change for `key`, if one is staged.
    pub fn pending(&self, key: &Key) -> Option<&StagedEntry> {
        self.entries.get(key)
    }

    /// Every pending change, in key order.
    pub fn entries(&self) -> &BTreeMap<Key, StagedEntry> {
        &self.entries
    }

    // ---------------------------------------------------------------
    // Staging
    // ---------------------------------------------------------------

    /// Store `value` as a blob and stage it at `key`.
    ///
    /// A leaf at any ancestor of `key` is staged for removal, as is every
    /// key nested below `key`.
    pub fn stage_set(&mut self, key: &Key, value: &[u8]) -> IndexResult<ObjectId> {
        let object_id = self.store.write_blob(value)?;
        self.forget_displacement(key);

        let mut cascade = Vec::new();
        for ancestor in key.ancestors() {
            if self.read_entry(&ancestor)?.is_some() {
                cascade.push(ancestor);
            }
        }
        for below in self.list(Some(key))? {
            if let Ok(nested) = key.join(&below) {
                cascade.push(nested);
            }
        }

        let mut displaced = Vec::with_capacity(cascade.len());
        for other in cascade {
            let prior = self.entries.get(&other).copied();
            if self.remove_entry(&other)? {
                displaced.push((other, prior));
            }
        }
        if !displaced.is_empty() {
            self.displaced.entry(key.clone()).or_default().extend(displaced);
        }

        self.entries.insert(key.clone(), StagedEntry::write(object_id));
        debug!(key = %key, blob = %object_id.short_hex(), "staged write");
        Ok(object_id)
    }

    /// Stage removal of `key`. Returns `false` when the key is absent both
    /// in the overlay and in the baseline, in which case nothing changes.
    pub fn stage_delete(&mut self, key: &Key) -> IndexResult<bool> {
        self.forget_displacement(key);
        self.remove_entry(key)
    }

    fn remove_entry(&mut self, key: &Key) -> IndexResult<bool> {
        let committed = self.committed_entry(key)?.is_some();
        let pending = self.entries.get(key).copied();

        match (pending, committed) {
            (_, true) => {
                self.entries.insert(key.clone(), StagedEntry::Delete);
            }
            (Some(StagedEntry::Write { .. }), false) => {
                self.entries.remove(key);
            }
            (Some(StagedEntry::Delete), false) | (None, false) => return Ok(false),
        }
        debug!(key = %key, "staged delete");
        Ok(true)
    }

    /// Drop the pending change for `key`, so it reads as last committed.
    ///
    /// Keys the pending write displaced get their earlier overlay state back.
    pub fn rollback_key(&mut self, key: &Key) -> bool {
        self.forget_displacement(key);
        let mut changed = self.entries.remove(key).is_some();
        for (other, prior) in self.displaced.remove(key).unwrap_or_default() {
            match prior {
                Some(entry) => self.entries.insert(other, entry),
                None => self.entries.remove(&other),
            };
            changed = true;
        }
        changed
    }

    /// `key` was touched directly; no earlier write may restore it anymore.
    fn forget_displacement(&mut self, key: &Key) {
        for list in self.displaced.values_mut() {
            list.retain(|(other, _)| other != key);
        }
        self.displaced.retain(|_, list| !list.is_empty());
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Value of `key` with pending changes applied.
    pub fn read(&self, key: &Key) -> IndexResult<Option<Vec<u8>>> {
        match self.read_entry(key)? {
            Some(id) => Ok(Some(self.store.read_blob(&id)?)),
            None => Ok(None),
        }
    }

    /// Value of `key` in the baseline, ignoring pending changes.
    pub fn read_committed(&self, key: &Key) -> IndexResult<Option<Vec<u8>>> {
        match self.committed_entry(key)? {
            Some(id) => Ok(Some(self.store.read_blob(&id)?)),
            None => Ok(None),
        }
    }

    /// Blob id visible at `key` with pending changes applied.
    fn read_entry(&self, key: &Key) -> IndexResult<Option<ObjectId>> {
        match self.entries.get(key) {
            Some(entry) => Ok(entry.object_id()),
            None => self.committed_entry(key),
        }
    }

    /// Blob id of the leaf at `key` in the baseline.
    fn committed_entry(&self, key: &Key) -> IndexResult<Option<ObjectId>> {
        let Some(root) = self.baseline else {
            return Ok(None);
        };
        Ok(resolve_entry(self.store.as_ref(), &root, key)?
            .filter(|e| !e.mode.is_tree())
            .map(|e| e.object_id))
    }

    /// Keys below `prefix` (or all keys), relative to it, in order.
    ///
    /// Both committed and staged keys are included; staged deletions hide
    /// their committed counterparts.
    pub fn list(&self, prefix: Option<&Key>) -> IndexResult<Vec<String>> {
        let mut keys: BTreeSet<String> = BTreeSet::new();

        if let Some(root) = self.baseline {
            let subtree = match prefix {
                None => Some(root),
                Some(p) => resolve_entry(self.store.as_ref(), &root, p)?
                    .filter(|e| e.mode.is_tree())
                    .map(|e| e.object_id),
            };
            if let Some(tree) = subtree {
                keys.extend(leaves(self.store.as_ref(), &tree)?.into_iter().map(|(k, _)| k));
            }
        }

        for (key, entry) in &self.entries {
            let relative = match prefix {
                None => Some(key.as_str()),
                Some(p) => key.strip_prefix(p),
            };
            let Some(relative) = relative else {
                continue;
            };
            if entry.is_delete() {
                keys.remove(relative);
            } else {
                keys.insert(relative.to_string());
            }
        }

        Ok(keys.into_iter().collect())
    }

    // ---------------------------------------------------------------
    // Tree building
    // ---------------------------------------------------------------

    /// Write the tree for the baseline with every pending change applied.
    ///
    /// The index itself is left as is; callers reseed once the new commit
    /// is recorded.
    pub fn write_tree(&self) -> IndexResult<ObjectId> {
        build_tree(self.store.as_ref(), self.baseline, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvgit_store::InMemoryObjectStore;
    use proptest::prelude::*;

    fn key(raw: &str) -> Key {
        Key::parse(raw).unwrap()
    }

    fn make_index() -> StagingIndex {
        StagingIndex::new(Arc::new(InMemoryObjectStore::new()), None)
    }

    /// Commit the current overlay into a new baseline.
    fn settle(idx: &mut StagingIndex) {
        let tree = idx.write_tree().unwrap();
        idx.seed(Some(tree));
    }

    #[test]
    fn new_index_has_no_changes() {
        let idx = make_index();
        assert!(!idx.has_pending_changes());
        assert!(idx.list(None).unwrap().is_empty());
        assert!(idx.read(&key("anything")).unwrap().is_none());
    }

    #[test]
    fn staged_value_is_readable_before_commit() {
        let mut idx = make_index();
        idx.stage_set(&key("foo"), b"bar").unwrap();
        assert!(idx.has_pending_changes());
        assert_eq!(idx.read(&key("foo")).unwrap().as_deref(), Some(&b"bar"[..]));
        assert!(idx.read_committed(&key("foo")).unwrap().is_none());
    }

    #[test]
    fn seed_clears_overlay_and_exposes_baseline() {
        let mut idx = make_index();
        idx.stage_set(&key("foo"), b"bar").unwrap();
        settle(&mut idx);
        assert!(!idx.has_pending_changes());
        assert_eq!(idx.read_committed(&key("foo")).unwrap().as_deref(), Some(&b"bar"[..]));
    }

    #[test]
    fn delete_of_unknown_key_is_noop() {
        let mut idx = make_index();
        assert!(!idx.stage_delete(&key("ghost")).unwrap());
        assert!(!idx.has_pending_changes());
    }

    #[test]
    fn delete_of_pending_only_key_unstages_it() {
        let mut idx = make_index();
        idx.stage_set(&key("tmp"), b"1").unwrap();
        assert!(idx.stage_delete(&key("tmp")).unwrap());
        assert!(!idx.has_pending_changes());
    }

    #[test]
    fn delete_of_committed_key_hides_it() {
        let mut idx = make_index();
        idx.stage_set(&key("k"), b"v").unwrap();
        settle(&mut idx);

        assert!(idx.stage_delete(&key("k")).unwrap());
        assert_eq!(idx.pending(&key("k")), Some(&StagedEntry::Delete));
        assert!(idx.read(&key("k")).unwrap().is_none());
        assert!(idx.read_committed(&key("k")).unwrap().is_some());
        // A second delete changes nothing further.
        assert!(idx.stage_delete(&key("k")).unwrap());
        assert_eq!(idx.entries().len(), 1);
    }

    #[test]
    fn list_strips_prefix() {
        let mut idx = make_index();
        for k in ["foo", "bar", "biz/baz"] {
            idx.stage_set(&key(k), b"").unwrap();
        }
        assert_eq!(idx.list(Some(&key("biz"))).unwrap(), vec!["baz"]);
        assert_eq!(idx.list(None).unwrap(), vec!["bar", "biz/baz", "foo"]);
    }

    #[test]
    fn list_merges_committed_and_staged() {
        let mut idx = make_index();
        idx.stage_set(&key("ns/a"), b"1").unwrap();
        idx.stage_set(&key("ns/b"), b"2").unwrap();
        settle(&mut idx);

        idx.stage_delete(&key("ns/a")).unwrap();
        idx.stage_set(&key("ns/c/d"), b"3").unwrap();
        assert_eq!(idx.list(Some(&key("ns"))).unwrap(), vec!["b", "c/d"]);
        // A leaf is not a prefix.
        assert!(idx.list(Some(&key("ns/b"))).unwrap().is_empty());
    }

    #[test]
    fn rollback_key_restores_committed_value() {
        let mut idx = make_index();
        idx.stage_set(&key("k"), b"old").unwrap();
        settle(&mut idx);

        idx.stage_set(&key("k"), b"new").unwrap();
        assert!(idx.rollback_key(&key("k")));
        assert_eq!(idx.read(&key("k")).unwrap().as_deref(), Some(&b"old"[..]));
        assert!(!idx.rollback_key(&key("k")));
    }

    #[test]
    fn writing_below_leaf_replaces_it() {
        let mut idx = make_index();
        idx.stage_set(&key("a"), b"leaf").unwrap();
        settle(&mut idx);

        idx.stage_set(&key("a/b"), b"nested").unwrap();
        assert!(idx.read(&key("a")).unwrap().is_none());
        settle(&mut idx);
        assert_eq!(idx.list(None).unwrap(), vec!["a/b"]);
    }

    #[test]
    fn writing_over_directory_replaces_it() {
        let mut idx = make_index();
        idx.stage_set(&key("a/x"), b"1").unwrap();
        idx.stage_set(&key("a/y/z"), b"2").unwrap();
        settle(&mut idx);

        idx.stage_set(&key("a"), b"leaf").unwrap();
        assert!(idx.read(&key("a/x")).unwrap().is_none());
        settle(&mut idx);
        assert_eq!(idx.list(None).unwrap(), vec!["a"]);
    }

    #[test]
    fn rollback_restores_keys_a_write_displaced() {
        let mut idx = make_index();
        idx.stage_set(&key("a/x"), b"1").unwrap();
        settle(&mut idx);

        idx.stage_set(&key("a"), b"leaf").unwrap();
        assert_eq!(idx.pending(&key("a/x")), Some(&StagedEntry::Delete));
        assert!(idx.rollback_key(&key("a")));

        assert!(!idx.has_pending_changes());
        assert_eq!(idx.read(&key("a/x")).unwrap().as_deref(), Some(&b"1"[..]));
        assert_eq!(idx.list(None).unwrap(), vec!["a/x"]);
    }

    #[test]
    fn rollback_restores_displaced_pending_write() {
        let mut idx = make_index();
        idx.stage_set(&key("a"), b"leaf").unwrap();
        idx.stage_set(&key("a/b"), b"nested").unwrap();
        assert!(idx.pending(&key("a")).is_none());

        assert!(idx.rollback_key(&key("a/b")));
        assert_eq!(idx.read(&key("a")).unwrap().as_deref(), Some(&b"leaf"[..]));
        assert!(idx.read(&key("a/b")).unwrap().is_none());
    }

    #[test]
    fn direct_write_to_displaced_key_survives_rollback() {
        let mut idx = make_index();
        idx.stage_set(&key("a/x"), b"1").unwrap();
        settle(&mut idx);

        idx.stage_set(&key("a"), b"leaf").unwrap();
        idx.stage_delete(&key("a/x")).unwrap();
        assert!(idx.rollback_key(&key("a")));
        // The explicit delete of `a/x` is not undone by rolling back `a`.
        assert_eq!(idx.pending(&key("a/x")), Some(&StagedEntry::Delete));
    }

    proptest! {
        #[test]
        fn staged_roundtrip(
            segs in prop::collection::vec("[a-z0-9_.-]{1,8}", 1..4),
            value in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let mut idx = make_index();
            let k = Key::parse(&segs.join("/")).unwrap();
            idx.stage_set(&k, &value).unwrap();
            prop_assert_eq!(idx.read(&k).unwrap(), Some(value.clone()));
            settle(&mut idx);
            prop_assert_eq!(idx.read(&k).unwrap(), Some(value));
        }
    }
}
