use std::collections::BTreeMap;
use std::sync::RwLock;

use kvgit_types::ObjectId;

use crate::error::StoreResult;
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// Object store kept entirely in process memory.
///
/// Backs replicas in tests and short-lived buckets that never touch disk.
/// Ids are kept ordered so listings are deterministic.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<ObjectId, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored id, in ascending order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.read().expect("lock poisoned").keys().copied().collect()
    }

    /// Number of stored objects of `kind`.
    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .filter(|obj| obj.kind == kind)
            .count()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        Ok(self.objects.read().expect("lock poisoned").get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let mut objects = self.objects.write().expect("lock poisoned");
        if !objects.contains_key(&id) {
            objects.insert(id, object.clone());
        }
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.objects.read().expect("lock poisoned").contains_key(id))
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.objects.write().expect("lock poisoned").remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore").field("objects", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Commit, EntryMode, Signature, Tree, TreeEntry};
    use crate::traits::ObjectStoreExt;
    use crate::StoreError;
    use kvgit_types::Identity;

    #[test]
    fn identical_values_share_one_blob() {
        let store = InMemoryObjectStore::new();
        let a = store.write_blob(b"same").unwrap();
        let b = store.write_blob(b"same").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(store.read_blob(&a).unwrap(), b"same");
    }

    #[test]
    fn tree_id_ignores_insertion_order() {
        let store = InMemoryObjectStore::new();
        let x = store.write_blob(b"x").unwrap();
        let y = store.write_blob(b"y").unwrap();
        let forward = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "a", x),
            TreeEntry::new(EntryMode::Regular, "b", y),
        ]);
        let backward = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "b", y),
            TreeEntry::new(EntryMode::Regular, "a", x),
        ]);
        assert_eq!(store.write_tree(&forward).unwrap(), store.write_tree(&backward).unwrap());
        assert_eq!(store.count(ObjectKind::Tree), 1);
    }

    #[test]
    fn commit_roundtrip() {
        let store = InMemoryObjectStore::new();
        let tree = store.write_tree(&Tree::empty()).unwrap();
        let who = Identity::new("t", "t@t");
        let commit = Commit {
            tree,
            parents: vec![],
            author: Signature::new(&who, 1_700_000_000, 60),
            committer: Signature::new(&who, 1_700_000_000, 60),
            message: "init".into(),
        };
        let id = store.write_commit(&commit).unwrap();
        assert_eq!(store.read_commit(&id).unwrap(), commit);
        assert_eq!(store.count(ObjectKind::Commit), 1);
    }

    #[test]
    fn typed_reads_check_kind() {
        let store = InMemoryObjectStore::new();
        let id = store.write_blob(b"leaf").unwrap();
        assert!(matches!(store.read_tree(&id), Err(StoreError::CorruptObject { .. })));
        assert!(matches!(store.read_commit(&id), Err(StoreError::CorruptObject { .. })));

        let missing = ObjectId::from_bytes(b"missing");
        assert!(store.read(&missing).unwrap().is_none());
        assert!(matches!(store.read_blob(&missing), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_then_ids() {
        let store = InMemoryObjectStore::new();
        let ids: Vec<_> = [b"c", b"a", b"b"].iter().map(|d| store.write_blob(*d).unwrap()).collect();
        assert!(store.delete(&ids[0]).unwrap());
        assert!(!store.delete(&ids[0]).unwrap());

        let listed = store.ids();
        assert_eq!(listed.len(), 2);
        assert!(listed.windows(2).all(|w| w[0] < w[1]));
        assert!(!store.exists(&ids[0]).unwrap());
    }
}
