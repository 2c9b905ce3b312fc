//! Object graph traversal.
//!
//! History is a DAG addressed by hash (commit → tree + parents, tree →
//! children), so a plain iterative walk with a visited set terminates.

use std::collections::HashSet;

use kvgit_types::ObjectId;

use crate::error::StoreResult;
use crate::object::{Commit, ObjectKind, Tree};
use crate::traits::{ObjectStore, ObjectStoreExt};

/// Collect every object reachable from `roots`, skipping anything in
/// `exclude`.
///
/// Objects in `exclude` are assumed to bring their own closure with them, so
/// the walk does not descend into them. A missing object is an error.
pub fn reachable<S: ObjectStore + ?Sized>(
    store: &S,
    roots: &[ObjectId],
    exclude: &HashSet<ObjectId>,
) -> StoreResult<Vec<ObjectId>> {
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut order = Vec::new();
    let mut stack: Vec<ObjectId> = roots.to_vec();

    while let Some(id) = stack.pop() {
        if exclude.contains(&id) || !seen.insert(id) {
            continue;
        }
        let object = store.read_required(&id)?;
        match object.kind {
            ObjectKind::Blob => {}
            ObjectKind::Tree => {
                let tree = Tree::from_stored_object(object)?;
                stack.extend(tree.entries.iter().map(|e| e.object_id));
            }
            ObjectKind::Commit => {
                let commit = Commit::from_stored_object(object)?;
                stack.push(commit.tree);
                stack.extend(commit.parents.iter().copied());
            }
        }
        order.push(id);
    }

    Ok(order)
}

/// Closure of those `roots` that exist in `store`; absent roots are ignored.
pub fn reachable_set<S: ObjectStore + ?Sized>(
    store: &S,
    roots: &[ObjectId],
) -> StoreResult<HashSet<ObjectId>> {
    let mut present = Vec::with_capacity(roots.len());
    for root in roots {
        if store.exists(root)? {
            present.push(*root);
        }
    }
    Ok(reachable(store, &present, &HashSet::new())?
        .into_iter()
        .collect())
}

/// Walk first-parent history from `head`, newest first, up to `limit` commits.
pub fn history<S: ObjectStore + ?Sized>(
    store: &S,
    head: ObjectId,
    limit: usize,
) -> StoreResult<Vec<(ObjectId, Commit)>> {
    let mut out = Vec::new();
    let mut next = Some(head);
    while let Some(id) = next {
        if out.len() >= limit {
            break;
        }
        let commit = store.read_commit(&id)?;
        next = commit.parent();
        out.push((id, commit));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectStore;
    use crate::object::{EntryMode, Signature, TreeEntry};
    use crate::StoreError;
    use kvgit_types::Identity;

    fn commit(store: &InMemoryObjectStore, tree: ObjectId, parent: Option<ObjectId>) -> ObjectId {
        let who = Identity::new("t", "t@t");
        store
            .write_commit(&Commit {
                tree,
                parents: parent.into_iter().collect(),
                author: Signature::new(&who, 0, 0),
                committer: Signature::new(&who, 0, 0),
                message: "m".into(),
            })
            .unwrap()
    }

    fn single_key_tree(store: &InMemoryObjectStore, name: &str, value: &[u8]) -> (ObjectId, ObjectId) {
        let blob = store.write_blob(value).unwrap();
        let inner = store
            .write_tree(&Tree::new(vec![TreeEntry::new(EntryMode::Regular, name, blob)]))
            .unwrap();
        let root = store
            .write_tree(&Tree::new(vec![TreeEntry::new(EntryMode::Directory, "ns", inner)]))
            .unwrap();
        (root, blob)
    }

    #[test]
    fn reachable_covers_commit_tree_and_blobs() {
        let store = InMemoryObjectStore::new();
        let (root, blob) = single_key_tree(&store, "k", b"v");
        let c1 = commit(&store, root, None);

        let ids = reachable(&store, &[c1], &HashSet::new()).unwrap();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], c1);
        assert!(ids.contains(&blob));
    }

    #[test]
    fn exclude_stops_at_known_history() {
        let store = InMemoryObjectStore::new();
        let (root1, _) = single_key_tree(&store, "k", b"v1");
        let c1 = commit(&store, root1, None);
        let (root2, blob2) = single_key_tree(&store, "k", b"v2");
        let c2 = commit(&store, root2, Some(c1));

        let known = reachable_set(&store, &[c1]).unwrap();
        let missing = reachable(&store, &[c2], &known).unwrap();
        assert_eq!(missing.len(), 4);
        assert!(missing.contains(&blob2));
        assert!(!missing.contains(&c1));
    }

    #[test]
    fn reachable_set_ignores_absent_roots() {
        let store = InMemoryObjectStore::new();
        let set = reachable_set(&store, &[ObjectId::from_bytes(b"elsewhere")]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn dangling_reference_is_an_error() {
        let store = InMemoryObjectStore::new();
        let c = commit(&store, ObjectId::from_bytes(b"no tree"), None);
        let err = reachable(&store, &[c], &HashSet::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn history_follows_parents_newest_first() {
        let store = InMemoryObjectStore::new();
        let empty = store.write_tree(&Tree::empty()).unwrap();
        let c1 = commit(&store, empty, None);
        let c2 = commit(&store, empty, Some(c1));
        let c3 = commit(&store, empty, Some(c2));

        let ids: Vec<ObjectId> = history(&store, c3, 10).unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![c3, c2, c1]);
        assert_eq!(history(&store, c3, 2).unwrap().len(), 2);
    }
}
