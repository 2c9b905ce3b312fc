//! Key path resolution over nested trees.
//!
//! Trees reference children only by hash, so a walk from any root is finite.
//! A segment that lands on a non-tree object ends the walk with "absent"
//! rather than an error, which keeps lookups uniform for callers.

use kvgit_store::{ObjectKind, ObjectStore, ObjectStoreExt, Tree, TreeEntry};
use kvgit_types::{Key, ObjectId, SEPARATOR};

use crate::error::{IndexError, IndexResult};

/// Read `id` as a tree, or `None` if it holds some other kind of object.
fn read_tree_opt<S: ObjectStore + ?Sized>(store: &S, id: &ObjectId) -> IndexResult<Option<Tree>> {
    let object = store.read_required(id)?;
    if object.kind != ObjectKind::Tree {
        return Ok(None);
    }
    Ok(Some(Tree::from_stored_object(object)?))
}

/// Walk `key` from the root tree `tree_id` and return the final entry.
pub fn resolve_entry<S: ObjectStore + ?Sized>(
    store: &S,
    tree_id: &ObjectId,
    key: &Key,
) -> IndexResult<Option<TreeEntry>> {
    let mut current = *tree_id;
    let mut segments = key.segments().peekable();

    while let Some(segment) = segments.next() {
        let Some(tree) = read_tree_opt(store, &current)? else {
            return Ok(None);
        };
        let Some(entry) = tree.get(segment) else {
            return Ok(None);
        };
        if segments.peek().is_none() {
            return Ok(Some(entry.clone()));
        }
        if !entry.mode.is_tree() {
            return Ok(None);
        }
        current = entry.object_id;
    }
    Ok(None)
}

/// Object id stored at `key` below `tree_id`, leaf or subtree.
pub fn resolve<S: ObjectStore + ?Sized>(
    store: &S,
    tree_id: &ObjectId,
    key: &Key,
) -> IndexResult<Option<ObjectId>> {
    Ok(resolve_entry(store, tree_id, key)?.map(|e| e.object_id))
}

/// Every leaf below `tree_id`, as `(relative key, blob id)` in key order.
pub fn leaves<S: ObjectStore + ?Sized>(
    store: &S,
    tree_id: &ObjectId,
) -> IndexResult<Vec<(String, ObjectId)>> {
    let mut out = Vec::new();
    let mut stack: Vec<(String, ObjectId)> = vec![(String::new(), *tree_id)];

    while let Some((prefix, id)) = stack.pop() {
        let Some(tree) = read_tree_opt(store, &id)? else {
            continue;
        };
        for entry in tree.entries {
            if entry.name.is_empty() || entry.name.contains(SEPARATOR) {
                return Err(IndexError::CorruptTree {
                    id,
                    reason: format!("invalid segment {:?}", entry.name),
                });
            }
            let path = if prefix.is_empty() {
                entry.name
            } else {
                format!("{prefix}{SEPARATOR}{}", entry.name)
            };
            if entry.mode.is_tree() {
                stack.push((path, entry.object_id));
            } else {
                out.push((path, entry.object_id));
            }
        }
    }

    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvgit_store::{EntryMode, InMemoryObjectStore};

    fn key(raw: &str) -> Key {
        Key::parse(raw).unwrap()
    }

    /// Root with `top` (leaf) and `ns/inner` (nested leaf).
    fn sample(store: &InMemoryObjectStore) -> (ObjectId, ObjectId, ObjectId) {
        let top = store.write_blob(b"top").unwrap();
        let inner = store.write_blob(b"inner").unwrap();
        let ns = store
            .write_tree(&Tree::new(vec![TreeEntry::new(EntryMode::Regular, "inner", inner)]))
            .unwrap();
        let root = store
            .write_tree(&Tree::new(vec![
                TreeEntry::new(EntryMode::Regular, "top", top),
                TreeEntry::new(EntryMode::Directory, "ns", ns),
            ]))
            .unwrap();
        (root, top, inner)
    }

    #[test]
    fn resolves_leaves_at_any_depth() {
        let store = InMemoryObjectStore::new();
        let (root, top, inner) = sample(&store);
        assert_eq!(resolve(&store, &root, &key("top")).unwrap(), Some(top));
        assert_eq!(resolve(&store, &root, &key("ns/inner")).unwrap(), Some(inner));
    }

    #[test]
    fn directory_entry_resolves_to_subtree() {
        let store = InMemoryObjectStore::new();
        let (root, _, _) = sample(&store);
        let entry = resolve_entry(&store, &root, &key("ns")).unwrap().unwrap();
        assert!(entry.mode.is_tree());
    }

    #[test]
    fn missing_and_non_tree_paths_are_absent() {
        let store = InMemoryObjectStore::new();
        let (root, _, _) = sample(&store);
        assert!(resolve(&store, &root, &key("nope")).unwrap().is_none());
        assert!(resolve(&store, &root, &key("ns/nope")).unwrap().is_none());
        // `top` is a leaf, so there is nothing beneath it.
        assert!(resolve(&store, &root, &key("top/below")).unwrap().is_none());
    }

    #[test]
    fn mislabelled_directory_is_absent() {
        let store = InMemoryObjectStore::new();
        let blob = store.write_blob(b"not a tree").unwrap();
        let root = store
            .write_tree(&Tree::new(vec![TreeEntry::new(EntryMode::Directory, "d", blob)]))
            .unwrap();
        assert!(resolve(&store, &root, &key("d/x")).unwrap().is_none());
        assert!(leaves(&store, &root).unwrap().is_empty());
    }

    #[test]
    fn leaves_lists_full_paths_in_order() {
        let store = InMemoryObjectStore::new();
        let (root, top, inner) = sample(&store);
        assert_eq!(
            leaves(&store, &root).unwrap(),
            vec![("ns/inner".to_string(), inner), ("top".to_string(), top)]
        );
    }

    #[test]
    fn leaves_rejects_bad_segment() {
        let store = InMemoryObjectStore::new();
        let blob = store.write_blob(b"x").unwrap();
        let root = store
            .write_tree(&Tree::new(vec![TreeEntry::new(EntryMode::Regular, "a/b", blob)]))
            .unwrap();
        assert!(matches!(leaves(&store, &root), Err(IndexError::CorruptTree { .. })));
    }
}
