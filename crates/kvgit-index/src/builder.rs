//! Bottom-up tree construction from staged changes.
//!
//! Only the trees on paths touched by a change are rewritten; every other
//! subtree keeps its id from the baseline. Trees are content addressed and
//! sorted, so the same resulting key space always yields the same root id.

use std::collections::BTreeMap;

use kvgit_store::{EntryMode, ObjectStore, ObjectStoreExt, Tree, TreeEntry};
use kvgit_types::{Key, ObjectId};
use tracing::debug;

use crate::entry::StagedEntry;
use crate::error::IndexResult;

/// Changes grouped under one segment of the current level.
#[derive(Default)]
struct SegmentChanges<'a> {
    leaf: Option<&'a StagedEntry>,
    nested: Vec<(Vec<&'a str>, &'a StagedEntry)>,
}

/// Apply `changes` to the tree `baseline` (or an empty key space) and write
/// the resulting root tree.
///
/// A write replaces whatever sits at its key, including a subtree. A write
/// below a leaf turns that leaf into a subtree. Subtrees left empty are
/// dropped; an empty key space is written as the empty tree.
pub fn build_tree<S: ObjectStore + ?Sized>(
    store: &S,
    baseline: Option<ObjectId>,
    changes: &BTreeMap<Key, StagedEntry>,
) -> IndexResult<ObjectId> {
    let paths: Vec<(Vec<&str>, &StagedEntry)> = changes
        .iter()
        .map(|(key, entry)| (key.segments().collect(), entry))
        .collect();

    let root = match build_level(store, baseline, paths)? {
        Some(id) => id,
        None => store.write_tree(&Tree::empty())?,
    };
    debug!(root = %root.short_hex(), changes = changes.len(), "built tree");
    Ok(root)
}

fn build_level<'a, S: ObjectStore + ?Sized>(
    store: &S,
    base: Option<ObjectId>,
    changes: Vec<(Vec<&'a str>, &'a StagedEntry)>,
) -> IndexResult<Option<ObjectId>> {
    if changes.is_empty() {
        return Ok(base);
    }

    let mut entries: BTreeMap<String, TreeEntry> = match base {
        Some(id) => store.read_tree(&id)?.into_map(),
        None => BTreeMap::new(),
    };

    let mut grouped: BTreeMap<&str, SegmentChanges<'a>> = BTreeMap::new();
    for (segments, entry) in changes {
        let Some((head, rest)) = segments.split_first() else {
            continue;
        };
        let group = grouped.entry(*head).or_default();
        if rest.is_empty() {
            group.leaf = Some(entry);
        } else {
            group.nested.push((rest.to_vec(), entry));
        }
    }

    for (name, group) in grouped {
        match group.leaf {
            Some(StagedEntry::Write { object_id, mode }) => {
                entries.insert(name.to_string(), TreeEntry::new(*mode, name, *object_id));
                continue;
            }
            Some(StagedEntry::Delete) => {
                if entries.get(name).is_some_and(|e| !e.mode.is_tree()) {
                    entries.remove(name);
                }
            }
            None => {}
        }

        if group.nested.is_empty() {
            continue;
        }
        let existing = entries.get(name);
        let has_writes = group.nested.iter().any(|(_, e)| !e.is_delete());
        if existing.is_some_and(|e| !e.mode.is_tree()) && !has_writes {
            // Deletes below a leaf have nothing to remove.
            continue;
        }
        let sub_base = existing.filter(|e| e.mode.is_tree()).map(|e| e.object_id);
        match build_level(store, sub_base, group.nested)? {
            Some(id) => {
                entries.insert(name.to_string(), TreeEntry::new(EntryMode::Directory, name, id));
            }
            None => {
                entries.remove(name);
            }
        }
    }

    if entries.is_empty() {
        return Ok(None);
    }
    let tree = Tree::new(entries.into_values().collect());
    Ok(Some(store.write_tree(&tree)?))
}
