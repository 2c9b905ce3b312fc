//! Pending changes recorded in the staging index.

use kvgit_store::EntryMode;
use kvgit_types::ObjectId;

/// One pending change to a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StagedEntry {
    /// The key will hold the blob `object_id`.
    Write { object_id: ObjectId, mode: EntryMode },
    /// The key will be removed.
    Delete,
}

impl StagedEntry {
    /// A pending write of a regular value.
    pub fn write(object_id: ObjectId) -> Self {
        Self::Write {
            object_id,
            mode: EntryMode::Regular,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete)
    }

    /// Blob written by this entry, if any.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Self::Write { object_id, .. } => Some(*object_id),
            Self::Delete => None,
        }
    }
}
