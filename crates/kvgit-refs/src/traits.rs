//! The [`RefStore`] trait defining the reference storage interface.

use kvgit_types::ObjectId;

use crate::error::{RefError, Result};
use crate::types::{Ref, HEADS_PREFIX, REMOTES_PREFIX};

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`) and make every single
/// ref update atomic. The namespace follows git's layout:
///
/// - `refs/heads/*` for branches
/// - `refs/remotes/{remote}/*` for remote-tracking refs
pub trait RefStore: Send + Sync {
    /// Read a ref by its canonical name (e.g. "refs/heads/master").
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Write (create or update) a ref at the given canonical name.
    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()>;

    /// Delete a ref by canonical name. Returns `Ok(true)` if it existed.
    fn delete_ref(&self, name: &str) -> Result<bool>;

    /// List all refs whose canonical name starts with `prefix`, sorted.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>>;

    /// Atomically replace the ref at `name` with `new` iff its current target
    /// equals `expected` (`None` meaning "ref absent").
    ///
    /// Returns `Ok(false)` without writing when the ref has moved.
    fn compare_and_swap(&self, name: &str, expected: Option<ObjectId>, new: &Ref) -> Result<bool>;

    /// Target of the ref at `name`, if present.
    fn target(&self, name: &str) -> Result<Option<ObjectId>> {
        Ok(self.read_ref(name)?.map(|r| r.target()))
    }

    /// List all branch refs.
    fn branches(&self) -> Result<Vec<(String, Ref)>> {
        self.list_refs(HEADS_PREFIX)
    }

    /// List all remote-tracking refs.
    fn remote_refs(&self) -> Result<Vec<(String, Ref)>> {
        self.list_refs(REMOTES_PREFIX)
    }
}

/// Reject writes where `name` disagrees with the ref's own canonical name.
pub(crate) fn check_name(name: &str, reference: &Ref) -> Result<()> {
    let expected = reference.canonical_name();
    if name != expected {
        return Err(RefError::NameMismatch {
            name: name.to_string(),
            expected,
        });
    }
    crate::names::validate_ref_name(name)
}
