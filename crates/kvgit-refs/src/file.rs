//! File-backed reference store.
//!
//! Each ref is a file under the repository root holding one hex commit id
//! (`<root>/refs/heads/master`). Updates follow git's lock protocol: create
//! `<ref>.lock` exclusively, write the new value into it, then rename it over
//! the ref. The lock makes compare-and-swap atomic across processes; a writer
//! that finds the lock taken fails with [`RefError::Locked`] instead of
//! waiting.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use kvgit_types::ObjectId;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{RefError, Result};
use crate::names::validate_ref_name;
use crate::traits::{check_name, RefStore};
use crate::types::Ref;

const LOCK_SUFFIX: &str = ".lock";

/// A [`RefStore`] persisted as one file per ref.
#[derive(Debug, Clone)]
pub struct FileRefStore {
    root: PathBuf,
}

impl FileRefStore {
    /// Open (creating `refs/` if needed) a ref store rooted at a repository
    /// directory.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("refs"))?;
        Ok(Self { root })
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read_target(&self, name: &str) -> Result<Option<ObjectId>> {
        match fs::read_to_string(self.ref_path(name)) {
            Ok(content) => {
                let id = content.parse::<ObjectId>().map_err(|e| RefError::Corrupt {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Some(id))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Exclusive update lock on one ref; removed on drop unless committed.
struct RefLock {
    lock_path: PathBuf,
    file: Option<File>,
}

impl RefLock {
    fn acquire(ref_path: &Path, name: &str) -> Result<Self> {
        if let Some(parent) = ref_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut lock_path = ref_path.as_os_str().to_owned();
        lock_path.push(LOCK_SUFFIX);
        let lock_path = PathBuf::from(lock_path);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => RefError::Locked {
                    name: name.to_string(),
                },
                _ => RefError::Io(e),
            })?;
        Ok(Self {
            lock_path,
            file: Some(file),
        })
    }

    /// Write `target` and rename the lock over `ref_path`.
    fn commit(mut self, ref_path: &Path, target: ObjectId) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            writeln!(file, "{target}")?;
            file.sync_all()?;
        }
        fs::rename(&self.lock_path, ref_path)?;
        Ok(())
    }
}

impl Drop for RefLock {
    fn drop(&mut self) {
        // Committed locks were renamed away; this only cleans up abandoned ones.
        let _ = fs::remove_file(&self.lock_path);
    }
}

impl RefStore for FileRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        validate_ref_name(name)?;
        self.read_target(name)?
            .map(|target| Ref::from_canonical(name, target))
            .transpose()
    }

    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()> {
        check_name(name, reference)?;
        let path = self.ref_path(name);
        RefLock::acquire(&path, name)?.commit(&path, reference.target())?;
        debug!(name, target = %reference.target().short_hex(), "ref updated");
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        validate_ref_name(name)?;
        let path = self.ref_path(name);
        let _lock = RefLock::acquire(&path, name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(name, "ref deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>> {
        let mut result = Vec::new();
        for entry in WalkDir::new(self.root.join("refs")).sort_by_file_name() {
            let entry = entry.map_err(|e| RefError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if name.ends_with(LOCK_SUFFIX) || !name.starts_with(prefix) {
                continue;
            }
            if let Some(reference) = self.read_ref(&name)? {
                result.push((name, reference));
            }
        }
        result.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(result)
    }

    fn compare_and_swap(&self, name: &str, expected: Option<ObjectId>, new: &Ref) -> Result<bool> {
        check_name(name, new)?;
        let path = self.ref_path(name);
        let lock = RefLock::acquire(&path, name)?;

        let current = self.read_target(name)?;
        if current != expected {
            debug!(
                name,
                current = ?current.map(|id| id.short_hex()),
                expected = ?expected.map(|id| id.short_hex()),
                "compare-and-swap rejected"
            );
            return Ok(false);
        }

        lock.commit(&path, new.target())?;
        debug!(name, target = %new.target().short_hex(), "compare-and-swap applied");
        Ok(true)
    }
}
