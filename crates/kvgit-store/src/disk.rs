//! On-disk loose object storage.
//!
//! Layout: `<root>/<2 hex>/<62 hex>`. Each file is a zstd-compressed record
//!
//! ```text
//! <kind> <payload length>\0<payload>
//! ```
//!
//! Objects are written to a temporary file in the fan-out directory and
//! renamed into place, so readers never observe a partial object.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use kvgit_types::ObjectId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

const COMPRESSION_LEVEL: i32 = 3;

/// Loose-object store rooted at a directory.
#[derive(Debug, Clone)]
pub struct DiskObjectStore {
    root: PathBuf,
}

impl DiskObjectStore {
    /// Create the object directory (if needed) and open it.
    pub fn init<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Open an existing object directory.
    pub fn open<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(StoreError::InvalidStore(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `id`.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.root.join(id.prefix()).join(id.suffix())
    }

    /// Every object id present on disk, sorted.
    pub fn all_ids(&self) -> StoreResult<Vec<ObjectId>> {
        let mut ids = Vec::new();
        for fanout in fs::read_dir(&self.root)? {
            let fanout = fanout?;
            if !fanout.file_type()?.is_dir() {
                continue;
            }
            let prefix = fanout.file_name().to_string_lossy().into_owned();
            for entry in fs::read_dir(fanout.path())? {
                let name = entry?.file_name().to_string_lossy().into_owned();
                // Skip leftover temporary files.
                if let Ok(id) = ObjectId::from_hex(&format!("{prefix}{name}")) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn encode(object: &StoredObject) -> StoreResult<Vec<u8>> {
        let mut raw = format!("{} {}\0", object.kind, object.data.len()).into_bytes();
        raw.extend_from_slice(&object.data);
        Ok(zstd::encode_all(raw.as_slice(), COMPRESSION_LEVEL)?)
    }

    fn decode(id: &ObjectId, compressed: &[u8]) -> StoreResult<StoredObject> {
        let raw = zstd::decode_all(compressed)?;
        let corrupt = |reason: &str| StoreError::CorruptObject {
            id: *id,
            reason: reason.to_string(),
        };

        let nul = raw
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| corrupt("missing header terminator"))?;
        let header = std::str::from_utf8(&raw[..nul]).map_err(|_| corrupt("header is not utf-8"))?;
        let (kind, len) = header
            .split_once(' ')
            .ok_or_else(|| corrupt("malformed header"))?;
        let kind = ObjectKind::parse(kind).ok_or_else(|| corrupt("unknown object kind"))?;
        let len: usize = len.parse().map_err(|_| corrupt("malformed length"))?;

        let data = raw[nul + 1..].to_vec();
        if data.len() != len {
            return Err(corrupt("payload length mismatch"));
        }
        Ok(StoredObject::new(kind, data))
    }
}

impl ObjectStore for DiskObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let path = self.object_path(id);
        let compressed = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let object = Self::decode(id, &compressed)?;
        let computed = object.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let path = self.object_path(&id);
        if path.exists() {
            return Ok(id);
        }

        let parent = self.root.join(id.prefix());
        fs::create_dir_all(&parent)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&parent)?;
        temp_file.write_all(&Self::encode(object)?)?;
        temp_file.flush()?;
        temp_file.persist(&path)?;

        debug!(id = %id.short_hex(), kind = %object.kind, size = object.data.len(), "wrote object");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        match fs::remove_file(self.object_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
