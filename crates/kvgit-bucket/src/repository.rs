//! On-disk repository layout.
//!
//! ```text
//! <root>/config.toml
//! <root>/objects/<2 hex>/<62 hex>
//! <root>/refs/heads/master
//! <root>/refs/remotes/origin/master
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kvgit_refs::{FileRefStore, Ref, RefStore, DEFAULT_BRANCH};
use kvgit_store::{DiskObjectStore, ObjectStore, ObjectStoreExt};
use kvgit_types::ObjectId;
use tracing::info;

use crate::config::{RepoConfig, CONFIG_FILE};
use crate::error::{BucketError, BucketResult};

const OBJECTS_DIR: &str = "objects";
const REFS_DIR: &str = "refs";

/// A repository directory: object store, refs, and config.
#[derive(Debug)]
pub struct Repository {
    root: PathBuf,
    objects: Arc<DiskObjectStore>,
    refs: Arc<FileRefStore>,
    config: RepoConfig,
}

impl Repository {
    /// Whether `path` holds a repository.
    pub fn is_repository(path: &Path) -> bool {
        path.join(CONFIG_FILE).is_file() && path.join(OBJECTS_DIR).is_dir() && path.join(REFS_DIR).is_dir()
    }

    /// Whether a repository may be created at `path`: it is missing or an
    /// empty directory.
    pub fn is_vacant(path: &Path) -> BucketResult<bool> {
        if !path.exists() {
            return Ok(true);
        }
        if !path.is_dir() {
            return Ok(false);
        }
        Ok(fs::read_dir(path)?.next().is_none())
    }

    /// Create an empty repository at `path`, recording `remote` if given.
    pub fn init(path: &Path, remote: Option<&str>) -> BucketResult<Self> {
        fs::create_dir_all(path)?;
        let objects = DiskObjectStore::init(path.join(OBJECTS_DIR))?;
        let refs = FileRefStore::open(path)?;
        let config = RepoConfig::with_remote(remote);
        config.save(path)?;
        info!(path = %path.display(), remote = ?remote, "initialized repository");
        Ok(Self {
            root: path.to_path_buf(),
            objects: Arc::new(objects),
            refs: Arc::new(refs),
            config,
        })
    }

    pub fn open(path: &Path) -> BucketResult<Self> {
        if !Self::is_repository(path) {
            return Err(BucketError::NoRepository(path.to_path_buf()));
        }
        Ok(Self {
            root: path.to_path_buf(),
            objects: Arc::new(DiskObjectStore::open(path.join(OBJECTS_DIR))?),
            refs: Arc::new(FileRefStore::open(path)?),
            config: RepoConfig::load(path)?,
        })
    }

    /// Remove what [`Repository::init`] created, leaving `root` itself.
    pub(crate) fn discard(self) -> BucketResult<()> {
        fs::remove_dir_all(self.root.join(OBJECTS_DIR))?;
        fs::remove_dir_all(self.root.join(REFS_DIR))?;
        fs::remove_file(self.root.join(CONFIG_FILE))?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.config.remote_url()
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        self.objects.clone()
    }

    pub fn refs(&self) -> Arc<dyn RefStore> {
        self.refs.clone()
    }

    /// Canonical name of the tracked branch.
    pub fn branch_ref(&self) -> String {
        Ref::branch_name(DEFAULT_BRANCH)
    }

    /// Latest local commit; `None` while the history is empty.
    pub fn head(&self) -> BucketResult<Option<ObjectId>> {
        Ok(self.refs.target(&self.branch_ref())?)
    }

    /// Root tree of [`Repository::head`].
    pub fn head_tree(&self) -> BucketResult<Option<ObjectId>> {
        match self.head()? {
            Some(id) => Ok(Some(self.objects.read_commit(&id)?.tree)),
            None => Ok(None),
        }
    }

    /// Point the branch at `target`, or remove it for an empty history.
    pub fn set_head(&self, target: Option<ObjectId>) -> BucketResult<()> {
        let name = self.branch_ref();
        match target {
            Some(id) => self.refs.write_ref(&name, &Ref::branch(DEFAULT_BRANCH, id))?,
            None => {
                self.refs.delete_ref(&name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvgit_store::{Commit, Signature, Tree};
    use kvgit_types::Identity;

    #[test]
    fn init_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo");
        assert!(Repository::is_vacant(&path).unwrap());

        Repository::init(&path, Some("/srv/remote")).unwrap();
        assert!(Repository::is_repository(&path));
        assert!(!Repository::is_vacant(&path).unwrap());

        let repo = Repository::open(&path).unwrap();
        assert_eq!(repo.remote_url(), Some("/srv/remote"));
        assert!(repo.head().unwrap().is_none());
        assert!(repo.head_tree().unwrap().is_none());
    }

    #[test]
    fn open_rejects_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stray.txt"), b"x").unwrap();
        assert!(!Repository::is_vacant(dir.path()).unwrap());
        assert!(matches!(
            Repository::open(dir.path()),
            Err(BucketError::NoRepository(_))
        ));
    }

    #[test]
    fn set_head_moves_and_clears_branch() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path(), None).unwrap();
        let store = repo.store();
        let tree = store.write_tree(&Tree::empty()).unwrap();
        let who = Identity::new("t", "t@t");
        let commit = store
            .write_commit(&Commit {
                tree,
                parents: vec![],
                author: Signature::new(&who, 0, 0),
                committer: Signature::new(&who, 0, 0),
                message: "m".into(),
            })
            .unwrap();

        repo.set_head(Some(commit)).unwrap();
        assert_eq!(repo.head().unwrap(), Some(commit));
        assert_eq!(repo.head_tree().unwrap(), Some(tree));
        repo.set_head(None).unwrap();
        assert!(repo.head().unwrap().is_none());
    }

    #[test]
    fn discard_leaves_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path(), None).unwrap();
        repo.discard().unwrap();
        assert!(Repository::is_vacant(dir.path()).unwrap());
    }
}
