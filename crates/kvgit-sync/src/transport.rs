use std::path::Path;

use kvgit_store::StoredObject;
use kvgit_types::ObjectId;
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::{SyncError, SyncResult};
use crate::local::LocalTransport;
use crate::types::{RefRejection, RefUpdate};

/// Transport interface for remote kvgit repositories.
///
/// Every call blocks until the remote answers. Failures are reported as-is;
/// nothing here retries.
pub trait RemoteTransport: Send + Sync {
    /// Location this transport talks to, as configured.
    fn url(&self) -> &str;

    /// Every ref on the remote with its target.
    fn list_refs(&self) -> SyncResult<Vec<(String, ObjectId)>>;

    /// Objects reachable from `wants`, minus the history behind `haves`.
    fn fetch_objects(&self, wants: &[ObjectId], haves: &[ObjectId]) -> SyncResult<Vec<StoredObject>>;

    /// Upload objects. Returns how many the remote did not already have.
    fn push_objects(&self, objects: &[StoredObject]) -> SyncResult<usize>;

    /// Apply compare-and-swap ref updates; returns the ones refused.
    fn update_refs(&self, updates: &[RefUpdate]) -> SyncResult<Vec<RefRejection>>;
}

/// Pick a transport for `url`.
///
/// Plain paths and `file://` URLs address a repository on the local
/// filesystem. Other schemes are not supported.
pub fn open_transport(url: &str, credentials: &Credentials) -> SyncResult<Box<dyn RemoteTransport>> {
    let path = match url.split_once("://") {
        Some(("file", rest)) => rest,
        Some((scheme, _)) => return Err(SyncError::UnsupportedTransport(scheme.to_string())),
        None => url,
    };
    if !credentials.is_anonymous() {
        debug!(url, auth = credentials.display_name(), "local transport ignores credentials");
    }
    Ok(Box::new(LocalTransport::open(url, Path::new(path))?))
}
