//! Repository configuration and identity resolution.
//!
//! Each repository carries a `config.toml`:
//!
//! ```toml
//! [remote]
//! url = "/srv/kv/shared"
//!
//! [user]
//! name = "Ada"
//! email = "ada@example.com"
//!
//! [commit]
//! timezone_offset = 60
//! ```
//!
//! Settings missing from it are looked up through a [`ConfigSource`] chain
//! once, when a bucket is opened: environment, then the user-global file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use kvgit_types::Identity;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BucketError, BucketResult};

/// Name of the per-repository config file.
pub const CONFIG_FILE: &str = "config.toml";
/// Prefix of environment variables consulted for settings (`user.name` is
/// read from `KVGIT_USER_NAME`).
pub const ENV_PREFIX: &str = "KVGIT_";
/// Largest accepted timezone offset, in minutes either side of UTC.
pub const MAX_TIMEZONE_OFFSET: i32 = 24 * 60 - 1;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSection>,
    #[serde(default, skip_serializing_if = "UserSection::is_empty")]
    pub user: UserSection,
    #[serde(default, skip_serializing_if = "CommitSection::is_empty")]
    pub commit: CommitSection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSection {
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserSection {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone_offset: Option<i32>,
}

impl CommitSection {
    fn is_empty(&self) -> bool {
        self.timezone_offset.is_none()
    }
}

impl RepoConfig {
    pub fn with_remote(url: Option<&str>) -> Self {
        Self {
            remote: url.map(|u| RemoteSection { url: u.to_string() }),
            ..Default::default()
        }
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.remote.as_ref().map(|r| r.url.as_str())
    }

    pub fn load(repo_root: &Path) -> BucketResult<Self> {
        let path = repo_root.join(CONFIG_FILE);
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| BucketError::Config(format!("{}: {e}", path.display())))
    }

    /// Write `config.toml` atomically.
    pub fn save(&self, repo_root: &Path) -> BucketResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| BucketError::Config(e.to_string()))?;
        let mut temp_file = tempfile::NamedTempFile::new_in(repo_root)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.flush()?;
        temp_file
            .persist(repo_root.join(CONFIG_FILE))
            .map_err(|e| BucketError::Io(e.error))?;
        Ok(())
    }
}

/// Read-only lookup of dotted settings (`user.name`, `commit.timezone_offset`).
pub trait ConfigSource {
    fn lookup(&self, key: &str) -> Option<String>;
}

impl ConfigSource for RepoConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "remote.url" => self.remote_url().map(str::to_string),
            "user.name" => self.user.name.clone(),
            "user.email" => self.user.email.clone(),
            "commit.timezone_offset" => self.commit.timezone_offset.map(|o| o.to_string()),
            _ => None,
        }
    }
}

/// Settings from `KVGIT_*` environment variables.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvSource;

impl EnvSource {
    /// Variable holding `key`: `user.name` maps to `KVGIT_USER_NAME`.
    pub fn var_name(key: &str) -> String {
        format!("{ENV_PREFIX}{}", key.replace('.', "_").to_uppercase())
    }
}

impl ConfigSource for EnvSource {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(Self::var_name(key)).ok().filter(|v| !v.is_empty())
    }
}

/// Settings from a TOML file addressed with dot notation.
#[derive(Clone, Debug, Default)]
pub struct TomlFileSource {
    table: toml::Table,
}

impl TomlFileSource {
    pub fn from_table(table: toml::Table) -> Self {
        Self { table }
    }

    /// Load `path`; a missing file is an empty source.
    pub fn load(path: &Path) -> BucketResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let table = content
            .parse::<toml::Table>()
            .map_err(|e| BucketError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self { table })
    }

    /// The user-global config, or an empty source when there is none or it
    /// cannot be read.
    pub fn global() -> Self {
        let Some(path) = global_config_path() else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable global config");
                Self::default()
            }
        }
    }
}

impl ConfigSource for TomlFileSource {
    fn lookup(&self, key: &str) -> Option<String> {
        let (path, last) = match key.rsplit_once('.') {
            Some((path, last)) => (Some(path), last),
            None => (None, key),
        };
        let mut table = &self.table;
        for part in path.into_iter().flat_map(|p| p.split('.')) {
            table = table.get(part)?.as_table()?;
        }
        match table.get(last)? {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// First hit across several sources, in order.
#[derive(Default)]
pub struct ConfigChain {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Environment, then the user-global file.
    pub fn ambient() -> Self {
        Self::new().with(EnvSource).with(TomlFileSource::global())
    }
}

impl ConfigSource for ConfigChain {
    fn lookup(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|s| s.lookup(key))
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for Box<S> {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }
}

/// User-wide config file: `<config dir>/kvgit/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("kvgit").join(CONFIG_FILE))
}

/// Identity to sign commits with: `explicit` if given, else `user.name` /
/// `user.email` from `source`, else the built-in fallback.
pub fn resolve_identity(explicit: Option<Identity>, source: &dyn ConfigSource) -> Identity {
    if let Some(identity) = explicit {
        return identity;
    }
    let fallback = Identity::fallback();
    let name = source.lookup("user.name");
    let email = source.lookup("user.email");
    if name.is_none() || email.is_none() {
        warn!(
            fallback = %fallback,
            "no complete user identity configured; set user.name and user.email"
        );
    }
    Identity::new(
        name.unwrap_or(fallback.name),
        email.unwrap_or(fallback.email),
    )
}

/// Validate a timezone offset in minutes.
pub fn check_timezone_offset(minutes: i32) -> BucketResult<i32> {
    if minutes.abs() > MAX_TIMEZONE_OFFSET {
        return Err(BucketError::Config(format!(
            "timezone offset {minutes} is outside ±{MAX_TIMEZONE_OFFSET} minutes"
        )));
    }
    Ok(minutes)
}

/// Offset from `source`'s `commit.timezone_offset`, if set.
pub fn lookup_timezone_offset(source: &dyn ConfigSource) -> BucketResult<Option<i32>> {
    let Some(raw) = source.lookup("commit.timezone_offset") else {
        return Ok(None);
    };
    let minutes = raw
        .trim()
        .parse::<i32>()
        .map_err(|_| BucketError::Config(format!("commit.timezone_offset is not an integer: {raw}")))?;
    check_timezone_offset(minutes).map(Some)
}
