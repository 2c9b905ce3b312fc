//! Validated hierarchical keys.
//!
//! A key is one or more non-empty segments joined by `/`:
//! - Must be non-empty
//! - Must not start or end with `/`
//! - Must not contain consecutive slashes (`//`)
//!
//! Every key that reaches the staging index or a tree has passed
//! [`Key::parse`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Segment separator.
pub const SEPARATOR: char = '/';

/// A slash-delimited key whose segments are all non-empty.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Validate and wrap a key.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvgit_types::Key;
    ///
    /// assert!(Key::parse("foo/bar").is_ok());
    /// assert!(Key::parse("/foo").is_err());
    /// assert!(Key::parse("foo//bar").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        if raw.is_empty() {
            return Err(invalid(raw, "key must not be empty"));
        }
        if raw.starts_with(SEPARATOR) {
            return Err(invalid(raw, "key must not start with '/'"));
        }
        if raw.ends_with(SEPARATOR) {
            return Err(invalid(raw, "key must not end with '/'"));
        }
        if raw.split(SEPARATOR).any(str::is_empty) {
            return Err(invalid(raw, "key must not contain empty segments"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the key's segments, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Every proper prefix of this key, shortest first (`a/b/c` yields `a`,
    /// `a/b`).
    pub fn ancestors(&self) -> Vec<Key> {
        self.0
            .match_indices(SEPARATOR)
            .map(|(idx, _)| Key(self.0[..idx].to_string()))
            .collect()
    }

    /// The remainder of this key below `prefix`, if `prefix` is a proper
    /// ancestor.
    pub fn strip_prefix(&self, prefix: &Key) -> Option<&str> {
        self.0
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_prefix(SEPARATOR))
    }

    /// Append a relative path below this key.
    pub fn join(&self, rest: &str) -> Result<Key, TypeError> {
        Key::parse(&format!("{}{SEPARATOR}{rest}", self.0))
    }
}

fn invalid(raw: &str, reason: &str) -> TypeError {
    TypeError::InvalidKey {
        key: raw.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", self.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Key {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Key::parse(&value)
    }
}

impl TryFrom<&str> for Key {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Key::parse(value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn valid_keys() {
        for raw in ["foo", "foo/bar", "a/b/c/d", "with space", "ünïcode/ok"] {
            assert!(Key::parse(raw).is_ok(), "{raw} should be valid");
        }
    }

    #[test]
    fn empty_segments_rejected() {
        for raw in ["", "/", "//", "/foo", "/foo/bar", "foo/", "foo//bar"] {
            let err = Key::parse(raw).unwrap_err();
            assert!(matches!(err, TypeError::InvalidKey { .. }), "{raw}");
        }
    }

    #[test]
    fn segments_and_depth() {
        let key = Key::parse("biz/baz/qux").unwrap();
        assert_eq!(key.segments().collect::<Vec<_>>(), vec!["biz", "baz", "qux"]);
        assert_eq!(key.depth(), 3);
    }

    #[test]
    fn ancestors_are_shortest_first() {
        let key = Key::parse("a/b/c").unwrap();
        let names: Vec<String> = key.ancestors().into_iter().map(String::from).collect();
        assert_eq!(names, vec!["a", "a/b"]);
        assert!(Key::parse("leaf").unwrap().ancestors().is_empty());
    }

    #[test]
    fn strip_prefix_requires_segment_boundary() {
        let key = Key::parse("biz/baz").unwrap();
        assert_eq!(key.strip_prefix(&Key::parse("biz").unwrap()), Some("baz"));
        assert_eq!(key.strip_prefix(&Key::parse("bi").unwrap()), None);
        assert_eq!(key.strip_prefix(&key), None);
    }

    #[test]
    fn join_validates_result() {
        let base = Key::parse("a").unwrap();
        assert_eq!(base.join("b/c").unwrap().as_str(), "a/b/c");
        assert!(base.join("").is_err());
    }

    #[test]
    fn serde_rejects_invalid_key() {
        let ok: Key = serde_json::from_str("\"x/y\"").unwrap();
        assert_eq!(ok.as_str(), "x/y");
        assert!(serde_json::from_str::<Key>("\"x//y\"").is_err());
    }

    proptest! {
        #[test]
        fn joined_nonempty_segments_always_parse(
            segments in proptest::collection::vec("[a-zA-Z0-9_.-]{1,8}", 1..6)
        ) {
            let raw = segments.join("/");
            let key = Key::parse(&raw).unwrap();
            prop_assert_eq!(key.depth(), segments.len());
        }

        #[test]
        fn any_empty_segment_is_rejected(
            head in proptest::collection::vec("[a-z]{1,4}", 0..3),
            tail in proptest::collection::vec("[a-z]{1,4}", 0..3),
        ) {
            let mut segments = head.clone();
            segments.push(String::new());
            segments.extend(tail);
            let raw = segments.join("/");
            prop_assert!(Key::parse(&raw).is_err());
        }
    }
}
