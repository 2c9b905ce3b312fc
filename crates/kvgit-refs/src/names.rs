//! Canonical ref name validation following git-style conventions.
//!
//! Valid ref names:
//! - Must start with `refs/`
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` or `@{`
//! - Components between slashes must be non-empty and not start with `.`
//! - Must not end with `.lock` (reserved for update locks)

use crate::error::{RefError, Result};

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidRefName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a full canonical ref name such as `refs/heads/master`.
///
/// # Examples
///
/// ```
/// use kvgit_refs::validate_ref_name;
///
/// assert!(validate_ref_name("refs/heads/master").is_ok());
/// assert!(validate_ref_name("refs/heads/bad..name").is_err());
/// assert!(validate_ref_name("heads/master").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> Result<()> {
    let rest = name
        .strip_prefix("refs/")
        .ok_or_else(|| invalid(name, "must start with 'refs/'"))?;

    if rest.is_empty() {
        return Err(invalid(name, "missing ref path after 'refs/'"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }
    for component in rest.split('/') {
        validate_segment(component).map_err(|_| {
            invalid(name, format!("invalid component: {component:?}"))
        })?;
    }
    Ok(())
}

/// Validate a single component such as a branch or remote name.
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(invalid(segment, "component must not be empty"));
    }
    if segment.starts_with('.') {
        return Err(invalid(segment, "component must not start with '.'"));
    }
    if segment.contains('/') {
        return Err(invalid(segment, "component must not contain '/'"));
    }
    Ok(())
}
