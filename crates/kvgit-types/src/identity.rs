use std::fmt;

use serde::{Deserialize, Serialize};

/// A name/contact pair recorded as commit author or committer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Identity used when no configuration source supplies one.
    pub fn fallback() -> Self {
        Self::new("kvgit", "kvgit@localhost")
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

impl<N: Into<String>, E: Into<String>> From<(N, E)> for Identity {
    fn from((name, email): (N, E)) -> Self {
        Self::new(name, email)
    }
}
