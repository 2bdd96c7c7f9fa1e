use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Longest identifier accepted by [`StateId::parse`].
pub const MAX_STATE_ID_LEN: usize = 64;

/// Externally visible handle of a saved state document.
///
/// Identifiers are restricted to ASCII alphanumerics, `-` and `_`, so they
/// can always be used as a single object-store path component.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateId(String);

impl StateId {
    /// Validate and wrap an identifier.
    pub fn parse(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        if s.is_empty() {
            return Err(TypeError::InvalidStateId {
                id: s,
                reason: "empty".into(),
            });
        }
        if s.len() > MAX_STATE_ID_LEN {
            return Err(TypeError::InvalidStateId {
                reason: format!("longer than {MAX_STATE_ID_LEN} characters"),
                id: s,
            });
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(TypeError::InvalidStateId {
                reason: format!("invalid character {c:?}"),
                id: s,
            });
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateId({})", self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StateId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StateId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<StateId> for String {
    fn from(id: StateId) -> Self {
        id.0
    }
}

/// A state identifier together with the object-store key it lives under.
///
/// The key is the identifier namespaced by a fixed prefix, e.g.
/// `states/123456789012345678`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredObjectRef {
    pub id: StateId,
    pub key: String,
}

impl StoredObjectRef {
    /// Build a reference whose key is `id` namespaced under `prefix`.
    pub fn new(prefix: &str, id: StateId) -> Self {
        let key = namespaced_key(prefix, id.as_str());
        Self { id, key }
    }
}

/// Join `prefix` and `name` with a single `/`. An empty prefix yields `name`.
pub fn namespaced_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
