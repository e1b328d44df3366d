//! Cache keys.
//!
//! A [`QueryKey`] is an ordered list of primitive segments. Keys compare by
//! value, and a key *matches* a filter when the filter is a prefix of it,
//! so `["todos"]` matches both `["todos"]` and `["todos", 7]`. The empty key
//! matches everything.
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::QueryError;

/// One primitive segment of a [`QueryKey`].
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(untagged)]
pub enum KeySegment {
    Int(i64),
    Str(String),
}

impl From<&str> for KeySegment {
    fn from(value: &str) -> Self {
        KeySegment::Str(value.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(value: String) -> Self {
        KeySegment::Str(value)
    }
}

impl From<i64> for KeySegment {
    fn from(value: i64) -> Self {
        KeySegment::Int(value)
    }
}

impl From<i32> for KeySegment {
    fn from(value: i32) -> Self {
        KeySegment::Int(value.into())
    }
}

impl From<u32> for KeySegment {
    fn from(value: u32) -> Self {
        KeySegment::Int(value.into())
    }
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Int(value) => write!(f, "{value}"),
            KeySegment::Str(value) => write!(f, "{value:?}"),
        }
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builder-style append.
    pub fn with(mut self, segment: impl Into<KeySegment>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// Partial match: `filter` is a prefix of this key.
    pub fn starts_with(&self, filter: &QueryKey) -> bool {
        self.0.starts_with(&filter.0)
    }

    /// Match against a filter, either exactly or by prefix.
    pub fn matches(&self, filter: &QueryKey, exact: bool) -> bool {
        if exact {
            self == filter
        } else {
            self.starts_with(filter)
        }
    }
}

impl From<Vec<KeySegment>> for QueryKey {
    fn from(segments: Vec<KeySegment>) -> Self {
        Self(segments)
    }
}

impl<S: Into<KeySegment>> FromIterator<S> for QueryKey {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, segment) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, "{segment}")?;
        }
        write!(f, "]")
    }
}

/// Parses the JSON array text form, e.g. `["todos", 7]`.
impl FromStr for QueryKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s.trim())
            .map_err(|e| QueryError::InvalidKey(format!("{s}: {e}")))
    }
}

/// Build a [`QueryKey`] from a list of segments.
///
/// ```ignore
/// let key = key!["todos", 7];
/// ```
#[macro_export]
macro_rules! key {
    () => {
        $crate::QueryKey::new()
    };
    ($($segment:expr),+ $(,)?) => {
        $crate::QueryKey::from(vec![$($crate::KeySegment::from($segment)),+])
    };
}
