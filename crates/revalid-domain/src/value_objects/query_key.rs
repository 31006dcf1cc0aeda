//! Composite query key
//!
//! An ordered sequence of string segments identifying a cached item. The
//! key itself accepts any segments; validation and canonicalization are the
//! job of a [`KeyGenerator`](crate::ports::KeyGenerator).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered, composite identifier of a query
///
/// # Example
///
/// ```
/// use revalid_domain::QueryKey;
///
/// let key = QueryKey::from(["todos", "42"]);
/// assert_eq!(key.len(), 2);
/// assert!(key.starts_with(&QueryKey::from(["todos"])));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// Build a key from any iterable of segments
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Segments in order
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key has no segments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return a new key with `segment` appended
    pub fn child<S: Into<String>>(&self, segment: S) -> Self {
        let mut parts = self.0.clone();
        parts.push(segment.into());
        Self(parts)
    }

    /// Segment-wise prefix test (`["a", "b"]` is a prefix of `["a", "b", "c"]`
    /// but `["a", "b"]` is not a prefix of `["a", "bc"]`)
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Consume the key and return its segments
    pub fn into_parts(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl From<Vec<String>> for QueryKey {
    fn from(parts: Vec<String>) -> Self {
        Self(parts)
    }
}

impl From<&[&str]> for QueryKey {
    fn from(parts: &[&str]) -> Self {
        Self::new(parts.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
    fn from(parts: [&str; N]) -> Self {
        Self::new(parts)
    }
}

impl From<&str> for QueryKey {
    fn from(part: &str) -> Self {
        Self(vec![part.to_string()])
    }
}

impl AsRef<[String]> for QueryKey {
    fn as_ref(&self) -> &[String] {
        &self.0
    }
}
