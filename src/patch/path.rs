//! Paths into nested JSON values.

use crate::error::{HistoryError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// One step of a [`Path`]: an object key or an array index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// Interpret this segment as an array index.
    ///
    /// Keys made only of ASCII digits count as indices, which is how
    /// JSON Pointer tokens address array elements.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Index(i) => Some(*i),
            PathSegment::Key(k) => {
                if k.is_empty() || !k.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                if k.len() > 1 && k.starts_with('0') {
                    return None;
                }
                k.parse().ok()
            }
        }
    }

    /// Interpret this segment as an object key.
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            PathSegment::Key(k) => Cow::Borrowed(k),
            PathSegment::Index(i) => Cow::Owned(i.to_string()),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k.replace('~', "~0").replace('/', "~1")),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Location of a value inside a state, from the root down.
///
/// The empty path addresses the root itself. Paths print and serialize
/// as RFC 6901 JSON Pointers (`/users/0/name`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Path(segments)
    }

    /// Extend with an object key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(PathSegment::Key(key.into()));
        self
    }

    /// Extend with an array index.
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    /// A new path one segment deeper.
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Path(segments)
    }

    /// A new path with `suffix` appended.
    pub fn join(&self, suffix: &Path) -> Self {
        let mut segments = self.0.clone();
        segments.extend(suffix.0.iter().cloned());
        Path(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into the parent path segments and the final segment.
    pub fn split_last(&self) -> Option<(&PathSegment, &[PathSegment])> {
        self.0.split_last()
    }

    /// Render as a JSON Pointer.
    pub fn to_pointer(&self) -> String {
        self.to_string()
    }

    /// Parse a JSON Pointer. The empty string is the root.
    pub fn from_pointer(pointer: &str) -> Result<Self> {
        if pointer.is_empty() {
            return Ok(Path::root());
        }
        let rest = pointer.strip_prefix('/').ok_or_else(|| {
            HistoryError::InvalidPatch(format!("pointer must start with '/': {:?}", pointer))
        })?;

        let mut segments = Vec::new();
        for token in rest.split('/') {
            segments.push(PathSegment::Key(unescape_token(token)?));
        }
        Ok(Path(segments))
    }
}

fn unescape_token(token: &str) -> Result<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            other => {
                return Err(HistoryError::InvalidPatch(format!(
                    "bad escape '~{}' in pointer token {:?}",
                    other.map(String::from).unwrap_or_default(),
                    token
                )))
            }
        }
    }
    Ok(out)
}

impl From<&[PathSegment]> for Path {
    fn from(segments: &[PathSegment]) -> Self {
        Path(segments.to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self> {
        Path::from_pointer(s)
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_pointer())
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let pointer = String::deserialize(deserializer)?;
        Path::from_pointer(&pointer).map_err(serde::de::Error::custom)
    }
}

/// Build a [`Path`] from keys and indices.
///
/// ```
/// use rewind::path;
///
/// let p = path!("users", 0, "name");
/// assert_eq!(p.to_pointer(), "/users/0/name");
/// assert!(path!().is_root());
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::patch::Path::root()
    };
    ($($segment:expr),+ $(,)?) => {
        $crate::patch::Path::from_segments(vec![$($crate::patch::PathSegment::from($segment)),+])
    };
}
