//! Storage paths into a nested [`Doc`](super::Doc).
//!
//! A [`KeyPath`] is a sequence of [`Segment`]s. Keyed segments step into a
//! map, positional segments step into a list. The dotted string form
//! (`"e.e.a"`) only ever contains keyed segments; positional segments are
//! produced by list cursors and rendered as their decimal index.
//!
//! ```rust
//! # use shortkey::value::{KeyPath, Segment};
//! # use std::str::FromStr;
//! let path = KeyPath::from_str("m.t")?;
//! assert_eq!(path.len(), 2);
//!
//! let path = KeyPath::new().push_key("l").push_index(0).push_key("o");
//! assert_eq!(path.last(), Some(&Segment::Key("o".to_string())));
//! assert_eq!(path.to_string(), "l.0.o");
//! # Ok::<(), shortkey::Error>(())
//! ```

use std::{fmt, str::FromStr};

use super::ValueError;

/// Normalizes a dotted path string by dropping empty components.
///
/// - `""` → `""`
/// - `".m"` → `"m"`
/// - `"m..t"` → `"m.t"`
pub fn normalize_path(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    input
        .split('.')
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// One step of a [`KeyPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Step into a map by key
    Key(String),
    /// Step into a list by position
    Index(usize),
}

impl Segment {
    /// Returns the key if this is a keyed segment
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(key) => Some(key),
            Segment::Index(_) => None,
        }
    }

    /// Returns true if this segment addresses a list position
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{key}"),
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// An owned path from the root of a stored document.
///
/// The empty path refers to the root document itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    /// Creates the empty (root) path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a keyed segment.
    pub fn push_key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    /// Appends a positional segment.
    pub fn push_index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Returns the path without its last segment, or `None` for the root.
    pub fn parent(&self) -> Option<KeyPath> {
        self.split_last().map(|(_, parent)| parent)
    }

    /// Splits off the last segment, returning it together with the parent path.
    pub fn split_last(&self) -> Option<(&Segment, KeyPath)> {
        let (last, rest) = self.segments.split_last()?;
        Some((
            last,
            KeyPath {
                segments: rest.to_vec(),
            },
        ))
    }

    /// Returns true if every segment is keyed, i.e. the path never passes
    /// through a list.
    pub fn is_keyed(&self) -> bool {
        self.segments.iter().all(|segment| !segment.is_index())
    }
}

impl FromStr for KeyPath {
    type Err = ValueError;

    /// Parses a dotted path. Every component becomes a keyed segment.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_path(s);
        if normalized.is_empty() && !s.is_empty() {
            return Err(ValueError::InvalidPath {
                path: s.to_string(),
                reason: "path has no components".to_string(),
            });
        }
        Ok(KeyPath {
            segments: normalized
                .split('.')
                .filter(|component| !component.is_empty())
                .map(|component| Segment::Key(component.to_string()))
                .collect(),
        })
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for KeyPath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        KeyPath {
            segments: iter.into_iter().map(|key| Segment::Key(key.into())).collect(),
        }
    }
}
