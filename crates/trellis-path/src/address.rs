//! Addresses into the document model
//!
//! Provides [`Address`] for naming a location inside the nested document
//! shape: a top-level field, optionally followed by entry keys, nested field
//! names and list indices.

use crate::error::PathError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Delimiter used by the stable string form of an address
pub const DELIMITER: char = '.';

const INDEX_MARKER: char = '#';

/// One step of an [`Address`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// Field name or map key
    Key(String),
    /// Position in a list
    Index(usize),
}

impl Segment {
    /// Key text, if this is a key segment
    #[inline]
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }

    /// List position, if this is an index segment
    #[inline]
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Key(_) => None,
            Self::Index(index) => Some(*index),
        }
    }

    fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::EmptySegment);
        }
        if let Some(digits) = raw.strip_prefix(INDEX_MARKER) {
            return digits
                .parse()
                .map(Self::Index)
                .map_err(|_| PathError::InvalidIndex(raw.to_string()));
        }
        Ok(Self::Key(raw.to_string()))
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{INDEX_MARKER}{index}"),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Location inside the document model
///
/// The first segment is always a top-level field name. Collection fields
/// continue with the entry key, then optionally with nested field names or
/// list indices.
///
/// # Examples
/// - `["mountedPages"]` → `mountedPages`
/// - `["items", "42", "childItemIds", 0]` → `items.42.childItemIds.#0`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(Vec<Segment>);

impl Address {
    /// Create new address from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Address of a top-level field
    #[inline]
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![Segment::Key(name.into())])
    }

    /// Address of one entry of a collection field
    #[inline]
    #[must_use]
    pub fn entry(field: impl Into<String>, key: impl Display) -> Self {
        Self(vec![Segment::Key(field.into()), Segment::Key(key.to_string())])
    }

    /// Empty address (the whole document)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get address segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Split into owned segments
    #[inline]
    #[must_use]
    pub fn into_segments(self) -> Vec<Segment> {
        self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if address is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Top-level field name
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().and_then(Segment::as_key)
    }

    /// Last segment
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Get parent address (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Keep at most `len` leading segments
    #[inline]
    #[must_use]
    pub fn truncate(&self, len: usize) -> Self {
        Self(self.0.iter().take(len).cloned().collect())
    }

    /// Append a key segment, returning new address
    #[inline]
    #[must_use]
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(Segment::Key(key.into()));
        new
    }

    /// Append an index segment, returning new address
    #[inline]
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut new = self.clone();
        new.0.push(Segment::Index(index));
        new
    }

    /// Extend with multiple segments
    #[inline]
    #[must_use]
    pub fn extend(&self, segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut new = self.clone();
        new.0.extend(segments);
        new
    }

    /// Check if this address is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Check if addresses overlap (one is prefix of other)
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// Get relative address from ancestor
    ///
    /// # Errors
    /// Returns error if `self` is not a descendant of `ancestor`
    pub fn relative_to(&self, ancestor: &Self) -> Result<Self, PathError> {
        if !ancestor.is_prefix_of(self) {
            return Err(PathError::NotDescendant {
                path: self.to_string(),
                ancestor: ancestor.to_string(),
            });
        }
        Ok(Self(self.0[ancestor.0.len()..].to_vec()))
    }

    /// Iterator over segments from the top-level field inward
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.0.iter()
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{DELIMITER}")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        s.split(DELIMITER)
            .map(Segment::parse)
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

impl From<Vec<Segment>> for Address {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl TryFrom<&[&str]> for Address {
    type Error = PathError;

    fn try_from(parts: &[&str]) -> Result<Self, Self::Error> {
        parts
            .iter()
            .map(|part| {
                if part.is_empty() {
                    Err(PathError::EmptySegment)
                } else if part.contains(DELIMITER) || part.starts_with(INDEX_MARKER) {
                    Err(PathError::InvalidSegment((*part).to_string()))
                } else {
                    Ok(Segment::Key((*part).to_string()))
                }
            })
            .collect::<Result<_, _>>()
            .map(Self)
    }
}
