//! Item paths through the outline DAG
//!
//! An item may have many parents, so its id alone does not say which
//! occurrence on screen is meant. [`ItemPath`] records the walk from a page
//! root down to the item and so names exactly one occurrence.

use crate::error::PathError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Integer identity of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Raw integer value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse()
            .map(Self)
            .map_err(|_| PathError::InvalidItemId(s.to_string()))
    }
}

impl From<u64> for ItemId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// One occurrence of an item: the walk from a page root to it
///
/// # Invariants
/// - never empty
/// - the first id is a page root
/// - consecutive ids are connected by a child edge
///
/// Only the first invariant is enforced here; the other two depend on the
/// document and are checked by the model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<ItemId>", into = "Vec<ItemId>")]
pub struct ItemPath(Vec<ItemId>);

impl ItemPath {
    /// Create path from ids
    ///
    /// # Errors
    /// Returns error if `ids` is empty
    pub fn new(ids: Vec<ItemId>) -> Result<Self, PathError> {
        if ids.is_empty() {
            return Err(PathError::EmptyItemPath);
        }
        Ok(Self(ids))
    }

    /// Path consisting of a page root only
    #[inline]
    #[must_use]
    pub fn root_only(root: ItemId) -> Self {
        Self(vec![root])
    }

    /// Ids from root to focal item
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        &self.0
    }

    /// Number of ids in the path
    #[inline]
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Depth below the page root (0 for the root itself)
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len() - 1
    }

    /// The item this path points at
    #[inline]
    #[must_use]
    pub fn focal(&self) -> ItemId {
        self.0[self.0.len() - 1]
    }

    /// The page root the path starts from
    #[inline]
    #[must_use]
    pub fn root(&self) -> ItemId {
        self.0[0]
    }

    /// Parent of the focal item in this occurrence
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ItemId> {
        self.0.len().checked_sub(2).map(|i| self.0[i])
    }

    /// Check if the focal item has a parent in this path
    #[inline]
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.0.len() > 1
    }

    /// Path to the parent occurrence
    #[inline]
    #[must_use]
    pub fn parent_path(&self) -> Option<Self> {
        if self.has_parent() {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }

    /// Same parent chain, different focal item
    #[inline]
    #[must_use]
    pub fn sibling(&self, id: ItemId) -> Self {
        let mut new = self.clone();
        let last = new.0.len() - 1;
        new.0[last] = id;
        new
    }

    /// Append a child, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, id: ItemId) -> Self {
        let mut new = self.clone();
        new.0.push(id);
        new
    }

    /// Keep at most `len` leading ids (at least one is always kept)
    #[inline]
    #[must_use]
    pub fn truncate(&self, len: usize) -> Self {
        Self(self.0[..len.clamp(1, self.0.len())].to_vec())
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Check if the path visits `id` anywhere
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.0.contains(&id)
    }

    /// Longest common prefix of two paths
    ///
    /// Returns `None` when the roots differ, which means the two occurrences
    /// live in unrelated subtrees.
    #[must_use]
    pub fn common_prefix(&self, other: &Self) -> Option<Self> {
        let common: Vec<_> = self
            .0
            .iter()
            .zip(&other.0)
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| *a)
            .collect();
        if common.is_empty() {
            None
        } else {
            Some(Self(common))
        }
    }

    /// Ancestor paths, nearest first
    #[inline]
    #[must_use]
    pub fn ancestors(&self) -> PathAncestors<'_> {
        PathAncestors {
            path: self,
            len: self.0.len() - 1,
        }
    }

    /// Iterator over ids from root to focal item
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.0.iter().copied()
    }
}

impl Display for ItemPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

impl FromStr for ItemPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::EmptyItemPath);
        }
        let ids = s
            .split('/')
            .map(ItemId::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(ids)
    }
}

impl TryFrom<Vec<ItemId>> for ItemPath {
    type Error = PathError;

    fn try_from(ids: Vec<ItemId>) -> Result<Self, Self::Error> {
        Self::new(ids)
    }
}

impl From<ItemPath> for Vec<ItemId> {
    fn from(path: ItemPath) -> Self {
        path.0
    }
}

/// Iterator over the ancestor paths of an [`ItemPath`], nearest first
#[derive(Debug, Clone)]
pub struct PathAncestors<'a> {
    path: &'a ItemPath,
    len: usize,
}

impl Iterator for PathAncestors<'_> {
    type Item = ItemPath;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let ancestor = ItemPath(self.path.0[..self.len].to_vec());
        self.len -= 1;
        Some(ancestor)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl ExactSizeIterator for PathAncestors<'_> {}
