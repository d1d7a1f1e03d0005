//! Errors related to addresses and item paths

/// Errors related to addresses and item paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in an address
    #[error("address contains empty segment")]
    EmptySegment,

    /// Segment that cannot round-trip through the string form
    #[error("invalid segment: {0} (must not contain '.' or start with '#')")]
    InvalidSegment(String),

    /// Index segment that is not a number
    #[error("invalid index segment: {0}")]
    InvalidIndex(String),

    /// Item path with no elements
    #[error("item path must contain at least one item id")]
    EmptyItemPath,

    /// Item id that is not an unsigned integer
    #[error("invalid item id: {0}")]
    InvalidItemId(String),

    /// Not a descendant address
    #[error("address '{path}' is not a descendant of '{ancestor}'")]
    NotDescendant { path: String, ancestor: String },
}
