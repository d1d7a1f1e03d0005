//! Error types for the document model

use crate::state::Field;
use crate::types::{ItemKind, WorkspaceId};
use trellis_path::ItemId;

/// Errors from the JSON view of the document state
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Top-level field name not part of the model
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Entry access on a field that is not a keyed table
    #[error("field {0} is not a collection")]
    NotACollection(Field),

    /// Whole-field access on a keyed table
    #[error("field {0} is a collection")]
    IsACollection(Field),

    /// Entry key that does not parse as the table's key type
    #[error("invalid entry key: {0}")]
    InvalidKey(String),

    /// Field could not be encoded
    #[error("failed to encode {field}: {source}")]
    Encode {
        /// Field being encoded
        field: Field,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Entry could not be encoded
    #[error("failed to encode entry: {0}")]
    EncodeEntry(#[source] serde_json::Error),

    /// Value does not match the field's shape
    #[error("failed to decode {field} (entry {key:?}): {source}")]
    Decode {
        /// Field being decoded
        field: Field,
        /// Entry key, for collection entries
        key: Option<String>,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

/// Structural invariant violations found by
/// [`DocumentState::check_integrity`](crate::DocumentState::check_integrity)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// No root item
    #[error("root item is missing")]
    MissingRoot,

    /// Root item has a parent
    #[error("root item has a parent")]
    RootHasParent,

    /// Root item has no page entry
    #[error("root item is not a page")]
    RootNotAPage,

    /// Table key and stored id disagree
    #[error("item stored under {key} has id {id}")]
    IdMismatch {
        /// Table key
        key: ItemId,
        /// Id inside the item
        id: ItemId,
    },

    /// Item id at or above the allocator
    #[error("item {0} was never allocated")]
    IdNotAllocated(ItemId),

    /// Same child twice in one child list
    #[error("item {child} appears twice under {parent}")]
    DuplicateChild {
        /// Parent item
        parent: ItemId,
        /// Repeated child
        child: ItemId,
    },

    /// Child list and parent map disagree
    #[error("edge {parent} -> {child} is not recorded on both sides")]
    Asymmetric {
        /// Parent item
        parent: ItemId,
        /// Child item
        child: ItemId,
    },

    /// Item without payload in its kind's table
    #[error("item {0} has no payload")]
    MissingPayload(ItemId),

    /// Payload without a matching item
    #[error("{table} entry {key} has no item of that kind")]
    OrphanPayload {
        /// Payload table
        table: Field,
        /// Entry key
        key: String,
    },

    /// Page entry for a missing item
    #[error("page {0} has no item")]
    DanglingPage(ItemId),

    /// Mounted page that is not a page
    #[error("mounted page {0} is not a page")]
    DanglingMount(ItemId),

    /// Graph contains a cycle through these items
    #[error("cycle through items {0:?}")]
    Cycle(Vec<ItemId>),
}

/// Errors from graph operations
///
/// Rejected operations leave the document unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Item not found
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// Edge from an item to itself
    #[error("item {0} cannot be its own child")]
    SelfEdge(ItemId),

    /// Edge already present
    #[error("item {child} is already a child of {parent}")]
    DuplicateEdge {
        /// Parent item
        parent: ItemId,
        /// Child item
        child: ItemId,
    },

    /// Edge not present
    #[error("item {child} is not a child of {parent}")]
    EdgeNotFound {
        /// Parent item
        parent: ItemId,
        /// Child item
        child: ItemId,
    },

    /// Edge would close a cycle
    #[error("adding {child} under {parent} would create a cycle")]
    CycleDetected {
        /// Parent item
        parent: ItemId,
        /// Child item
        child: ItemId,
    },

    /// Operation not allowed on the root item
    #[error("root item cannot be {0}")]
    RootImmutable(&'static str),

    /// Payload kind differs from the item's kind
    #[error("item {id} is {expected}, payload is {actual}")]
    KindMismatch {
        /// Item
        id: ItemId,
        /// Kind of the item
        expected: ItemKind,
        /// Kind of the payload
        actual: ItemKind,
    },

    /// Item is not a page
    #[error("item {0} is not a page")]
    NotAPage(ItemId),

    /// Workspace not found
    #[error("workspace not found: {0}")]
    WorkspaceNotFound(WorkspaceId),

    /// Item path that does not walk existing edges
    #[error("invalid item path: {0}")]
    InvalidPath(String),
}

impl GraphError {
    /// Create an edge-not-found error
    #[must_use]
    pub fn edge_not_found(parent: ItemId, child: ItemId) -> Self {
        Self::EdgeNotFound { parent, child }
    }
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;
