//! Core document types
//!
//! Items, their per-kind payloads, pages and workspaces.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use trellis_path::{ItemId, ItemPath};

/// The permanent root item. Always a page, never has a parent.
pub const ROOT_ITEM_ID: ItemId = ItemId(0);

/// Immutable type tag of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    /// Plain text
    Text,
    /// Web reference
    Web,
    /// Image
    Image,
    /// Code block
    Code,
    /// Formula
    Formula,
}

impl ItemKind {
    /// All kinds, in table order
    pub const ALL: [ItemKind; 5] = [
        ItemKind::Text,
        ItemKind::Web,
        ItemKind::Image,
        ItemKind::Code,
        ItemKind::Formula,
    ];

    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Web => "web",
            Self::Image => "image",
            Self::Code => "code",
            Self::Formula => "formula",
        }
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata on the edge from one parent to an item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Children of the item are hidden in this occurrence
    #[serde(default)]
    pub collapsed: bool,
    /// Free-form labels on the edge
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

/// A node of the document DAG
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Identity
    pub id: ItemId,
    /// Type tag, fixed at creation
    pub kind: ItemKind,
    /// Ordered children
    #[serde(default)]
    pub child_item_ids: Vec<ItemId>,
    /// Parent id → edge metadata
    #[serde(default)]
    pub parents: BTreeMap<ItemId, Edge>,
    /// Recency, milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Style/class tags
    #[serde(default)]
    pub classes: BTreeSet<String>,
    /// Optional citation
    #[serde(default)]
    pub citation: Option<String>,
}

impl Item {
    /// New detached item
    #[must_use]
    pub fn new(id: ItemId, kind: ItemKind, timestamp: i64) -> Self {
        Self {
            id,
            kind,
            child_item_ids: Vec::new(),
            parents: BTreeMap::new(),
            timestamp,
            classes: BTreeSet::new(),
            citation: None,
        }
    }

    /// Position of `child` in the child list
    #[inline]
    #[must_use]
    pub fn child_index(&self, child: ItemId) -> Option<usize> {
        self.child_item_ids.iter().position(|c| *c == child)
    }

    /// Check if the item has at least one parent
    #[inline]
    #[must_use]
    pub fn has_parents(&self) -> bool {
        !self.parents.is_empty()
    }
}

/// Payload of a plain-text item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPayload {
    /// The text
    pub text: String,
}

/// Payload of a web-reference item
///
/// The live browser tab behind a reference is tracked outside the engine;
/// only the item-side data lives here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPayload {
    /// Target URL
    pub url: String,
    /// Page title
    #[serde(default)]
    pub title: String,
    /// Title of the tab it was captured from
    #[serde(default)]
    pub tab_title: Option<String>,
}

/// Payload of an image item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    /// Image source
    pub src: String,
    /// Caption
    #[serde(default)]
    pub caption: String,
    /// Display width in pixels
    #[serde(default)]
    pub width: Option<u32>,
    /// Display height in pixels
    #[serde(default)]
    pub height: Option<u32>,
}

/// Payload of a code-block item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodePayload {
    /// Source code
    pub code: String,
    /// Language hint
    #[serde(default)]
    pub language: Option<String>,
}

/// Payload of a formula item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaPayload {
    /// Formula source
    pub source: String,
}

/// Payload of any kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Plain text
    Text(TextPayload),
    /// Web reference
    Web(WebPayload),
    /// Image
    Image(ImagePayload),
    /// Code block
    Code(CodePayload),
    /// Formula
    Formula(FormulaPayload),
}

impl Payload {
    /// Plain-text payload
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextPayload { text: text.into() })
    }

    /// Kind this payload belongs to
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Text(_) => ItemKind::Text,
            Self::Web(_) => ItemKind::Web,
            Self::Image(_) => ItemKind::Image,
            Self::Code(_) => ItemKind::Code,
            Self::Formula(_) => ItemKind::Formula,
        }
    }

    /// Searchable text tracks of this payload
    #[must_use]
    pub fn text_tracks(&self) -> Vec<&str> {
        match self {
            Self::Text(p) => vec![p.text.as_str()],
            Self::Web(p) => {
                let mut tracks = vec![p.title.as_str()];
                if let Some(tab_title) = &p.tab_title {
                    tracks.push(tab_title.as_str());
                }
                tracks
            }
            Self::Image(p) => vec![p.caption.as_str()],
            Self::Code(p) => vec![p.code.as_str()],
            Self::Formula(p) => vec![p.source.as_str()],
        }
    }
}

/// How a page is shown by default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    /// Bulleted outline
    #[default]
    Outline,
    /// Flowing document
    Document,
}

/// Page designation of an item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Current selection target
    #[serde(default)]
    pub target: Option<ItemPath>,
    /// Selection anchor (other end of a range)
    #[serde(default)]
    pub anchor: Option<ItemPath>,
    /// Default display mode
    #[serde(default)]
    pub display_mode: DisplayMode,
}

/// Identity of a workspace
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Generate new random id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Id as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for WorkspaceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WorkspaceId {
    type Err = InvalidWorkspaceId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let plain = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
        if s.is_empty() || !s.chars().all(plain) {
            return Err(InvalidWorkspaceId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for WorkspaceId {
    type Error = InvalidWorkspaceId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<WorkspaceId> for String {
    fn from(id: WorkspaceId) -> Self {
        id.0
    }
}

/// Workspace id that cannot be used as an address key or file name
///
/// Ids are limited to ASCII letters, digits, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid workspace id: {0:?}")]
pub struct InvalidWorkspaceId(pub String);

/// Per-device view configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Identity
    pub id: WorkspaceId,
    /// Display name
    pub name: String,
    /// Page currently shown
    pub active_page_id: ItemId,
    /// Items hidden from page tree and search, with their descendants
    #[serde(default)]
    pub excluded_item_ids: BTreeSet<ItemId>,
}

impl Workspace {
    /// New workspace showing the root page
    #[must_use]
    pub fn new(id: WorkspaceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active_page_id: ROOT_ITEM_ID,
            excluded_item_ids: BTreeSet::new(),
        }
    }
}

/// Transient dialog state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogState {
    /// Which dialog is open
    pub kind: String,
    /// Occurrence the dialog acts on
    #[serde(default)]
    pub target: Option<ItemPath>,
}
