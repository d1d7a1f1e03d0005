//! The aggregate document state
//!
//! [`DocumentState`] holds every table of the document. Tables are
//! persistent maps, so cloning the state is cheap and clones share structure;
//! undo snapshots rely on this.
//!
//! Besides typed access, the state exposes a JSON view addressed by
//! [`Field`] and entry key. The chunk codec and the generic
//! [`Store::mutate`](crate::Store::mutate) go through that view.

use crate::error::{IntegrityError, StateError};
use crate::types::{
    CodePayload, DialogState, FormulaPayload, ImagePayload, Item, ItemKind, Page, Payload,
    TextPayload, WebPayload, Workspace, WorkspaceId, ROOT_ITEM_ID,
};
use im::OrdMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use trellis_path::ItemId;

/// Top-level field of the document model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Item table
    Items,
    /// Text payload table
    TextItems,
    /// Web payload table
    WebItems,
    /// Image payload table
    ImageItems,
    /// Code payload table
    CodeItems,
    /// Formula payload table
    FormulaItems,
    /// Page table
    Pages,
    /// Workspace table
    Workspaces,
    /// Recently visited pages, most recent first
    MountedPages,
    /// Transient dialog state
    Dialog,
    /// Key-binding table
    KeyBindings,
    /// Item id allocator
    NextItemId,
}

impl Field {
    /// Every field, in persistence order
    pub const ALL: [Field; 12] = [
        Field::Items,
        Field::TextItems,
        Field::WebItems,
        Field::ImageItems,
        Field::CodeItems,
        Field::FormulaItems,
        Field::Pages,
        Field::Workspaces,
        Field::MountedPages,
        Field::Dialog,
        Field::KeyBindings,
        Field::NextItemId,
    ];

    /// Stable wire name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::TextItems => "textItems",
            Self::WebItems => "webItems",
            Self::ImageItems => "imageItems",
            Self::CodeItems => "codeItems",
            Self::FormulaItems => "formulaItems",
            Self::Pages => "pages",
            Self::Workspaces => "workspaces",
            Self::MountedPages => "mountedPages",
            Self::Dialog => "dialog",
            Self::KeyBindings => "keyBindings",
            Self::NextItemId => "nextItemId",
        }
    }

    /// Look up a field by wire name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Check if the field is a keyed table persisted entry by entry
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(
            self,
            Self::Items
                | Self::TextItems
                | Self::WebItems
                | Self::ImageItems
                | Self::CodeItems
                | Self::FormulaItems
                | Self::Pages
                | Self::Workspaces
        )
    }

    /// Payload table for an item kind
    #[must_use]
    pub const fn payload_table(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Text => Self::TextItems,
            ItemKind::Web => Self::WebItems,
            ItemKind::Image => Self::ImageItems,
            ItemKind::Code => Self::CodeItems,
            ItemKind::Formula => Self::FormulaItems,
        }
    }

    /// Check if entries of this field carry searchable text
    #[must_use]
    pub const fn carries_text(self) -> bool {
        matches!(
            self,
            Self::TextItems | Self::WebItems | Self::ImageItems | Self::CodeItems | Self::FormulaItems
        )
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| StateError::UnknownField(s.to_string()))
    }
}

/// Aggregate document state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentState {
    pub(crate) items: OrdMap<ItemId, Item>,
    pub(crate) text_items: OrdMap<ItemId, TextPayload>,
    pub(crate) web_items: OrdMap<ItemId, WebPayload>,
    pub(crate) image_items: OrdMap<ItemId, ImagePayload>,
    pub(crate) code_items: OrdMap<ItemId, CodePayload>,
    pub(crate) formula_items: OrdMap<ItemId, FormulaPayload>,
    pub(crate) pages: OrdMap<ItemId, Page>,
    pub(crate) workspaces: OrdMap<WorkspaceId, Workspace>,
    pub(crate) mounted_pages: Vec<ItemId>,
    pub(crate) dialog: Option<DialogState>,
    pub(crate) key_bindings: BTreeMap<String, Vec<String>>,
    pub(crate) next_item_id: ItemId,
}

impl DocumentState {
    /// Empty state with no items at all
    ///
    /// Starting point for rebuilding a document from fragments.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            items: OrdMap::new(),
            text_items: OrdMap::new(),
            web_items: OrdMap::new(),
            image_items: OrdMap::new(),
            code_items: OrdMap::new(),
            formula_items: OrdMap::new(),
            pages: OrdMap::new(),
            workspaces: OrdMap::new(),
            mounted_pages: Vec::new(),
            dialog: None,
            key_bindings: BTreeMap::new(),
            next_item_id: ItemId(ROOT_ITEM_ID.0 + 1),
        }
    }

    /// New document: a root text item that is also the mounted root page
    #[must_use]
    pub fn fresh(timestamp: i64) -> Self {
        let mut state = Self::blank();
        state
            .items
            .insert(ROOT_ITEM_ID, Item::new(ROOT_ITEM_ID, ItemKind::Text, timestamp));
        state.text_items.insert(
            ROOT_ITEM_ID,
            TextPayload {
                text: "Home".to_string(),
            },
        );
        state.pages.insert(ROOT_ITEM_ID, Page::default());
        state.mounted_pages.push(ROOT_ITEM_ID);
        state.key_bindings = default_key_bindings();
        state
    }

    /// Item by id
    #[inline]
    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Check if item exists
    #[inline]
    #[must_use]
    pub fn contains_item(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// All items in id order
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Number of items
    #[inline]
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Payload of an item, whatever its kind
    #[must_use]
    pub fn payload(&self, id: ItemId) -> Option<Payload> {
        let kind = self.items.get(&id)?.kind;
        match kind {
            ItemKind::Text => self.text_items.get(&id).cloned().map(Payload::Text),
            ItemKind::Web => self.web_items.get(&id).cloned().map(Payload::Web),
            ItemKind::Image => self.image_items.get(&id).cloned().map(Payload::Image),
            ItemKind::Code => self.code_items.get(&id).cloned().map(Payload::Code),
            ItemKind::Formula => self.formula_items.get(&id).cloned().map(Payload::Formula),
        }
    }

    /// Searchable text tracks of an item (empty if it does not exist)
    #[must_use]
    pub fn text_tracks(&self, id: ItemId) -> Vec<String> {
        self.payload(id)
            .map(|p| p.text_tracks().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Page entry of an item
    #[inline]
    #[must_use]
    pub fn page(&self, id: ItemId) -> Option<&Page> {
        self.pages.get(&id)
    }

    /// Check if item is a page
    #[inline]
    #[must_use]
    pub fn is_page(&self, id: ItemId) -> bool {
        self.pages.contains_key(&id)
    }

    /// Ids of all pages
    pub fn page_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.pages.keys().copied()
    }

    /// Workspace by id
    #[inline]
    #[must_use]
    pub fn workspace(&self, id: &WorkspaceId) -> Option<&Workspace> {
        self.workspaces.get(id)
    }

    /// All workspaces
    pub fn workspaces(&self) -> impl Iterator<Item = &Workspace> {
        self.workspaces.values()
    }

    /// Mounted pages, most recent first
    #[inline]
    #[must_use]
    pub fn mounted_pages(&self) -> &[ItemId] {
        &self.mounted_pages
    }

    /// Open dialog, if any
    #[inline]
    #[must_use]
    pub fn dialog(&self) -> Option<&DialogState> {
        self.dialog.as_ref()
    }

    /// Key chords bound to an action
    #[must_use]
    pub fn key_binding(&self, action: &str) -> Option<&[String]> {
        self.key_bindings.get(action).map(Vec::as_slice)
    }

    /// Whole key-binding table
    #[inline]
    #[must_use]
    pub fn key_bindings(&self) -> &BTreeMap<String, Vec<String>> {
        &self.key_bindings
    }

    /// Next id the allocator will hand out
    #[inline]
    #[must_use]
    pub fn next_item_id(&self) -> ItemId {
        self.next_item_id
    }

    // ------------------------------------------------------------------
    // JSON view
    // ------------------------------------------------------------------

    /// Keys of a collection field, in table order
    ///
    /// # Errors
    /// Returns error if `field` is not a collection
    pub fn entry_keys(&self, field: Field) -> Result<Vec<String>, StateError> {
        Ok(match field {
            Field::Items => keys_of(&self.items),
            Field::TextItems => keys_of(&self.text_items),
            Field::WebItems => keys_of(&self.web_items),
            Field::ImageItems => keys_of(&self.image_items),
            Field::CodeItems => keys_of(&self.code_items),
            Field::FormulaItems => keys_of(&self.formula_items),
            Field::Pages => keys_of(&self.pages),
            Field::Workspaces => keys_of(&self.workspaces),
            _ => return Err(StateError::NotACollection(field)),
        })
    }

    /// One collection entry as JSON
    ///
    /// # Errors
    /// Returns error if `field` is not a collection, the key is malformed, or
    /// the entry cannot be encoded
    pub fn entry_value(&self, field: Field, key: &str) -> Result<Option<Value>, StateError> {
        match field {
            Field::Items => get_entry(&self.items, key),
            Field::TextItems => get_entry(&self.text_items, key),
            Field::WebItems => get_entry(&self.web_items, key),
            Field::ImageItems => get_entry(&self.image_items, key),
            Field::CodeItems => get_entry(&self.code_items, key),
            Field::FormulaItems => get_entry(&self.formula_items, key),
            Field::Pages => get_entry(&self.pages, key),
            Field::Workspaces => get_entry(&self.workspaces, key),
            _ => Err(StateError::NotACollection(field)),
        }
    }

    /// Replace one collection entry from JSON
    ///
    /// # Errors
    /// Returns error if `field` is not a collection, the key is malformed, or
    /// the value does not decode into the table's entry type
    pub fn set_entry_value(&mut self, field: Field, key: &str, value: Value) -> Result<(), StateError> {
        match field {
            Field::Items => put_entry(&mut self.items, field, key, value),
            Field::TextItems => put_entry(&mut self.text_items, field, key, value),
            Field::WebItems => put_entry(&mut self.web_items, field, key, value),
            Field::ImageItems => put_entry(&mut self.image_items, field, key, value),
            Field::CodeItems => put_entry(&mut self.code_items, field, key, value),
            Field::FormulaItems => put_entry(&mut self.formula_items, field, key, value),
            Field::Pages => put_entry(&mut self.pages, field, key, value),
            Field::Workspaces => put_entry(&mut self.workspaces, field, key, value),
            _ => Err(StateError::NotACollection(field)),
        }
    }

    /// Remove one collection entry; returns whether it existed
    ///
    /// # Errors
    /// Returns error if `field` is not a collection or the key is malformed
    pub fn remove_entry(&mut self, field: Field, key: &str) -> Result<bool, StateError> {
        match field {
            Field::Items => remove_from(&mut self.items, key),
            Field::TextItems => remove_from(&mut self.text_items, key),
            Field::WebItems => remove_from(&mut self.web_items, key),
            Field::ImageItems => remove_from(&mut self.image_items, key),
            Field::CodeItems => remove_from(&mut self.code_items, key),
            Field::FormulaItems => remove_from(&mut self.formula_items, key),
            Field::Pages => remove_from(&mut self.pages, key),
            Field::Workspaces => remove_from(&mut self.workspaces, key),
            _ => Err(StateError::NotACollection(field)),
        }
    }

    /// A non-collection field as JSON
    ///
    /// # Errors
    /// Returns error if `field` is a collection or cannot be encoded
    pub fn field_value(&self, field: Field) -> Result<Value, StateError> {
        let value = match field {
            Field::MountedPages => serde_json::to_value(&self.mounted_pages),
            Field::Dialog => serde_json::to_value(&self.dialog),
            Field::KeyBindings => serde_json::to_value(&self.key_bindings),
            Field::NextItemId => serde_json::to_value(self.next_item_id),
            _ => return Err(StateError::IsACollection(field)),
        };
        value.map_err(|source| StateError::Encode { field, source })
    }

    /// Replace a non-collection field from JSON
    ///
    /// # Errors
    /// Returns error if `field` is a collection or the value does not decode
    pub fn set_field_value(&mut self, field: Field, value: Value) -> Result<(), StateError> {
        let decode_err = |source| StateError::Decode {
            field,
            key: None,
            source,
        };
        match field {
            Field::MountedPages => self.mounted_pages = serde_json::from_value(value).map_err(decode_err)?,
            Field::Dialog => self.dialog = serde_json::from_value(value).map_err(decode_err)?,
            Field::KeyBindings => self.key_bindings = serde_json::from_value(value).map_err(decode_err)?,
            Field::NextItemId => self.next_item_id = serde_json::from_value(value).map_err(decode_err)?,
            _ => return Err(StateError::IsACollection(field)),
        }
        Ok(())
    }

    /// Reset a field to its blank value (collections become empty)
    pub fn reset_field(&mut self, field: Field) {
        let blank = Self::blank();
        match field {
            Field::Items => self.items = blank.items,
            Field::TextItems => self.text_items = blank.text_items,
            Field::WebItems => self.web_items = blank.web_items,
            Field::ImageItems => self.image_items = blank.image_items,
            Field::CodeItems => self.code_items = blank.code_items,
            Field::FormulaItems => self.formula_items = blank.formula_items,
            Field::Pages => self.pages = blank.pages,
            Field::Workspaces => self.workspaces = blank.workspaces,
            Field::MountedPages => self.mounted_pages = blank.mounted_pages,
            Field::Dialog => self.dialog = blank.dialog,
            Field::KeyBindings => self.key_bindings = blank.key_bindings,
            Field::NextItemId => self.next_item_id = blank.next_item_id,
        }
    }

    // ------------------------------------------------------------------
    // Integrity
    // ------------------------------------------------------------------

    /// Verify the structural invariants of the document
    ///
    /// Checks parent/child symmetry, the root rules, payload presence, page
    /// and mount references, and acyclicity.
    ///
    /// # Errors
    /// Returns the first violation found
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        let root = self.items.get(&ROOT_ITEM_ID).ok_or(IntegrityError::MissingRoot)?;
        if root.has_parents() {
            return Err(IntegrityError::RootHasParent);
        }
        if !self.pages.contains_key(&ROOT_ITEM_ID) {
            return Err(IntegrityError::RootNotAPage);
        }

        for (id, item) in &self.items {
            if *id != item.id {
                return Err(IntegrityError::IdMismatch { key: *id, id: item.id });
            }
            if *id >= self.next_item_id {
                return Err(IntegrityError::IdNotAllocated(*id));
            }
            let mut seen = HashSet::new();
            for child in &item.child_item_ids {
                if !seen.insert(*child) {
                    return Err(IntegrityError::DuplicateChild { parent: *id, child: *child });
                }
                let linked = self
                    .items
                    .get(child)
                    .is_some_and(|c| c.parents.contains_key(id));
                if !linked {
                    return Err(IntegrityError::Asymmetric { parent: *id, child: *child });
                }
            }
            for parent in item.parents.keys() {
                let linked = self
                    .items
                    .get(parent)
                    .is_some_and(|p| p.child_item_ids.contains(id));
                if !linked {
                    return Err(IntegrityError::Asymmetric { parent: *parent, child: *id });
                }
            }
            if self.payload(*id).is_none() {
                return Err(IntegrityError::MissingPayload(*id));
            }
        }

        for kind in ItemKind::ALL {
            let table = Field::payload_table(kind);
            for key in self.entry_keys(table).unwrap_or_default() {
                let owned = key
                    .parse::<ItemId>()
                    .ok()
                    .and_then(|id| self.items.get(&id))
                    .is_some_and(|item| item.kind == kind);
                if !owned {
                    return Err(IntegrityError::OrphanPayload { table, key });
                }
            }
        }

        for id in self.pages.keys() {
            if !self.items.contains_key(id) {
                return Err(IntegrityError::DanglingPage(*id));
            }
        }
        for id in &self.mounted_pages {
            if !self.pages.contains_key(id) {
                return Err(IntegrityError::DanglingMount(*id));
            }
        }

        self.check_acyclic()
    }

    fn check_acyclic(&self) -> Result<(), IntegrityError> {
        // Kahn's algorithm over child edges
        let mut in_degree: BTreeMap<ItemId, usize> = self
            .items
            .iter()
            .map(|(id, item)| (*id, item.parents.len()))
            .collect();
        let mut ready: Vec<ItemId> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0usize;
        while let Some(id) = ready.pop() {
            visited += 1;
            if let Some(item) = self.items.get(&id) {
                for child in &item.child_item_ids {
                    if let Some(d) = in_degree.get_mut(child) {
                        *d -= 1;
                        if *d == 0 {
                            ready.push(*child);
                        }
                    }
                }
            }
        }
        if visited == self.items.len() {
            Ok(())
        } else {
            let stuck: BTreeSet<ItemId> = in_degree
                .into_iter()
                .filter(|(_, d)| *d > 0)
                .map(|(id, _)| id)
                .collect();
            Err(IntegrityError::Cycle(stuck.into_iter().collect()))
        }
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::blank()
    }
}

fn default_key_bindings() -> BTreeMap<String, Vec<String>> {
    [
        ("undo", "Mod+z"),
        ("redo", "Mod+Shift+z"),
        ("indent", "Tab"),
        ("outdent", "Shift+Tab"),
        ("search", "Mod+k"),
    ]
    .into_iter()
    .map(|(action, chord)| (action.to_string(), vec![chord.to_string()]))
    .collect()
}

fn parse_key<K: FromStr>(key: &str) -> Result<K, StateError> {
    key.parse()
        .map_err(|_| StateError::InvalidKey(key.to_string()))
}

fn keys_of<K: Ord + Clone + Display, V: Clone>(map: &OrdMap<K, V>) -> Vec<String> {
    map.keys().map(ToString::to_string).collect()
}

fn get_entry<K, V>(map: &OrdMap<K, V>, key: &str) -> Result<Option<Value>, StateError>
where
    K: Ord + Clone + FromStr,
    V: Clone + Serialize,
{
    let key: K = parse_key(key)?;
    map.get(&key)
        .map(|v| serde_json::to_value(v).map_err(StateError::EncodeEntry))
        .transpose()
}

fn put_entry<K, V>(map: &mut OrdMap<K, V>, field: Field, key: &str, value: Value) -> Result<(), StateError>
where
    K: Ord + Clone + FromStr,
    V: Clone + DeserializeOwned,
{
    let parsed: K = parse_key(key)?;
    let entry: V = serde_json::from_value(value).map_err(|source| StateError::Decode {
        field,
        key: Some(key.to_string()),
        source,
    })?;
    map.insert(parsed, entry);
    Ok(())
}

fn remove_from<K, V>(map: &mut OrdMap<K, V>, key: &str) -> Result<bool, StateError>
where
    K: Ord + Clone + FromStr,
    V: Clone,
{
    let key: K = parse_key(key)?;
    Ok(map.remove(&key).is_some())
}
