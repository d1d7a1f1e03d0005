//! Mutation and undo engine
//!
//! [`Store`] is the single writer of a [`DocumentState`]. Every write goes
//! through an [`Address`] so that two things can be tracked for free:
//!
//! - the **pending set**: addresses changed since the last successful save,
//!   consumed by the sync layer
//! - the **undo frame**: a structurally shared snapshot of the state taken
//!   when a command began, plus the addresses the command touched
//!
//! # Invariants
//! - Only entry-level (or finer) addresses are recorded; the chunk codec
//!   truncates them
//! - Writing through an address whose shape does not match the model is a
//!   programming error and panics

use crate::state::{DocumentState, Field};
use crate::types::{DialogState, Item, ItemKind, Page, Payload, Workspace, WorkspaceId};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, trace};
use trellis_path::{Address, ItemId, Segment};

/// Default number of undo frames kept
pub const DEFAULT_UNDO_DEPTH: usize = 100;

/// Snapshot taken when a command began
#[derive(Debug, Clone)]
struct UndoFrame {
    snapshot: DocumentState,
    touched: BTreeSet<Address>,
}

/// Owner of the document state: writes, pending addresses and undo history
#[derive(Debug, Clone)]
pub struct Store {
    state: DocumentState,
    pending: BTreeSet<Address>,
    undo: VecDeque<UndoFrame>,
    redo: Vec<UndoFrame>,
    undo_depth: usize,
    commits: u64,
    clock: fn() -> i64,
}

fn wall_clock() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl Store {
    /// Create store over an existing state
    #[must_use]
    pub fn new(state: DocumentState) -> Self {
        Self {
            state,
            pending: BTreeSet::new(),
            undo: VecDeque::new(),
            redo: Vec::new(),
            undo_depth: DEFAULT_UNDO_DEPTH,
            commits: 0,
            clock: wall_clock,
        }
    }

    /// Set the maximum number of undo frames (at least one)
    #[must_use]
    pub fn with_undo_depth(mut self, depth: usize) -> Self {
        self.undo_depth = depth.max(1);
        self
    }

    /// Replace the recency clock
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    /// Current time as the store sees it, in milliseconds
    #[inline]
    #[must_use]
    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Number of commits so far
    #[inline]
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    /// Swap in a different state, dropping history and pending addresses
    ///
    /// Used when another instance's document is absorbed.
    pub fn replace_state(&mut self, state: DocumentState) {
        self.state = state;
        self.pending.clear();
        self.undo.clear();
        self.redo.clear();
        debug!("store state replaced");
    }

    // ------------------------------------------------------------------
    // Generic address writes
    // ------------------------------------------------------------------

    /// Write `value` at `address`
    ///
    /// Below entry level, missing intermediate objects and arrays are
    /// created. Writing at a collection field replaces the whole table.
    ///
    /// # Panics
    /// Panics if the address does not fit the model: unknown field, missing
    /// entry for a nested write, indexing a non-array, a value of the wrong
    /// shape.
    pub fn mutate(&mut self, address: &Address, value: Value) {
        let (field, rest) = split_address(address);
        match (field.is_collection(), rest) {
            (_, []) => write_field(&mut self.state, field, value),
            (true, [key]) => {
                let key = entry_key(key);
                expect_ok(self.state.set_entry_value(field, key, value), address);
            }
            (true, [key, nested @ ..]) => {
                let key = entry_key(key);
                let mut entry = match expect_ok(self.state.entry_value(field, key), address) {
                    Some(entry) => entry,
                    None => panic!("nested write into missing entry at {address}"),
                };
                write_nested(&mut entry, nested, value, address);
                expect_ok(self.state.set_entry_value(field, key, entry), address);
            }
            (false, nested) => {
                let mut whole = expect_ok(self.state.field_value(field), address);
                write_nested(&mut whole, nested, value, address);
                expect_ok(self.state.set_field_value(field, whole), address);
            }
        }
        debug!(%address, "mutate");
        self.record(address.clone());
    }

    /// Delete the value at `address`
    ///
    /// A field address resets the field, an entry address removes the entry,
    /// a finer address removes a nested key or list element.
    ///
    /// # Panics
    /// Panics on the same shape errors as [`Store::mutate`].
    pub fn delete(&mut self, address: &Address) {
        let (field, rest) = split_address(address);
        match (field.is_collection(), rest) {
            (_, []) => self.state.reset_field(field),
            (true, [key]) => {
                expect_ok(self.state.remove_entry(field, entry_key(key)), address);
            }
            (true, [key, nested @ ..]) => {
                let key = entry_key(key);
                if let Some(mut entry) = expect_ok(self.state.entry_value(field, key), address) {
                    delete_nested(&mut entry, nested, address);
                    expect_ok(self.state.set_entry_value(field, key, entry), address);
                }
            }
            (false, nested) => {
                let mut whole = expect_ok(self.state.field_value(field), address);
                delete_nested(&mut whole, nested, address);
                expect_ok(self.state.set_field_value(field, whole), address);
            }
        }
        debug!(%address, "delete");
        self.record(address.clone());
    }

    fn record(&mut self, address: Address) {
        if let Some(frame) = self.undo.back_mut() {
            frame.touched.insert(address.clone());
        }
        self.redo.clear();
        self.pending.insert(address);
    }

    // ------------------------------------------------------------------
    // Typed writers
    // ------------------------------------------------------------------

    /// Insert or replace an item
    pub fn put_item(&mut self, item: Item) {
        let address = Address::entry(Field::Items.name(), item.id);
        self.state.items.insert(item.id, item);
        self.record(address);
    }

    /// Modify an item in place; returns `false` if it does not exist
    pub fn update_item(&mut self, id: ItemId, f: impl FnOnce(&mut Item)) -> bool {
        let Some(item) = self.state.items.get_mut(&id) else {
            return false;
        };
        f(item);
        self.record(Address::entry(Field::Items.name(), id));
        true
    }

    /// Remove an item entry (payload and page entries are separate)
    pub fn remove_item_entry(&mut self, id: ItemId) -> Option<Item> {
        let removed = self.state.items.remove(&id);
        self.record(Address::entry(Field::Items.name(), id));
        removed
    }

    /// Insert or replace the payload of an item in its kind's table
    pub fn put_payload(&mut self, id: ItemId, payload: Payload) {
        let table = Field::payload_table(payload.kind());
        match payload {
            Payload::Text(p) => {
                self.state.text_items.insert(id, p);
            }
            Payload::Web(p) => {
                self.state.web_items.insert(id, p);
            }
            Payload::Image(p) => {
                self.state.image_items.insert(id, p);
            }
            Payload::Code(p) => {
                self.state.code_items.insert(id, p);
            }
            Payload::Formula(p) => {
                self.state.formula_items.insert(id, p);
            }
        }
        self.record(Address::entry(table.name(), id));
    }

    /// Remove the payload of an item from its kind's table
    pub fn remove_payload(&mut self, id: ItemId, kind: ItemKind) {
        match kind {
            ItemKind::Text => {
                self.state.text_items.remove(&id);
            }
            ItemKind::Web => {
                self.state.web_items.remove(&id);
            }
            ItemKind::Image => {
                self.state.image_items.remove(&id);
            }
            ItemKind::Code => {
                self.state.code_items.remove(&id);
            }
            ItemKind::Formula => {
                self.state.formula_items.remove(&id);
            }
        }
        self.record(Address::entry(Field::payload_table(kind).name(), id));
    }

    /// Insert or replace a page entry
    pub fn put_page(&mut self, id: ItemId, page: Page) {
        self.state.pages.insert(id, page);
        self.record(Address::entry(Field::Pages.name(), id));
    }

    /// Remove a page entry
    pub fn remove_page_entry(&mut self, id: ItemId) -> Option<Page> {
        let removed = self.state.pages.remove(&id);
        self.record(Address::entry(Field::Pages.name(), id));
        removed
    }

    /// Insert or replace a workspace
    pub fn put_workspace(&mut self, workspace: Workspace) {
        let address = Address::entry(Field::Workspaces.name(), &workspace.id);
        self.state.workspaces.insert(workspace.id.clone(), workspace);
        self.record(address);
    }

    /// Modify a workspace in place; returns `false` if it does not exist
    pub fn update_workspace(&mut self, id: &WorkspaceId, f: impl FnOnce(&mut Workspace)) -> bool {
        let Some(workspace) = self.state.workspaces.get_mut(id) else {
            return false;
        };
        f(workspace);
        self.record(Address::entry(Field::Workspaces.name(), id));
        true
    }

    /// Replace the mounted-page list
    pub fn set_mounted_pages(&mut self, pages: Vec<ItemId>) {
        self.state.mounted_pages = pages;
        self.record(Address::field(Field::MountedPages.name()));
    }

    /// Replace the dialog state
    pub fn set_dialog(&mut self, dialog: Option<DialogState>) {
        self.state.dialog = dialog;
        self.record(Address::field(Field::Dialog.name()));
    }

    /// Bind key chords to an action; an empty list removes the binding
    pub fn set_key_binding(&mut self, action: impl Into<String>, chords: Vec<String>) {
        let action = action.into();
        if chords.is_empty() {
            self.state.key_bindings.remove(&action);
        } else {
            self.state.key_bindings.insert(action, chords);
        }
        self.record(Address::field(Field::KeyBindings.name()));
    }

    /// Hand out the next item id
    pub fn allocate_item_id(&mut self) -> ItemId {
        let id = self.state.next_item_id;
        self.state.next_item_id = ItemId(id.0 + 1);
        self.record(Address::field(Field::NextItemId.name()));
        id
    }

    // ------------------------------------------------------------------
    // Commit and undo
    // ------------------------------------------------------------------

    /// Mark the end of a command
    ///
    /// # Panics
    /// In debug builds, panics if the document violates a structural
    /// invariant.
    pub fn commit(&mut self) {
        self.commits += 1;
        trace!(commit = self.commits, pending = self.pending.len(), "commit");
        if cfg!(debug_assertions) {
            if let Err(violation) = self.state.check_integrity() {
                panic!("document integrity violated at commit {}: {violation}", self.commits);
            }
        }
    }

    /// Open a new undo frame holding the current state
    ///
    /// A frame that recorded nothing is reused rather than stacked. The redo
    /// stack is cleared and the oldest frame dropped beyond the depth limit.
    pub fn save_snapshot_for_undo(&mut self) {
        let frame = UndoFrame {
            snapshot: self.state.clone(),
            touched: BTreeSet::new(),
        };
        match self.undo.back_mut() {
            Some(top) if top.touched.is_empty() => *top = frame,
            _ => self.undo.push_back(frame),
        }
        while self.undo.len() > self.undo_depth {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Check if there is anything to undo
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo.iter().any(|f| !f.touched.is_empty())
    }

    /// Check if there is anything to redo
    #[inline]
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Revert the most recent command
    ///
    /// Returns the addresses whose value changed, or `None` if there is
    /// nothing to undo. Those addresses are also added to the pending set.
    pub fn undo(&mut self) -> Option<BTreeSet<Address>> {
        while self.undo.back().is_some_and(|f| f.touched.is_empty()) {
            self.undo.pop_back();
        }
        let frame = self.undo.pop_back()?;
        let current = std::mem::replace(&mut self.state, frame.snapshot);
        self.pending.extend(frame.touched.iter().cloned());
        self.redo.push(UndoFrame {
            snapshot: current,
            touched: frame.touched.clone(),
        });
        debug!(touched = frame.touched.len(), "undo");
        Some(frame.touched)
    }

    /// Re-apply the most recently undone command
    ///
    /// Returns the addresses whose value changed, or `None` if there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Option<BTreeSet<Address>> {
        let frame = self.redo.pop()?;
        let current = std::mem::replace(&mut self.state, frame.snapshot);
        self.pending.extend(frame.touched.iter().cloned());
        self.undo.push_back(UndoFrame {
            snapshot: current,
            touched: frame.touched.clone(),
        });
        debug!(touched = frame.touched.len(), "redo");
        Some(frame.touched)
    }

    // ------------------------------------------------------------------
    // Pending set
    // ------------------------------------------------------------------

    /// Addresses changed since the last save
    #[inline]
    #[must_use]
    pub fn pending_addresses(&self) -> &BTreeSet<Address> {
        &self.pending
    }

    /// Check if anything is waiting to be saved
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Take the pending set, leaving it empty
    pub fn take_pending(&mut self) -> BTreeSet<Address> {
        std::mem::take(&mut self.pending)
    }

    /// Forget all pending addresses
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Put addresses back into the pending set (after a failed save)
    pub fn restore_pending(&mut self, addresses: impl IntoIterator<Item = Address>) {
        self.pending.extend(addresses);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DocumentState::fresh(wall_clock()))
    }
}

fn split_address(address: &Address) -> (Field, &[Segment]) {
    let Some((first, rest)) = address.segments().split_first() else {
        panic!("cannot write at the document root");
    };
    let field = first
        .as_key()
        .and_then(Field::from_name)
        .unwrap_or_else(|| panic!("unknown field in address {address}"));
    (field, rest)
}

fn entry_key(segment: &Segment) -> &str {
    segment
        .as_key()
        .unwrap_or_else(|| panic!("collection entry key must be a key segment, got {segment}"))
}

fn expect_ok<T, E: std::fmt::Display>(result: Result<T, E>, address: &Address) -> T {
    result.unwrap_or_else(|e| panic!("invalid write at {address}: {e}"))
}

fn write_field(state: &mut DocumentState, field: Field, value: Value) {
    if field.is_collection() {
        let Value::Object(entries) = value else {
            panic!("collection field {field} must be written as an object");
        };
        state.reset_field(field);
        for (key, entry) in entries {
            if let Err(e) = state.set_entry_value(field, &key, entry) {
                panic!("invalid entry {field}.{key}: {e}");
            }
        }
    } else if let Err(e) = state.set_field_value(field, value) {
        panic!("invalid value for {field}: {e}");
    }
}

fn empty_container(next: &Segment) -> Value {
    match next {
        Segment::Key(_) => Value::Object(Map::new()),
        Segment::Index(_) => Value::Array(Vec::new()),
    }
}

fn write_nested(target: &mut Value, segments: &[Segment], value: Value, address: &Address) {
    let Some((last, parents)) = segments.split_last() else {
        *target = value;
        return;
    };
    let mut cursor = target;
    for (i, segment) in parents.iter().enumerate() {
        let next = &segments[i + 1];
        if cursor.is_null() {
            *cursor = empty_container(segment);
        }
        cursor = match (segment, cursor) {
            (Segment::Key(key), Value::Object(map)) => {
                map.entry(key.clone()).or_insert_with(|| empty_container(next))
            }
            (Segment::Index(index), Value::Array(list)) => {
                if *index == list.len() {
                    list.push(empty_container(next));
                }
                match list.get_mut(*index) {
                    Some(slot) => slot,
                    None => panic!("index {index} out of bounds at {address}"),
                }
            }
            (segment, _) => panic!("segment {segment} does not fit the value shape at {address}"),
        };
    }
    if cursor.is_null() {
        *cursor = empty_container(last);
    }
    match (last, cursor) {
        (Segment::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
        }
        (Segment::Index(index), Value::Array(list)) if *index < list.len() => list[*index] = value,
        (Segment::Index(index), Value::Array(list)) if *index == list.len() => list.push(value),
        (segment, _) => panic!("segment {segment} does not fit the value shape at {address}"),
    }
}

fn delete_nested(target: &mut Value, segments: &[Segment], address: &Address) {
    let Some((last, parents)) = segments.split_last() else {
        *target = Value::Null;
        return;
    };
    let mut cursor = target;
    for segment in parents {
        cursor = match (segment, cursor) {
            (Segment::Key(key), Value::Object(map)) => match map.get_mut(key) {
                Some(next) => next,
                None => return,
            },
            (Segment::Index(index), Value::Array(list)) => match list.get_mut(*index) {
                Some(next) => next,
                None => return,
            },
            (segment, _) => panic!("segment {segment} does not fit the value shape at {address}"),
        };
    }
    match (last, cursor) {
        (Segment::Key(key), Value::Object(map)) => {
            map.remove(key);
        }
        (Segment::Index(index), Value::Array(list)) => {
            if *index < list.len() {
                list.remove(*index);
            }
        }
        (segment, _) => panic!("segment {segment} does not fit the value shape at {address}"),
    }
}
