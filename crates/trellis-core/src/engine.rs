//! The engine context object
//!
//! [`Engine`] owns the document store, the search index, the sync session
//! and the configuration. Commands go through it so the search index is
//! updated in the same call that changed the text.
//!
//! A command is bracketed by [`Engine::begin_command`] and
//! [`Engine::commit`]; everything in between is undone as one step.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use serde_json::Value;
use trellis_model::{
    paths, Address, DialogState, DisplayMode, DocumentState, Edge, GraphError, ItemId, ItemPath, Payload, Store,
    Workspace,
};
use trellis_search::{affected_items, SearchIndex};
use trellis_sync::{FragmentStore, IdentityProvider, SaveOutcome, SyncSession};

/// Document engine for one device
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: Store,
    search: SearchIndex,
    sync: Option<SyncSession>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl Engine {
    /// Engine over a fresh document, not attached to any fragment store
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::with_state(config, DocumentState::fresh(now_millis()))
    }

    /// Engine over an existing document, not attached to any fragment store
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn with_state(config: EngineConfig, state: DocumentState) -> EngineResult<Self> {
        config.validate()?;
        let store = Store::new(state).with_undo_depth(config.undo_depth);
        let mut engine = Self {
            config,
            search: SearchIndex::new(),
            store,
            sync: None,
        };
        engine.ensure_workspace();
        engine.search = SearchIndex::build(engine.store.state());
        Ok(engine)
    }

    /// Start up against a fragment store
    ///
    /// Restores this instance's saved document, or starts a fresh one, then
    /// saves once. That first save either writes the full fragment set or
    /// absorbs a newer document written by another instance.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid, the stored document
    /// cannot be read, or the first save fails
    pub async fn open(
        config: EngineConfig,
        fragments: Arc<dyn FragmentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> EngineResult<(Self, SaveOutcome)> {
        config.validate()?;
        let (session, restored) = SyncSession::load(fragments, identity).await?;
        let restored_any = restored.is_some();
        let mut engine = Self::with_state(config, restored.unwrap_or_else(|| DocumentState::fresh(now_millis())))?;
        engine.sync = Some(session);
        info!(
            "Opened engine (restored: {}, workspace: {})",
            restored_any, engine.config.workspace_id
        );
        let outcome = engine.save().await?;
        Ok((engine, outcome))
    }

    /// Use `clock` for item timestamps
    #[must_use]
    pub fn with_clock(self, clock: fn() -> i64) -> Self {
        Self {
            store: self.store.with_clock(clock),
            ..self
        }
    }

    fn ensure_workspace(&mut self) {
        let id = &self.config.workspace_id;
        if self.store.state().workspace(id).is_none() {
            self.store
                .put_workspace(Workspace::new(id.clone(), self.config.workspace_name.clone()));
            info!("Created workspace {} ({})", id, self.config.workspace_name);
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Current document
    #[inline]
    #[must_use]
    pub fn state(&self) -> &DocumentState {
        self.store.state()
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Search index
    #[inline]
    #[must_use]
    pub fn search_index(&self) -> &SearchIndex {
        &self.search
    }

    /// Sync session, if attached
    #[inline]
    #[must_use]
    pub fn sync_session(&self) -> Option<&SyncSession> {
        self.sync.as_ref()
    }

    /// This device's workspace
    #[must_use]
    pub fn workspace(&self) -> Option<&Workspace> {
        self.store.state().workspace(&self.config.workspace_id)
    }

    fn excluded(&self) -> BTreeSet<ItemId> {
        self.workspace()
            .map(|ws| ws.excluded_item_ids.clone())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Command boundaries
    // ------------------------------------------------------------------

    /// Open an undo step
    pub fn begin_command(&mut self) {
        self.store.save_snapshot_for_undo();
    }

    /// Close the current command
    pub fn commit(&mut self) {
        self.store.commit();
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Create an item with no parents
    pub fn create_item(&mut self, payload: Payload) -> ItemId {
        let id = self.store.create_item(payload);
        self.search.reindex_item(self.store.state(), id);
        id
    }

    /// Create an item under `parent`
    ///
    /// # Errors
    /// Returns error if `parent` does not exist; nothing is created then
    pub fn create_child(&mut self, parent: ItemId, payload: Payload, index: Option<usize>) -> EngineResult<ItemId> {
        if !self.store.state().contains_item(parent) {
            return Err(GraphError::ItemNotFound(parent).into());
        }
        let id = self.create_item(payload);
        self.store.add_edge(parent, id, index)?;
        Ok(id)
    }

    /// Attach `child` under one more parent
    ///
    /// # Errors
    /// Returns error if the edge is not allowed
    pub fn add_parent(&mut self, child: ItemId, parent: ItemId, index: Option<usize>) -> EngineResult<()> {
        Ok(self.store.add_edge(parent, child, index)?)
    }

    /// Detach `child` from one parent, returning the removed edge
    ///
    /// # Errors
    /// Returns error if the edge does not exist
    pub fn remove_parent(&mut self, child: ItemId, parent: ItemId) -> EngineResult<Edge> {
        Ok(self.store.remove_edge(parent, child)?)
    }

    /// Move `child` from `old_parent` to `new_parent`
    ///
    /// # Errors
    /// Returns error if the old edge is missing or the new one is not allowed
    pub fn move_item(
        &mut self,
        child: ItemId,
        old_parent: ItemId,
        new_parent: ItemId,
        index: Option<usize>,
    ) -> EngineResult<()> {
        Ok(self.store.move_edge(old_parent, new_parent, child, index)?)
    }

    /// Move `child` to position `index` under `parent` (clamped)
    ///
    /// # Errors
    /// Returns error if the edge does not exist
    pub fn reorder_child(&mut self, parent: ItemId, child: ItemId, index: usize) -> EngineResult<()> {
        Ok(self.store.reorder_child(parent, child, index)?)
    }

    /// Replace the labels on one occurrence of `child`
    ///
    /// # Errors
    /// Returns error if the edge does not exist
    pub fn set_edge_labels(&mut self, parent: ItemId, child: ItemId, labels: BTreeSet<String>) -> EngineResult<()> {
        Ok(self.store.set_edge_labels(parent, child, labels)?)
    }

    /// Expand or collapse one occurrence of `child`
    ///
    /// # Errors
    /// Returns error if the edge does not exist
    pub fn set_collapsed(&mut self, parent: ItemId, child: ItemId, collapsed: bool) -> EngineResult<()> {
        Ok(self.store.set_collapsed(parent, child, collapsed)?)
    }

    /// Delete an item and every descendant left without a parent
    ///
    /// # Errors
    /// Returns error for the root or a missing item
    pub fn delete_item(&mut self, id: ItemId) -> EngineResult<Vec<ItemId>> {
        let deleted = self.store.delete_item(id)?;
        for id in &deleted {
            self.search.remove_item(*id);
        }
        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Replace an item's payload, returning the old one
    ///
    /// # Errors
    /// Returns error if the item is missing or of another kind
    pub fn set_payload(&mut self, id: ItemId, payload: Payload) -> EngineResult<Payload> {
        let old = self.store.set_payload(id, payload)?;
        self.search.reindex_item(self.store.state(), id);
        Ok(old)
    }

    /// Replace the text of a text item
    ///
    /// # Errors
    /// Returns error if the item is missing or not a text item
    pub fn set_text(&mut self, id: ItemId, text: impl Into<String>) -> EngineResult<()> {
        self.set_payload(id, Payload::text(text)).map(|_| ())
    }

    /// Replace the class tags of an item
    ///
    /// # Errors
    /// Returns error if the item is missing
    pub fn set_classes(&mut self, id: ItemId, classes: BTreeSet<String>) -> EngineResult<()> {
        Ok(self.store.set_classes(id, classes)?)
    }

    /// Set or clear the citation of an item
    ///
    /// # Errors
    /// Returns error if the item is missing
    pub fn set_citation(&mut self, id: ItemId, citation: Option<String>) -> EngineResult<()> {
        Ok(self.store.set_citation(id, citation)?)
    }

    /// Mark an item as recently used
    ///
    /// # Errors
    /// Returns error if the item is missing
    pub fn touch(&mut self, id: ItemId) -> EngineResult<()> {
        Ok(self.store.touch(id)?)
    }

    // ------------------------------------------------------------------
    // Raw writes
    // ------------------------------------------------------------------

    /// Write `value` at `address` and reindex whatever text it reached
    ///
    /// A write to a whole payload table rebuilds the index.
    ///
    /// # Panics
    /// Panics if the address runs through a value of the wrong shape
    pub fn mutate(&mut self, address: &Address, value: Value) {
        self.store.mutate(address, value);
        self.reconcile_search(&BTreeSet::from([address.clone()]));
    }

    /// Remove the value at `address` and reindex whatever text it held
    ///
    /// # Panics
    /// Panics if the address runs through a value of the wrong shape
    pub fn delete(&mut self, address: &Address) {
        self.store.delete(address);
        self.reconcile_search(&BTreeSet::from([address.clone()]));
    }

    // ------------------------------------------------------------------
    // Pages and workspace
    // ------------------------------------------------------------------

    /// Make an item a page
    ///
    /// # Errors
    /// Returns error if the item does not exist
    pub fn make_page(&mut self, id: ItemId) -> EngineResult<()> {
        Ok(self.store.make_page(id)?)
    }

    /// Mount a page as the most recent, dropping the least recent over the cap
    ///
    /// # Errors
    /// Returns error if `id` is not a page
    pub fn mount_page(&mut self, id: ItemId) -> EngineResult<()> {
        Ok(self.store.mount_page(id, self.config.max_mounted_pages)?)
    }

    /// Stop treating an item as a page
    ///
    /// # Errors
    /// Returns error for the root or an item that is not a page
    pub fn remove_page(&mut self, id: ItemId) -> EngineResult<()> {
        Ok(self.store.remove_page(id)?)
    }

    /// Drop a page from the mounted list
    pub fn unmount_page(&mut self, id: ItemId) {
        self.store.unmount_page(id);
    }

    /// Set the selection target and anchor of a page
    ///
    /// # Errors
    /// Returns error if `page` is not a page or a path is not valid in it
    pub fn set_page_selection(
        &mut self,
        page: ItemId,
        target: Option<ItemPath>,
        anchor: Option<ItemPath>,
    ) -> EngineResult<()> {
        Ok(self.store.set_page_selection(page, target, anchor)?)
    }

    /// Set the default display mode of a page
    ///
    /// # Errors
    /// Returns error if `page` is not a page
    pub fn set_display_mode(&mut self, page: ItemId, display_mode: DisplayMode) -> EngineResult<()> {
        Ok(self.store.set_display_mode(page, display_mode)?)
    }

    /// Show `page` in this device's workspace
    ///
    /// # Errors
    /// Returns error if `page` is not a page
    pub fn set_active_page(&mut self, page: ItemId) -> EngineResult<()> {
        self.ensure_workspace();
        Ok(self.store.set_active_page(&self.config.workspace_id, page)?)
    }

    /// Hide an item and its descendants on this device
    ///
    /// # Errors
    /// Returns error for the root or a missing item
    pub fn exclude_item(&mut self, id: ItemId) -> EngineResult<()> {
        self.ensure_workspace();
        Ok(self.store.exclude_item(&self.config.workspace_id, id)?)
    }

    /// Show a previously hidden item again
    ///
    /// # Errors
    /// Returns error if the workspace cannot be found
    pub fn include_item(&mut self, id: ItemId) -> EngineResult<()> {
        self.ensure_workspace();
        Ok(self.store.include_item(&self.config.workspace_id, id)?)
    }

    // ------------------------------------------------------------------
    // Key bindings and dialog
    // ------------------------------------------------------------------

    /// Bind key chords to an action; an empty list removes the binding
    pub fn set_key_binding(&mut self, action: impl Into<String>, chords: Vec<String>) {
        self.store.set_key_binding(action, chords);
    }

    /// Remove the binding of an action
    pub fn remove_key_binding(&mut self, action: &str) {
        self.store.remove_key_binding(action);
    }

    /// Open a dialog on an occurrence
    pub fn open_dialog(&mut self, kind: impl Into<String>, target: Option<ItemPath>) {
        self.store.open_dialog(kind, target);
    }

    /// Replace or clear the dialog state
    pub fn set_dialog(&mut self, dialog: Option<DialogState>) {
        self.store.set_dialog(dialog);
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Revert the most recent command; `false` if there is none
    pub fn undo(&mut self) -> bool {
        match self.store.undo() {
            Some(touched) => {
                self.reconcile_search(&touched);
                true
            }
            None => false,
        }
    }

    /// Re-apply the most recently undone command; `false` if there is none
    pub fn redo(&mut self) -> bool {
        match self.store.redo() {
            Some(touched) => {
                self.reconcile_search(&touched);
                true
            }
            None => false,
        }
    }

    fn reconcile_search(&mut self, touched: &BTreeSet<Address>) {
        match affected_items(touched) {
            Some(ids) => {
                for id in ids {
                    self.search.reindex_item(self.store.state(), id);
                }
            }
            None => self.search = SearchIndex::build(self.store.state()),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Items whose text contains `query`, newest first, leaving out what
    /// this device's workspace hides
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<ItemId> {
        self.search.search(
            self.store.state(),
            query,
            &self.excluded(),
            self.config.search_result_limit,
        )
    }

    /// Every path at which `id` is currently shown
    #[must_use]
    pub fn displayed_paths(&self, id: ItemId) -> Vec<ItemPath> {
        paths::displayed_paths(self.store.state(), id)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Save pending changes, or absorb a newer document from another instance
    ///
    /// After a restart the workspace is recreated if the absorbed document
    /// lacks it and the search index is rebuilt.
    ///
    /// # Errors
    /// Returns error if the engine is detached or the save fails; the
    /// document and its pending changes are untouched then
    pub async fn save(&mut self) -> EngineResult<SaveOutcome> {
        let session = self.sync.as_mut().ok_or(EngineError::Detached)?;
        let outcome = session.save(&mut self.store).await?;
        if outcome.is_restarted() {
            self.ensure_workspace();
            self.search = SearchIndex::build(self.store.state());
        }
        debug!(?outcome, "save finished");
        Ok(outcome)
    }
}
