//! Graph operations on the outline DAG
//!
//! Structural edits as methods on [`Store`]. Each operation validates first
//! and only then writes, so a rejected operation leaves the document as it
//! was. All writes go through the store's typed writers and are therefore
//! recorded for persistence and undo.

use crate::error::{GraphError, GraphResult};
use crate::paths::{is_valid_path, Ancestors};
use crate::store::Store;
use crate::types::{DialogState, DisplayMode, Edge, Item, Page, Payload, WorkspaceId, ROOT_ITEM_ID};
use std::collections::{BTreeSet, HashSet};
use trellis_path::{ItemId, ItemPath};

impl Store {
    fn require_item(&self, id: ItemId) -> GraphResult<&Item> {
        self.state().item(id).ok_or(GraphError::ItemNotFound(id))
    }

    fn require_edge(&self, parent: ItemId, child: ItemId) -> GraphResult<&Edge> {
        self.require_item(parent)?;
        self.require_item(child)?
            .parents
            .get(&parent)
            .ok_or_else(|| GraphError::edge_not_found(parent, child))
    }

    fn require_page(&self, id: ItemId) -> GraphResult<&Page> {
        self.require_item(id)?;
        self.state().page(id).ok_or(GraphError::NotAPage(id))
    }

    /// Check that `child` may be placed under `parent`
    fn validate_new_edge(&self, parent: ItemId, child: ItemId) -> GraphResult<()> {
        self.require_item(parent)?;
        let existing = self.require_item(child)?;
        if parent == child {
            return Err(GraphError::SelfEdge(child));
        }
        if child == ROOT_ITEM_ID {
            return Err(GraphError::RootImmutable("a child"));
        }
        if existing.parents.contains_key(&parent) {
            return Err(GraphError::DuplicateEdge { parent, child });
        }
        if Ancestors::new(self.state(), parent).any(|a| a == child) {
            return Err(GraphError::CycleDetected { parent, child });
        }
        Ok(())
    }

    fn link(&mut self, parent: ItemId, child: ItemId, index: Option<usize>, edge: Edge) {
        self.update_item(parent, |item| {
            let at = index.map_or(item.child_item_ids.len(), |i| i.min(item.child_item_ids.len()));
            item.child_item_ids.insert(at, child);
        });
        self.update_item(child, |item| {
            item.parents.insert(parent, edge);
        });
    }

    fn unlink(&mut self, parent: ItemId, child: ItemId) -> Option<Edge> {
        self.update_item(parent, |item| item.child_item_ids.retain(|c| *c != child));
        let mut removed = None;
        self.update_item(child, |item| removed = item.parents.remove(&parent));
        removed
    }

    /// Create a detached item holding `payload`
    pub fn create_item(&mut self, payload: Payload) -> ItemId {
        let id = self.allocate_item_id();
        let item = Item::new(id, payload.kind(), self.now());
        tracing::debug!("Creating {} item {}", item.kind, id);
        self.put_item(item);
        self.put_payload(id, payload);
        id
    }

    /// Place `child` under `parent` at `index` (appended if `None` or past
    /// the end)
    ///
    /// # Errors
    /// Returns error if either item is missing, the edge already exists,
    /// `child` is the root, or the edge would create a cycle
    pub fn add_edge(&mut self, parent: ItemId, child: ItemId, index: Option<usize>) -> GraphResult<()> {
        self.validate_new_edge(parent, child)?;
        self.link(parent, child, index, Edge::default());
        tracing::debug!("Added edge {} -> {}", parent, child);
        Ok(())
    }

    /// Detach `child` from `parent`; returns the edge metadata
    ///
    /// The child survives even if this was its last parent.
    ///
    /// # Errors
    /// Returns error if the edge does not exist
    pub fn remove_edge(&mut self, parent: ItemId, child: ItemId) -> GraphResult<Edge> {
        self.require_edge(parent, child)?;
        let edge = self.unlink(parent, child).unwrap_or_default();
        tracing::debug!("Removed edge {} -> {}", parent, child);
        Ok(edge)
    }

    /// Move `child` from `old_parent` to `new_parent`, keeping edge metadata
    ///
    /// # Errors
    /// Returns error if the old edge is missing or the new one is not
    /// allowed; nothing is changed in that case
    pub fn move_edge(
        &mut self,
        old_parent: ItemId,
        new_parent: ItemId,
        child: ItemId,
        index: Option<usize>,
    ) -> GraphResult<()> {
        if old_parent == new_parent {
            let len = self.require_item(new_parent)?.child_item_ids.len();
            return self.reorder_child(new_parent, child, index.unwrap_or(len));
        }
        self.require_edge(old_parent, child)?;
        self.validate_new_edge(new_parent, child)?;
        let edge = self.unlink(old_parent, child).unwrap_or_default();
        self.link(new_parent, child, index, edge);
        tracing::debug!("Moved {} from {} to {}", child, old_parent, new_parent);
        Ok(())
    }

    /// Move `child` to position `index` among its siblings (clamped)
    ///
    /// # Errors
    /// Returns error if the edge does not exist
    pub fn reorder_child(&mut self, parent: ItemId, child: ItemId, index: usize) -> GraphResult<()> {
        self.require_edge(parent, child)?;
        self.update_item(parent, |item| {
            item.child_item_ids.retain(|c| *c != child);
            let at = index.min(item.child_item_ids.len());
            item.child_item_ids.insert(at, child);
        });
        Ok(())
    }

    /// Collapse or expand `child` in its occurrence under `parent`
    ///
    /// # Errors
    /// Returns error if the edge does not exist
    pub fn set_collapsed(&mut self, parent: ItemId, child: ItemId, collapsed: bool) -> GraphResult<()> {
        if self.require_edge(parent, child)?.collapsed == collapsed {
            return Ok(());
        }
        self.update_item(child, |item| {
            if let Some(edge) = item.parents.get_mut(&parent) {
                edge.collapsed = collapsed;
            }
        });
        Ok(())
    }

    /// Replace the labels on the edge `parent -> child`
    ///
    /// # Errors
    /// Returns error if the edge does not exist
    pub fn set_edge_labels(&mut self, parent: ItemId, child: ItemId, labels: BTreeSet<String>) -> GraphResult<()> {
        self.require_edge(parent, child)?;
        self.update_item(child, |item| {
            if let Some(edge) = item.parents.get_mut(&parent) {
                edge.labels = labels;
            }
        });
        Ok(())
    }

    /// Replace the payload of an item; returns the previous one
    ///
    /// # Errors
    /// Returns error if the item is missing or the payload is of another kind
    pub fn set_payload(&mut self, id: ItemId, payload: Payload) -> GraphResult<Payload> {
        let expected = self.require_item(id)?.kind;
        if payload.kind() != expected {
            return Err(GraphError::KindMismatch {
                id,
                expected,
                actual: payload.kind(),
            });
        }
        let old = self.state().payload(id).ok_or(GraphError::ItemNotFound(id))?;
        self.put_payload(id, payload);
        Ok(old)
    }

    /// Replace the class tags of an item
    ///
    /// # Errors
    /// Returns error if the item is missing
    pub fn set_classes(&mut self, id: ItemId, classes: BTreeSet<String>) -> GraphResult<()> {
        self.require_item(id)?;
        self.update_item(id, |item| item.classes = classes);
        Ok(())
    }

    /// Set or clear the citation of an item
    ///
    /// # Errors
    /// Returns error if the item is missing
    pub fn set_citation(&mut self, id: ItemId, citation: Option<String>) -> GraphResult<()> {
        self.require_item(id)?;
        self.update_item(id, |item| item.citation = citation);
        Ok(())
    }

    /// Mark an item as recently used
    ///
    /// # Errors
    /// Returns error if the item is missing
    pub fn touch(&mut self, id: ItemId) -> GraphResult<()> {
        self.require_item(id)?;
        let now = self.now();
        self.update_item(id, |item| item.timestamp = now);
        Ok(())
    }

    /// Delete an item and every descendant left without a parent
    ///
    /// Payloads, page entries, mounted-page references, workspace exclusions
    /// and page selections through deleted items are cleaned up. Returns the
    /// deleted ids in deletion order.
    ///
    /// # Errors
    /// Returns error if the item is missing or is the root
    pub fn delete_item(&mut self, id: ItemId) -> GraphResult<Vec<ItemId>> {
        if id == ROOT_ITEM_ID {
            return Err(GraphError::RootImmutable("deleted"));
        }
        let parents: Vec<ItemId> = self.require_item(id)?.parents.keys().copied().collect();
        for parent in parents {
            self.unlink(parent, id);
        }

        let mut deleted = Vec::new();
        let mut queue = vec![id];
        while let Some(current) = queue.pop() {
            let Some(item) = self.remove_item_entry(current) else {
                continue;
            };
            for child in &item.child_item_ids {
                let mut orphaned = false;
                self.update_item(*child, |c| {
                    c.parents.remove(&current);
                    orphaned = c.parents.is_empty();
                });
                if orphaned {
                    queue.push(*child);
                }
            }
            self.remove_payload(current, item.kind);
            if self.state().is_page(current) {
                self.remove_page_entry(current);
            }
            deleted.push(current);
        }

        self.forget_items(&deleted.iter().copied().collect());
        tracing::debug!("Deleted {} items starting at {}", deleted.len(), id);
        Ok(deleted)
    }

    /// Drop references to deleted items from pages, mounts and workspaces
    fn forget_items(&mut self, gone: &HashSet<ItemId>) {
        let mounted = self.state().mounted_pages();
        if mounted.iter().any(|p| gone.contains(p)) {
            let mut kept: Vec<ItemId> = mounted.iter().copied().filter(|p| !gone.contains(p)).collect();
            if kept.is_empty() {
                kept.push(ROOT_ITEM_ID);
            }
            self.set_mounted_pages(kept);
        }

        let stale_pages: Vec<(ItemId, Page)> = self
            .state()
            .pages
            .iter()
            .filter_map(|(id, page)| {
                let through = |p: &Option<ItemPath>| p.as_ref().is_some_and(|p| p.iter().any(|i| gone.contains(&i)));
                if through(&page.target) || through(&page.anchor) {
                    Some((*id, Page { target: None, anchor: None, ..page.clone() }))
                } else {
                    None
                }
            })
            .collect();
        for (id, page) in stale_pages {
            self.put_page(id, page);
        }

        let stale_workspaces: Vec<WorkspaceId> = self
            .state()
            .workspaces()
            .filter(|w| gone.contains(&w.active_page_id) || w.excluded_item_ids.iter().any(|e| gone.contains(e)))
            .map(|w| w.id.clone())
            .collect();
        for ws in stale_workspaces {
            self.update_workspace(&ws, |w| {
                w.excluded_item_ids.retain(|e| !gone.contains(e));
                if gone.contains(&w.active_page_id) {
                    w.active_page_id = ROOT_ITEM_ID;
                }
            });
        }

        if self
            .state()
            .dialog()
            .and_then(|d| d.target.as_ref())
            .is_some_and(|p| p.iter().any(|i| gone.contains(&i)))
        {
            self.set_dialog(None);
        }
    }

    // ------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------

    /// Give an item a page entry (no-op if it already has one)
    ///
    /// # Errors
    /// Returns error if the item is missing
    pub fn make_page(&mut self, id: ItemId) -> GraphResult<()> {
        self.require_item(id)?;
        if !self.state().is_page(id) {
            self.put_page(id, Page::default());
        }
        Ok(())
    }

    /// Remove the page entry of an item and unmount it
    ///
    /// # Errors
    /// Returns error if the item is the root or not a page
    pub fn remove_page(&mut self, id: ItemId) -> GraphResult<()> {
        if id == ROOT_ITEM_ID {
            return Err(GraphError::RootImmutable("un-paged"));
        }
        self.require_page(id)?;
        self.remove_page_entry(id);
        self.forget_page(id);
        Ok(())
    }

    fn forget_page(&mut self, id: ItemId) {
        if self.state().mounted_pages().contains(&id) {
            self.unmount_page(id);
        }
        let active: Vec<WorkspaceId> = self
            .state()
            .workspaces()
            .filter(|w| w.active_page_id == id)
            .map(|w| w.id.clone())
            .collect();
        for ws in active {
            self.update_workspace(&ws, |w| w.active_page_id = ROOT_ITEM_ID);
        }
    }

    /// Set the selection target and anchor of a page
    ///
    /// # Errors
    /// Returns error if `page` is not a page or a path does not start at it
    /// and walk existing edges
    pub fn set_page_selection(
        &mut self,
        page: ItemId,
        target: Option<ItemPath>,
        anchor: Option<ItemPath>,
    ) -> GraphResult<()> {
        let current = self.require_page(page)?.clone();
        for path in target.iter().chain(anchor.iter()) {
            if path.root() != page || !is_valid_path(self.state(), path) {
                return Err(GraphError::InvalidPath(path.to_string()));
            }
        }
        self.put_page(page, Page { target, anchor, ..current });
        Ok(())
    }

    /// Set the default display mode of a page
    ///
    /// # Errors
    /// Returns error if `page` is not a page
    pub fn set_display_mode(&mut self, page: ItemId, display_mode: DisplayMode) -> GraphResult<()> {
        let current = self.require_page(page)?.clone();
        if current.display_mode != display_mode {
            self.put_page(page, Page { display_mode, ..current });
        }
        Ok(())
    }

    /// Bring a page to the front of the mounted list, keeping at most
    /// `limit` entries
    ///
    /// # Errors
    /// Returns error if `id` is not a page
    pub fn mount_page(&mut self, id: ItemId, limit: usize) -> GraphResult<()> {
        self.require_page(id)?;
        let mut mounted = vec![id];
        mounted.extend(self.state().mounted_pages().iter().copied().filter(|p| *p != id));
        mounted.truncate(limit.max(1));
        if mounted != self.state().mounted_pages() {
            self.set_mounted_pages(mounted);
        }
        Ok(())
    }

    /// Remove a page from the mounted list; the root is remounted if the list
    /// would become empty
    pub fn unmount_page(&mut self, id: ItemId) {
        let mounted = self.state().mounted_pages();
        if !mounted.contains(&id) {
            return;
        }
        let mut kept: Vec<ItemId> = mounted.iter().copied().filter(|p| *p != id).collect();
        if kept.is_empty() {
            kept.push(ROOT_ITEM_ID);
        }
        self.set_mounted_pages(kept);
    }

    // ------------------------------------------------------------------
    // Workspaces
    // ------------------------------------------------------------------

    fn require_workspace(&self, ws: &WorkspaceId) -> GraphResult<()> {
        self.state()
            .workspace(ws)
            .map(|_| ())
            .ok_or_else(|| GraphError::WorkspaceNotFound(ws.clone()))
    }

    /// Hide an item and its descendants in a workspace
    ///
    /// # Errors
    /// Returns error if the item is the root or missing, or the workspace is
    /// missing
    pub fn exclude_item(&mut self, ws: &WorkspaceId, id: ItemId) -> GraphResult<()> {
        if id == ROOT_ITEM_ID {
            return Err(GraphError::RootImmutable("excluded"));
        }
        self.require_item(id)?;
        self.require_workspace(ws)?;
        if self.state().workspace(ws).is_some_and(|w| !w.excluded_item_ids.contains(&id)) {
            self.update_workspace(ws, |w| {
                w.excluded_item_ids.insert(id);
            });
        }
        Ok(())
    }

    /// Undo an exclusion
    ///
    /// # Errors
    /// Returns error if the workspace is missing
    pub fn include_item(&mut self, ws: &WorkspaceId, id: ItemId) -> GraphResult<()> {
        self.require_workspace(ws)?;
        if self.state().workspace(ws).is_some_and(|w| w.excluded_item_ids.contains(&id)) {
            self.update_workspace(ws, |w| {
                w.excluded_item_ids.remove(&id);
            });
        }
        Ok(())
    }

    /// Show a page in a workspace
    ///
    /// # Errors
    /// Returns error if `page` is not a page or the workspace is missing
    pub fn set_active_page(&mut self, ws: &WorkspaceId, page: ItemId) -> GraphResult<()> {
        self.require_page(page)?;
        self.require_workspace(ws)?;
        self.update_workspace(ws, |w| w.active_page_id = page);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Key bindings and dialog
    // ------------------------------------------------------------------

    /// Remove the binding of an action
    pub fn remove_key_binding(&mut self, action: &str) {
        if self.state().key_binding(action).is_some() {
            self.set_key_binding(action, Vec::new());
        }
    }

    /// Open a dialog on an occurrence
    pub fn open_dialog(&mut self, kind: impl Into<String>, target: Option<ItemPath>) {
        self.set_dialog(Some(DialogState {
            kind: kind.into(),
            target,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DocumentState;
    use crate::types::{CodePayload, Workspace};
    use pretty_assertions::assert_eq;
    use trellis_path::Address;

    fn store() -> Store {
        Store::new(DocumentState::fresh(1)).with_clock(|| 7)
    }

    fn child_of(store: &mut Store, parent: ItemId, text: &str) -> ItemId {
        let id = store.create_item(Payload::text(text));
        store.add_edge(parent, id, None).unwrap();
        id
    }

    #[test]
    fn create_item_is_detached_with_payload() {
        let mut store = store();
        let id = store.create_item(Payload::text("hello"));
        let item = store.state().item(id).unwrap();
        assert!(!item.has_parents());
        assert_eq!(item.timestamp, 7);
        assert_eq!(store.state().payload(id), Some(Payload::text("hello")));
        store.commit();
    }

    #[test]
    fn add_edge_updates_both_sides() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        let b = child_of(&mut store, ROOT_ITEM_ID, "b");
        let c = child_of(&mut store, a, "c");
        store.add_edge(b, c, Some(0)).unwrap();

        let c_item = store.state().item(c).unwrap();
        assert_eq!(c_item.parents.keys().copied().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(store.state().item(b).unwrap().child_item_ids, vec![c]);
        store.commit();
    }

    #[test]
    fn add_edge_rejections() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        let b = child_of(&mut store, a, "b");

        assert_eq!(store.add_edge(a, a, None), Err(GraphError::SelfEdge(a)));
        assert_eq!(store.add_edge(a, b, None), Err(GraphError::DuplicateEdge { parent: a, child: b }));
        assert_eq!(store.add_edge(b, a, None), Err(GraphError::CycleDetected { parent: b, child: a }));
        assert_eq!(store.add_edge(b, ROOT_ITEM_ID, None), Err(GraphError::RootImmutable("a child")));
        assert_eq!(store.add_edge(a, ItemId(99), None), Err(GraphError::ItemNotFound(ItemId(99))));
        store.commit();
    }

    #[test]
    fn rejected_edge_records_nothing() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        store.clear_pending();
        let _ = store.add_edge(a, a, None);
        assert!(!store.has_pending());
    }

    #[test]
    fn remove_edge_keeps_child() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        store.remove_edge(ROOT_ITEM_ID, a).unwrap();
        assert!(store.state().contains_item(a));
        assert!(!store.state().item(a).unwrap().has_parents());
        assert_eq!(store.remove_edge(ROOT_ITEM_ID, a), Err(GraphError::edge_not_found(ROOT_ITEM_ID, a)));
    }

    #[test]
    fn move_edge_keeps_metadata() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        let b = child_of(&mut store, ROOT_ITEM_ID, "b");
        let c = child_of(&mut store, a, "c");
        store.set_collapsed(a, c, true).unwrap();

        store.move_edge(a, b, c, None).unwrap();
        let c_item = store.state().item(c).unwrap();
        assert!(c_item.parents[&b].collapsed);
        assert!(!c_item.parents.contains_key(&a));
        store.commit();
    }

    #[test]
    fn move_edge_failure_changes_nothing() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        let b = child_of(&mut store, a, "b");
        let before = store.state().clone();

        assert!(matches!(store.move_edge(ROOT_ITEM_ID, b, a, None), Err(GraphError::CycleDetected { .. })));
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn reorder_child_clamps() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        let b = child_of(&mut store, ROOT_ITEM_ID, "b");
        store.reorder_child(ROOT_ITEM_ID, a, 10).unwrap();
        assert_eq!(store.state().item(ROOT_ITEM_ID).unwrap().child_item_ids, vec![b, a]);
        store.move_edge(ROOT_ITEM_ID, ROOT_ITEM_ID, a, Some(0)).unwrap();
        assert_eq!(store.state().item(ROOT_ITEM_ID).unwrap().child_item_ids, vec![a, b]);
    }

    #[test]
    fn set_payload_checks_kind() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        let old = store.set_payload(a, Payload::text("b")).unwrap();
        assert_eq!(old, Payload::text("a"));

        let err = store.set_payload(a, Payload::Code(CodePayload::default()));
        assert!(matches!(err, Err(GraphError::KindMismatch { .. })));
    }

    #[test]
    fn delete_item_cascades_to_orphans_only() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        let b = child_of(&mut store, ROOT_ITEM_ID, "b");
        let only_a = child_of(&mut store, a, "only a");
        let shared = child_of(&mut store, a, "shared");
        store.add_edge(b, shared, None).unwrap();

        let deleted = store.delete_item(a).unwrap();
        assert_eq!(deleted.iter().copied().collect::<BTreeSet<_>>(), BTreeSet::from([a, only_a]));
        assert!(store.state().contains_item(shared));
        assert_eq!(store.state().item(shared).unwrap().parents.len(), 1);
        assert!(store.state().payload(only_a).is_none());
        store.commit();
    }

    #[test]
    fn delete_item_cleans_pages_and_workspaces() {
        let mut store = store();
        let ws = WorkspaceId::generate();
        store.put_workspace(Workspace::new(ws.clone(), "w"));
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        let b = child_of(&mut store, a, "b");
        store.make_page(a).unwrap();
        store.mount_page(a, 20).unwrap();
        store.set_active_page(&ws, a).unwrap();
        store.exclude_item(&ws, b).unwrap();
        let root_path = ItemPath::new(vec![ROOT_ITEM_ID, a, b]).unwrap();
        store.set_page_selection(ROOT_ITEM_ID, Some(root_path), None).unwrap();

        store.delete_item(a).unwrap();
        let state = store.state();
        assert!(!state.is_page(a));
        assert_eq!(state.mounted_pages(), &[ROOT_ITEM_ID]);
        let workspace = state.workspace(&ws).unwrap();
        assert_eq!(workspace.active_page_id, ROOT_ITEM_ID);
        assert!(workspace.excluded_item_ids.is_empty());
        assert_eq!(state.page(ROOT_ITEM_ID).unwrap().target, None);
        store.commit();
    }

    #[test]
    fn delete_root_rejected() {
        assert_eq!(store().delete_item(ROOT_ITEM_ID), Err(GraphError::RootImmutable("deleted")));
    }

    #[test]
    fn mount_page_moves_to_front_and_truncates() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        let b = child_of(&mut store, ROOT_ITEM_ID, "b");
        store.make_page(a).unwrap();
        store.make_page(b).unwrap();
        store.mount_page(a, 2).unwrap();
        store.mount_page(b, 2).unwrap();
        assert_eq!(store.state().mounted_pages(), &[b, a]);
        store.mount_page(a, 2).unwrap();
        assert_eq!(store.state().mounted_pages(), &[a, b]);
        assert_eq!(store.mount_page(ItemId(1_000), 2), Err(GraphError::ItemNotFound(ItemId(1_000))));
    }

    #[test]
    fn remove_page_unmounts() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        store.make_page(a).unwrap();
        store.mount_page(a, 20).unwrap();
        store.remove_page(a).unwrap();
        assert_eq!(store.state().mounted_pages(), &[ROOT_ITEM_ID]);
        assert_eq!(store.remove_page(ROOT_ITEM_ID), Err(GraphError::RootImmutable("un-paged")));
        assert_eq!(store.remove_page(a), Err(GraphError::NotAPage(a)));
        store.commit();
    }

    #[test]
    fn page_selection_must_start_at_page() {
        let mut store = store();
        let a = child_of(&mut store, ROOT_ITEM_ID, "a");
        let bad = ItemPath::new(vec![a]).unwrap();
        assert!(matches!(
            store.set_page_selection(ROOT_ITEM_ID, Some(bad), None),
            Err(GraphError::InvalidPath(_))
        ));
    }

    #[test]
    fn exclude_root_rejected() {
        let mut store = store();
        let ws = WorkspaceId::generate();
        store.put_workspace(Workspace::new(ws.clone(), "w"));
        assert_eq!(store.exclude_item(&ws, ROOT_ITEM_ID), Err(GraphError::RootImmutable("excluded")));
    }

    #[test]
    fn key_binding_removal_records_field() {
        let mut store = store();
        store.clear_pending();
        store.remove_key_binding("undo");
        assert!(store.state().key_binding("undo").is_none());
        assert!(store.pending_addresses().contains(&Address::field("keyBindings")));
    }
}
