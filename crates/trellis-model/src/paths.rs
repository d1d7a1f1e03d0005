//! Item path algorithms
//!
//! Navigation over occurrences of items. Because an item can sit under many
//! parents, everything here works on [`ItemPath`]s rather than bare ids.

use crate::state::DocumentState;
use std::collections::{BTreeSet, HashSet, VecDeque};
use trellis_path::{ItemId, ItemPath};

/// Check if the occurrence at `path` shows its children
///
/// A page root is always expanded; any other occurrence is expanded unless
/// the edge from its parent is collapsed.
#[must_use]
pub fn is_expanded(state: &DocumentState, path: &ItemPath) -> bool {
    let Some(parent) = path.parent() else {
        return true;
    };
    state
        .item(path.focal())
        .and_then(|item| item.parents.get(&parent))
        .is_some_and(|edge| !edge.collapsed)
}

/// Check that `path` starts at a page and walks existing child edges
#[must_use]
pub fn is_valid_path(state: &DocumentState, path: &ItemPath) -> bool {
    if !state.is_page(path.root()) || !state.contains_item(path.root()) {
        return false;
    }
    path.ids().windows(2).all(|pair| {
        state
            .item(pair[0])
            .is_some_and(|parent| parent.child_index(pair[1]).is_some())
    })
}

/// Every occurrence of `id` reachable from a mounted page
///
/// Only expanded occurrences are descended into. Results follow mounted-page
/// order, then child order.
#[must_use]
pub fn displayed_paths(state: &DocumentState, id: ItemId) -> Vec<ItemPath> {
    if !state.contains_item(id) {
        return Vec::new();
    }
    let mut relevant: HashSet<ItemId> = Ancestors::new(state, id).collect();
    relevant.insert(id);

    let mut found = Vec::new();
    let mut seen_roots = HashSet::new();
    for root in state.mounted_pages() {
        if relevant.contains(root) && seen_roots.insert(*root) {
            collect_paths(state, ItemPath::root_only(*root), id, &relevant, &mut found);
        }
    }
    found
}

fn collect_paths(
    state: &DocumentState,
    path: ItemPath,
    target: ItemId,
    relevant: &HashSet<ItemId>,
    found: &mut Vec<ItemPath>,
) {
    if path.focal() == target {
        found.push(path);
        return;
    }
    if !is_expanded(state, &path) {
        return;
    }
    let Some(item) = state.item(path.focal()) else {
        return;
    };
    for child in &item.child_item_ids {
        if relevant.contains(child) {
            collect_paths(state, path.child(*child), target, relevant, found);
        }
    }
}

fn siblings<'a>(state: &'a DocumentState, path: &ItemPath) -> Option<(&'a [ItemId], usize)> {
    let parent = state.item(path.parent()?)?;
    let index = parent.child_index(path.focal())?;
    Some((&parent.child_item_ids, index))
}

/// Occurrence of the previous sibling under the same parent
#[must_use]
pub fn previous_sibling_path(state: &DocumentState, path: &ItemPath) -> Option<ItemPath> {
    let (children, index) = siblings(state, path)?;
    let prev = index.checked_sub(1)?;
    Some(path.sibling(children[prev]))
}

/// Occurrence of the next sibling under the same parent
#[must_use]
pub fn next_sibling_path(state: &DocumentState, path: &ItemPath) -> Option<ItemPath> {
    let (children, index) = siblings(state, path)?;
    children.get(index + 1).map(|next| path.sibling(*next))
}

fn last_visible_descendant(state: &DocumentState, mut path: ItemPath) -> ItemPath {
    while is_expanded(state, &path) {
        let Some(last) = state
            .item(path.focal())
            .and_then(|item| item.child_item_ids.last().copied())
        else {
            break;
        };
        path = path.child(last);
    }
    path
}

/// Occurrence shown just above `path` in the outline
///
/// The previous sibling's deepest visible last descendant, or the parent.
#[must_use]
pub fn visual_previous_path(state: &DocumentState, path: &ItemPath) -> Option<ItemPath> {
    match previous_sibling_path(state, path) {
        Some(prev) => Some(last_visible_descendant(state, prev)),
        None => path.parent_path(),
    }
}

/// Occurrence shown just below `path` in the outline
///
/// The first visible child, else the next sibling, else the nearest
/// ancestor's next sibling.
#[must_use]
pub fn visual_next_path(state: &DocumentState, path: &ItemPath) -> Option<ItemPath> {
    if is_expanded(state, path) {
        let first = state
            .item(path.focal())
            .and_then(|item| item.child_item_ids.first().copied());
        if let Some(first) = first {
            return Some(path.child(first));
        }
    }
    let mut current = path.clone();
    loop {
        if let Some(next) = next_sibling_path(state, &current) {
            return Some(next);
        }
        current = current.parent_path()?;
    }
}

/// Contiguous run of siblings selected by an anchor/focus range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingRun {
    /// Occurrence of the common parent
    pub parent: ItemPath,
    /// Index of the first selected child
    pub start: usize,
    /// Index of the last selected child (inclusive)
    pub end: usize,
    /// Selected children in order
    pub items: Vec<ItemId>,
}

/// Resolve a range selection to a run of siblings
///
/// Both endpoints are lifted to the level just below their lowest common
/// ancestor. When one endpoint contains the other, the outer one is the
/// whole selection. Returns `None` if the endpoints share no ancestor or do
/// not resolve to children of it.
#[must_use]
pub fn selection_run(state: &DocumentState, anchor: &ItemPath, focus: &ItemPath) -> Option<SiblingRun> {
    let mut common = anchor.common_prefix(focus)?;
    if common.len() == anchor.len() || common.len() == focus.len() {
        common = common.parent_path()?;
    }
    let level = common.len();
    let parent = state.item(common.focal())?;
    let a = parent.child_index(anchor.ids()[level])?;
    let f = parent.child_index(focus.ids()[level])?;
    let (start, end) = if a <= f { (a, f) } else { (f, a) };
    Some(SiblingRun {
        items: parent.child_item_ids[start..=end].to_vec(),
        parent: common,
        start,
        end,
    })
}

/// Breadth-first walk over every ancestor of an item through all parents
///
/// Each ancestor is yielded once; the item itself is not.
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    state: &'a DocumentState,
    queue: VecDeque<ItemId>,
    seen: HashSet<ItemId>,
}

impl<'a> Ancestors<'a> {
    /// Start walking above `id`
    #[must_use]
    pub fn new(state: &'a DocumentState, id: ItemId) -> Self {
        let mut walk = Self {
            state,
            queue: VecDeque::new(),
            seen: HashSet::new(),
        };
        walk.seen.insert(id);
        walk.enqueue_parents(id);
        walk
    }

    fn enqueue_parents(&mut self, id: ItemId) {
        if let Some(item) = self.state.item(id) {
            for parent in item.parents.keys() {
                if self.seen.insert(*parent) {
                    self.queue.push_back(*parent);
                }
            }
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = ItemId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.queue.pop_front()?;
        self.enqueue_parents(id);
        Some(id)
    }
}

/// Excluded items together with all their descendants
#[must_use]
pub fn hidden_items(state: &DocumentState, excluded: &BTreeSet<ItemId>) -> HashSet<ItemId> {
    let mut hidden = HashSet::new();
    let mut stack: Vec<ItemId> = excluded.iter().copied().collect();
    while let Some(id) = stack.pop() {
        if !hidden.insert(id) {
            continue;
        }
        if let Some(item) = state.item(id) {
            stack.extend(item.child_item_ids.iter().copied());
        }
    }
    hidden
}
