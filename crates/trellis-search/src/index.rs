//! Character posting index
//!
//! Provides [`SearchIndex`], a map from each normalized character to the
//! items whose text contains it. A query intersects the postings of its
//! characters and confirms the survivors by substring match.

use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use trellis_model::{paths, Address, DocumentState, Field, ItemId};

/// Lower-case `text` the same way for indexing and matching
fn normalize(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

fn index_chars(tracks: &[String]) -> BTreeSet<char> {
    tracks
        .iter()
        .flat_map(|track| normalize(track).chars().collect::<Vec<_>>())
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Items whose text may differ after writes at `addresses`
///
/// Returns `None` when a whole item or payload table was written and only a
/// rebuild is safe.
#[must_use]
pub fn affected_items<'a>(addresses: impl IntoIterator<Item = &'a Address>) -> Option<BTreeSet<ItemId>> {
    let mut ids = BTreeSet::new();
    for address in addresses {
        let Some(field) = address.first().and_then(Field::from_name) else {
            continue;
        };
        if field != Field::Items && !field.carries_text() {
            continue;
        }
        let key = address.segments().get(1)?.as_key()?;
        if let Ok(id) = key.parse::<ItemId>() {
            ids.insert(id);
        }
    }
    Some(ids)
}

/// Search index over the text tracks of every item
///
/// Kept in step with the document by calling [`SearchIndex::reindex_item`]
/// for every item whose text changed and [`SearchIndex::remove_item`] for
/// every deleted item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchIndex {
    /// Normalized char -> items containing it
    postings: HashMap<char, BTreeSet<ItemId>>,

    /// Item -> chars it is posted under
    item_chars: HashMap<ItemId, BTreeSet<char>>,
}

impl SearchIndex {
    /// Create empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every item of `state`
    #[must_use]
    pub fn build(state: &DocumentState) -> Self {
        let mut index = Self::new();
        for item in state.items() {
            index.reindex_item(state, item.id);
        }
        debug!(items = index.item_chars.len(), chars = index.postings.len(), "built search index");
        index
    }

    /// Bring one item's postings in line with its current text
    ///
    /// An item that no longer exists is removed.
    pub fn reindex_item(&mut self, state: &DocumentState, id: ItemId) {
        if !state.contains_item(id) {
            self.remove_item(id);
            return;
        }
        let new = index_chars(&state.text_tracks(id));
        let old = self.item_chars.remove(&id).unwrap_or_default();

        for c in old.difference(&new) {
            self.unpost(*c, id);
        }
        for c in new.difference(&old) {
            self.postings.entry(*c).or_default().insert(id);
        }
        if !new.is_empty() {
            self.item_chars.insert(id, new);
        }
    }

    /// Drop every posting of `id`
    pub fn remove_item(&mut self, id: ItemId) {
        if let Some(chars) = self.item_chars.remove(&id) {
            for c in chars {
                self.unpost(c, id);
            }
        }
    }

    fn unpost(&mut self, c: char, id: ItemId) {
        if let Some(items) = self.postings.get_mut(&c) {
            items.remove(&id);
            if items.is_empty() {
                self.postings.remove(&c);
            }
        }
    }

    /// Number of items with at least one posting
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.item_chars.len()
    }

    /// Check if nothing is indexed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_chars.is_empty()
    }

    /// Check if `id` has postings
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.item_chars.contains_key(&id)
    }

    /// Items posted under the normalized form of `c`
    #[must_use]
    pub fn posting(&self, c: char) -> Option<&BTreeSet<ItemId>> {
        c.to_lowercase().next().and_then(|c| self.postings.get(&c))
    }

    /// Items whose text contains `query`, newest first
    ///
    /// Each text track is matched on its own, case-insensitively. Items in
    /// `excluded`, and everything below them, are left out. An empty or
    /// all-whitespace query finds nothing.
    #[must_use]
    pub fn search(
        &self,
        state: &DocumentState,
        query: &str,
        excluded: &BTreeSet<ItemId>,
        limit: Option<usize>,
    ) -> Vec<ItemId> {
        let needle = normalize(query);
        let chars: BTreeSet<char> = needle.chars().filter(|c| !c.is_whitespace()).collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let mut sets = Vec::with_capacity(chars.len());
        for c in &chars {
            match self.postings.get(c) {
                Some(items) => sets.push(items),
                None => return Vec::new(),
            }
        }
        sets.sort_by_key(|items| items.len());

        let Some((smallest, rest)) = sets.split_first() else {
            return Vec::new();
        };
        let candidates: Vec<ItemId> = smallest
            .iter()
            .copied()
            .filter(|id| rest.iter().all(|items| items.contains(id)))
            .collect();

        let hidden = if excluded.is_empty() {
            Default::default()
        } else {
            paths::hidden_items(state, excluded)
        };

        let mut hits: Vec<(i64, ItemId)> = candidates
            .into_iter()
            .filter(|id| !hidden.contains(id))
            .filter(|id| {
                state
                    .text_tracks(*id)
                    .iter()
                    .any(|track| normalize(track).contains(&needle))
            })
            .filter_map(|id| state.item(id).map(|item| (item.timestamp, id)))
            .collect();
        hits.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut results: Vec<ItemId> = hits.into_iter().map(|(_, id)| id).collect();
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        debug!(query, hits = results.len(), "search");
        results
    }
}
