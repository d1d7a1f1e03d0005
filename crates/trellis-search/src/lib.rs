//! Trellis search
//!
//! Incremental full-text search over item text.
//!
//! # Core Concepts
//!
//! - **Postings**: every lower-cased, non-whitespace character maps to the
//!   set of items whose text contains it.
//! - **Text tracks**: the searchable strings of an item (text, web title
//!   and tab title, image caption, code, formula source). A match must lie
//!   within one track.
//! - **Incremental upkeep**: [`SearchIndex::reindex_item`] diffs an item's
//!   old and new character sets, so an edit costs only what changed.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeSet;
//! use trellis_model::{DocumentState, Payload, Store, ROOT_ITEM_ID};
//! use trellis_search::SearchIndex;
//!
//! let mut store = Store::new(DocumentState::fresh(0));
//! let id = store.create_item(Payload::text("Grocery list"));
//! store.add_edge(ROOT_ITEM_ID, id, None).unwrap();
//!
//! let index = SearchIndex::build(store.state());
//! assert_eq!(index.search(store.state(), "cery", &BTreeSet::new(), None), vec![id]);
//! ```

#![warn(unreachable_pub)]

mod index;

pub use index::{affected_items, SearchIndex};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
