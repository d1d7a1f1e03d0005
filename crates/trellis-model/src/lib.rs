//! Trellis document model
//!
//! In-memory model of a multi-parent outline document, and the single writer
//! that mutates it.
//!
//! # Core Concepts
//!
//! - [`Item`]: a node of the outline DAG. Items can have many parents, so
//!   the same item may appear in several places at once (transclusion).
//! - [`Payload`]: per-kind data (text, web reference, image, code, formula)
//!   kept in one table per kind.
//! - [`DocumentState`]: every table of the document, held in persistent maps
//!   so that clones are structurally shared.
//! - [`Store`]: mutation and undo engine. Records each written [`Address`]
//!   into a pending set for persistence and into the open undo frame.
//! - [`paths`]: occurrence-level navigation with [`ItemPath`].
//!
//! # Example
//!
//! ```rust
//! use trellis_model::{paths, DocumentState, Payload, Store, ROOT_ITEM_ID};
//!
//! let mut store = Store::new(DocumentState::fresh(0));
//! store.save_snapshot_for_undo();
//! let a = store.create_item(Payload::text("hello"));
//! store.add_edge(ROOT_ITEM_ID, a, None).unwrap();
//! store.commit();
//!
//! assert_eq!(paths::displayed_paths(store.state(), a).len(), 1);
//! store.undo();
//! assert!(!store.state().contains_item(a));
//! ```

#![warn(unreachable_pub)]

mod error;
mod graph;
pub mod paths;
mod state;
mod store;
mod types;

pub use error::{GraphError, GraphResult, IntegrityError, StateError};
pub use paths::{Ancestors, SiblingRun};
pub use state::{DocumentState, Field};
pub use store::{Store, DEFAULT_UNDO_DEPTH};
pub use types::{
    CodePayload, DialogState, DisplayMode, Edge, FormulaPayload, ImagePayload, InvalidWorkspaceId,
    Item, ItemKind, Page, Payload, TextPayload, WebPayload, Workspace, WorkspaceId, ROOT_ITEM_ID,
};

pub use trellis_path::{Address, ItemId, ItemPath};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
