//! Trellis Core - the outline engine
//!
//! Ties the document store, search index and sync session together behind
//! one context object:
//! - Commands that keep the search index in step with every text change
//! - Undo steps bracketed by `begin_command` / `commit`
//! - Start-up that restores or absorbs the shared document
//! - Device-local configuration loaded from TOML
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{Engine, EngineConfig};
//! use trellis_model::{Payload, ROOT_ITEM_ID};
//!
//! let mut engine = Engine::new(EngineConfig::default()).unwrap();
//! engine.begin_command();
//! let a = engine.create_child(ROOT_ITEM_ID, Payload::text("hello"), None).unwrap();
//! let b = engine.create_child(ROOT_ITEM_ID, Payload::text("world"), None).unwrap();
//! let c = engine.create_child(a, Payload::text("shared"), None).unwrap();
//! engine.add_parent(c, b, None).unwrap();
//! engine.commit();
//!
//! assert_eq!(engine.displayed_paths(c).len(), 2);
//! assert_eq!(engine.search("shar"), vec![c]);
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod engine;
pub mod error;

pub use config::{EngineConfig, DEFAULT_MAX_MOUNTED_PAGES, DEFAULT_WORKSPACE_NAME};
pub use engine::Engine;
pub use error::{ConfigError, EngineError, EngineResult};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving an engine
    pub use crate::{Engine, EngineConfig, EngineError, EngineResult};
    pub use trellis_model::{DocumentState, ItemId, ItemPath, Payload, ROOT_ITEM_ID};
    pub use trellis_sync::{DirectoryStore, FileIdentity, MemoryStore, SaveOutcome, StaticIdentity};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
