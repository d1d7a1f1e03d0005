//! Trellis fragment persistence and synchronization
//!
//! Persists a document as a set of chunks and reconciles it with other
//! instances writing to the same shared storage, without a server.
//!
//! # Core Concepts
//!
//! - [`InstanceId`]: one running copy of the application. Each instance
//!   owns one fragment set and one [`InstanceMarker`] in the shared store.
//! - [`IdentityProvider`]: the instance id plus a sequence number that grows
//!   with every write ([`StaticIdentity`], [`FileIdentity`]).
//! - [`FragmentStore`]: where fragment sets live ([`MemoryStore`],
//!   [`DirectoryStore`]).
//! - [`SyncSession`]: saves a [`Store`](trellis_model::Store)'s pending
//!   chunks, or restarts from a foreign document this instance has not seen.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trellis_model::{DocumentState, Store};
//! use trellis_sync::{MemoryStore, SaveOutcome, StaticIdentity, SyncSession};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (mut session, restored) =
//!     SyncSession::load(Arc::new(MemoryStore::new()), Arc::new(StaticIdentity::new())).await.unwrap();
//! assert!(restored.is_none());
//!
//! let mut store = Store::new(DocumentState::fresh(0));
//! let outcome = session.save(&mut store).await.unwrap();
//! assert!(matches!(outcome, SaveOutcome::Bound { .. }));
//! # }
//! ```

#![warn(unreachable_pub)]

mod directory;
mod error;
mod fragment;
mod fs;
mod identity;
mod memory;
mod session;

pub use directory::DirectoryStore;
pub use error::{StoreError, SyncError};
pub use fragment::{FragmentStore, InstanceMarker};
pub use identity::{FileIdentity, IdentityProvider, InstanceId, StaticIdentity};
pub use memory::MemoryStore;
pub use session::{SaveOutcome, SyncSession};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
