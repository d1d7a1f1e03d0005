//! Trellis chunk codec
//!
//! Splits a document into independently persisted fragments and rebuilds it.
//!
//! # Core Concepts
//!
//! - [`ChunkId`]: one top-level non-collection field, or one entry of a
//!   collection field. Never finer.
//! - [`Chunk`]: a chunk id, its current JSON payload (absent for removed
//!   entries) and a Blake3 [`ChunkHash`] of both.
//! - [`convert_to_chunk_id`]: maps any recorded [`Address`](trellis_path::Address)
//!   to the chunk containing it.
//! - [`inflate_state`]: rebuilds a document from a chunk set.
//!
//! # Example
//!
//! ```rust
//! use trellis_chunk::{create_all_chunks, inflate_state};
//! use trellis_model::DocumentState;
//!
//! let state = DocumentState::fresh(0);
//! let chunks = create_all_chunks(&state).unwrap();
//! assert_eq!(inflate_state(&chunks).unwrap(), state);
//! ```

#![warn(unreachable_pub)]

mod chunk;
mod codec;
mod error;
mod hash;

pub use chunk::{Chunk, ChunkId};
pub use codec::{
    apply_chunk, chunk_for, chunk_ids_for, convert_to_chunk_id, create_all_chunks, inflate_state, ChunkIter,
};
pub use error::CodecError;
pub use hash::ChunkHash;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
