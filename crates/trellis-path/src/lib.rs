//! Trellis path addressing
//!
//! Two ways of naming a location in a Trellis document.
//!
//! # Core Concepts
//!
//! - [`Address`]: a field/key/index sequence into the nested document model.
//!   Every write goes through an address so that persistence can tell which
//!   fragments changed.
//! - [`ItemPath`]: one specific occurrence of an item inside the multi-parent
//!   graph, written as the walk from a page root down to the item.
//! - [`ItemId`]: the integer identity of an item.
//!
//! # Example
//!
//! ```rust
//! use trellis_path::{Address, ItemId, ItemPath};
//!
//! let addr = Address::field("items").child("42").child("childItemIds");
//! assert_eq!(addr.to_string(), "items.42.childItemIds");
//!
//! let path = ItemPath::new(vec![ItemId(0), ItemId(4), ItemId(7)]).unwrap();
//! assert_eq!(path.focal(), ItemId(7));
//! assert_eq!(path.parent(), Some(ItemId(4)));
//! ```

#![warn(unreachable_pub)]

mod address;
mod error;
mod item_path;

pub use address::{Address, Segment, DELIMITER};
pub use error::PathError;
pub use item_path::{ItemId, ItemPath, PathAncestors};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
