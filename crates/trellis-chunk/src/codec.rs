//! Splitting a document into chunks and rebuilding it
//!
//! A document is persisted as many small fragments so that a save only has
//! to write what changed. Addresses recorded by the store are mapped to the
//! chunk that contains them; the chunk's current value is read back from the
//! state at save time.

use crate::chunk::{Chunk, ChunkId};
use crate::error::CodecError;
use std::borrow::Borrow;
use std::collections::BTreeSet;
use tracing::debug;
use trellis_model::{DocumentState, Field};
use trellis_path::{Address, Segment};

/// Chunk containing the value at `address`
///
/// Non-collection fields truncate to depth 1, collection fields to depth 2.
///
/// # Errors
/// Returns error for an empty address, an unknown field, an address of a
/// whole collection, or an entry key that is not a plain token
pub fn convert_to_chunk_id(address: &Address) -> Result<ChunkId, CodecError> {
    let mut segments = address.iter();
    let name = match segments.next() {
        None => return Err(CodecError::EmptyAddress),
        Some(Segment::Key(name)) => name,
        Some(Segment::Index(_)) => return Err(CodecError::UnknownField(address.to_string())),
    };
    let field = Field::from_name(name).ok_or_else(|| CodecError::UnknownField(name.clone()))?;
    if !field.is_collection() {
        return Ok(ChunkId::Field(field));
    }
    match segments.next() {
        None => Err(CodecError::CollectionAddress(field)),
        Some(Segment::Key(key)) => ChunkId::Entry(field, key.clone()).validate(),
        Some(Segment::Index(_)) => Err(CodecError::IndexKey(field)),
    }
}

/// Deduplicated chunk ids for a set of addresses
///
/// # Errors
/// Returns the first address that does not map to a single chunk
pub fn chunk_ids_for<'a>(addresses: impl IntoIterator<Item = &'a Address>) -> Result<BTreeSet<ChunkId>, CodecError> {
    addresses.into_iter().map(convert_to_chunk_id).collect()
}

/// Current value of one chunk
///
/// An entry that no longer exists yields an absent chunk.
///
/// # Errors
/// Returns error if the value cannot be encoded
pub fn chunk_for(state: &DocumentState, id: &ChunkId) -> Result<Chunk, CodecError> {
    let payload = match id {
        ChunkId::Field(field) => Some(state.field_value(*field)?),
        ChunkId::Entry(field, key) => state.entry_value(*field, key)?,
    };
    Chunk::new(id.clone(), payload)
}

/// Every chunk of the document: one per non-collection field, one per
/// collection entry
///
/// # Errors
/// Returns error if a value cannot be encoded
pub fn create_all_chunks(state: &DocumentState) -> Result<Vec<Chunk>, CodecError> {
    let chunks = ChunkIter::new(state)
        .map(|id| chunk_for(state, &id))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(count = chunks.len(), "encoded document");
    Ok(chunks)
}

/// Rebuild a document from chunks, starting from a blank state
///
/// Later chunks win over earlier ones with the same id. Absent chunks remove
/// the entry, or reset a field to its default.
///
/// # Errors
/// Returns error if a chunk fails its checksum or does not decode into the
/// model
pub fn inflate_state<I>(chunks: I) -> Result<DocumentState, CodecError>
where
    I: IntoIterator,
    I::Item: Borrow<Chunk>,
{
    let mut state = DocumentState::blank();
    let mut count = 0usize;
    for chunk in chunks {
        apply_chunk(&mut state, Borrow::<Chunk>::borrow(&chunk))?;
        count += 1;
    }
    debug!(count, "inflated document");
    Ok(state)
}

/// Apply a single chunk to a state
///
/// # Errors
/// Returns error if the chunk fails its checksum or does not decode
pub fn apply_chunk(state: &mut DocumentState, chunk: &Chunk) -> Result<(), CodecError> {
    chunk.verify()?;
    match (&chunk.address, &chunk.payload) {
        (ChunkId::Field(field), Some(value)) => state.set_field_value(*field, value.clone())?,
        (ChunkId::Field(field), None) => state.reset_field(*field),
        (ChunkId::Entry(field, key), Some(value)) => state.set_entry_value(*field, key, value.clone())?,
        (ChunkId::Entry(field, key), None) => {
            state.remove_entry(*field, key)?;
        }
    }
    Ok(())
}

/// Iterator over every chunk id of a document, fields in persistence order
#[derive(Debug)]
pub struct ChunkIter<'a> {
    state: &'a DocumentState,
    fields: std::array::IntoIter<Field, 12>,
    current: Option<(Field, std::vec::IntoIter<String>)>,
}

impl<'a> ChunkIter<'a> {
    /// Start iterating over `state`
    #[must_use]
    pub fn new(state: &'a DocumentState) -> Self {
        Self {
            state,
            fields: Field::ALL.into_iter(),
            current: None,
        }
    }
}

impl Iterator for ChunkIter<'_> {
    type Item = ChunkId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((field, keys)) = &mut self.current {
                if let Some(key) = keys.next() {
                    return Some(ChunkId::Entry(*field, key));
                }
                self.current = None;
            }
            let field = self.fields.next()?;
            if !field.is_collection() {
                return Some(ChunkId::Field(field));
            }
            let keys = self.state.entry_keys(field).unwrap_or_default();
            self.current = Some((field, keys.into_iter()));
        }
    }
}
