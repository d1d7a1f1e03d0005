//! Chunk codec errors

use trellis_model::{Field, StateError};

/// Errors from encoding, decoding and addressing chunks
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Address with no segments
    #[error("empty address has no chunk")]
    EmptyAddress,

    /// First segment is not a model field
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Collection address without an entry key
    #[error("address of whole collection {0} does not map to one chunk")]
    CollectionAddress(Field),

    /// Entry key that is a list index
    #[error("entry key of {0} must be a key segment")]
    IndexKey(Field),

    /// Chunk id string that does not parse
    #[error("invalid chunk id: {0}")]
    InvalidChunkId(String),

    /// Checksum string that is not 32 bytes of hex
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// Stored checksum does not match the payload
    #[error("checksum mismatch for chunk {0}")]
    ChecksumMismatch(String),

    /// Payload could not be serialized for hashing
    #[error("failed to serialize payload of {id}: {source}")]
    Serialize {
        /// Chunk id
        id: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Model rejected the chunk payload
    #[error(transparent)]
    State(#[from] StateError),
}

impl CodecError {
    /// Create a checksum mismatch error
    #[must_use]
    pub fn checksum_mismatch(id: impl ToString) -> Self {
        Self::ChecksumMismatch(id.to_string())
    }
}
