//! Chunk identity and chunk values

use crate::error::CodecError;
use crate::hash::ChunkHash;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use trellis_model::Field;
use trellis_path::DELIMITER;

/// Identity of one persisted fragment
///
/// Non-collection fields are one chunk each; collection fields are one chunk
/// per entry. Nothing finer is ever a chunk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawChunkId", into = "RawChunkId")]
pub enum ChunkId {
    /// Whole non-collection field
    Field(Field),
    /// One entry of a collection field
    Entry(Field, String),
}

impl ChunkId {
    /// Chunk id for one collection entry
    #[must_use]
    pub fn entry(field: Field, key: impl ToString) -> Self {
        Self::Entry(field, key.to_string())
    }

    /// Field the chunk belongs to
    #[inline]
    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            Self::Field(field) | Self::Entry(field, _) => *field,
        }
    }

    /// Entry key, for collection chunks
    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Field(_) => None,
            Self::Entry(_, key) => Some(key),
        }
    }

    /// Check that the id names exactly one chunk and its key is a plain
    /// file-name-safe token
    ///
    /// # Errors
    /// Returns error for a whole collection, an entry of a non-collection
    /// field, or an empty key or one holding anything but ASCII letters,
    /// digits, `-` and `_`
    pub fn check(&self) -> Result<(), CodecError> {
        match self {
            Self::Field(field) if field.is_collection() => Err(CodecError::CollectionAddress(*field)),
            Self::Entry(field, key) if !field.is_collection() || !is_plain_key(key) => {
                Err(CodecError::InvalidChunkId(self.to_string()))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn validate(self) -> Result<Self, CodecError> {
        self.check()?;
        Ok(self)
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Display for ChunkId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => write!(f, "{field}"),
            Self::Entry(field, key) => write!(f, "{field}{DELIMITER}{key}"),
        }
    }
}

impl FromStr for ChunkId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, key) = match s.split_once(DELIMITER) {
            Some((name, key)) => (name, Some(key)),
            None => (s, None),
        };
        let field = Field::from_name(name).ok_or_else(|| CodecError::InvalidChunkId(s.to_string()))?;
        match key {
            Some(key) => Self::Entry(field, key.to_string()),
            None => Self::Field(field),
        }
        .validate()
    }
}

/// Wire form of a chunk id: `"mountedPages"` or `["items", "42"]`
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawChunkId {
    Field(String),
    Entry(String, String),
}

impl TryFrom<RawChunkId> for ChunkId {
    type Error = CodecError;

    fn try_from(raw: RawChunkId) -> Result<Self, Self::Error> {
        let lookup = |name: String| Field::from_name(&name).ok_or(CodecError::UnknownField(name));
        match raw {
            RawChunkId::Field(name) => Self::Field(lookup(name)?),
            RawChunkId::Entry(name, key) => Self::Entry(lookup(name)?, key),
        }
        .validate()
    }
}

impl From<ChunkId> for RawChunkId {
    fn from(id: ChunkId) -> Self {
        match id {
            ChunkId::Field(field) => Self::Field(field.name().to_string()),
            ChunkId::Entry(field, key) => Self::Entry(field.name().to_string(), key),
        }
    }
}

/// One fragment of the document
///
/// An absent payload means the entry no longer exists (or the field is back
/// at its default) and is persisted as a tombstone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Which fragment this is
    pub address: ChunkId,
    /// Current value, `None` if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Checksum of address and payload
    pub checksum: ChunkHash,
}

impl Chunk {
    /// Create chunk and compute its checksum
    ///
    /// A JSON `null` payload is stored as absent.
    ///
    /// # Errors
    /// Returns error if the address fails [`ChunkId::check`] or the payload
    /// cannot be serialized
    pub fn new(address: ChunkId, payload: Option<Value>) -> Result<Self, CodecError> {
        address.check()?;
        let payload = payload.filter(|value| !value.is_null());
        let checksum = checksum_of(&address, payload.as_ref())?;
        Ok(Self {
            address,
            payload,
            checksum,
        })
    }

    /// Tombstone chunk for a removed entry
    ///
    /// # Errors
    /// Returns error only if hashing fails
    pub fn absent(address: ChunkId) -> Result<Self, CodecError> {
        Self::new(address, None)
    }

    /// Check if the chunk is a tombstone
    #[inline]
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.payload.is_none()
    }

    /// Recompute the checksum and compare with the stored one
    ///
    /// # Errors
    /// Returns error if the chunk was altered or corrupted
    pub fn verify(&self) -> Result<(), CodecError> {
        if checksum_of(&self.address, self.payload.as_ref())? == self.checksum {
            Ok(())
        } else {
            Err(CodecError::checksum_mismatch(&self.address))
        }
    }
}

fn checksum_of(address: &ChunkId, payload: Option<&Value>) -> Result<ChunkHash, CodecError> {
    let bytes = serde_json::to_vec(&payload).map_err(|source| CodecError::Serialize {
        id: address.to_string(),
        source,
    })?;
    Ok(ChunkHash::compute(&address.to_string(), &bytes))
}
