//! Error types for fragment storage and synchronization

use crate::identity::InstanceId;
use std::path::PathBuf;
use trellis_chunk::CodecError;
use trellis_model::IntegrityError;

/// Errors from a fragment store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O failure at a path
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File contents that are not valid JSON of the expected shape
    #[error("malformed file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Fragment that fails its checksum
    #[error("corrupt fragment {id} of instance {instance}: {source}")]
    Corrupt {
        instance: InstanceId,
        id: String,
        #[source]
        source: CodecError,
    },

    /// Fragment id that cannot name a file
    #[error("fragment id {id} cannot be stored: {source}")]
    InvalidFragmentId {
        id: String,
        #[source]
        source: CodecError,
    },

    /// Value that could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Store refused the operation
    #[error("fragment store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create malformed-file error for path
    pub fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }
}

/// Errors from a save or load
///
/// The in-memory document and its pending set are left untouched when one of
/// these is returned.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Fragment store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Fragments could not be encoded or decoded
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Absorbed document violates a structural invariant
    #[error("document from instance {instance} is inconsistent: {source}")]
    Integrity {
        instance: InstanceId,
        #[source]
        source: IntegrityError,
    },
}
