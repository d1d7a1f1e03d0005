//! Instance identity and local sequence numbers

use crate::error::StoreError;
use crate::fs::write_atomic;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Identity of one running copy of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Generate new random id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for InstanceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstanceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Source of this instance's id and its monotonically increasing sequence
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Id of this instance
    fn instance_id(&self) -> InstanceId;

    /// Advance and return the sequence number
    ///
    /// # Errors
    /// Returns error if the new value cannot be persisted
    async fn next_sequence(&self) -> Result<u64, StoreError>;

    /// Last sequence number handed out (0 before the first)
    fn current_sequence(&self) -> u64;
}

/// In-memory identity, lost when the process exits
#[derive(Debug)]
pub struct StaticIdentity {
    id: InstanceId,
    seq: Mutex<u64>,
}

impl StaticIdentity {
    /// Identity with a fresh random id
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(InstanceId::generate())
    }

    /// Identity with a fixed id
    #[must_use]
    pub fn with_id(id: InstanceId) -> Self {
        Self { id, seq: Mutex::new(0) }
    }
}

impl Default for StaticIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for StaticIdentity {
    fn instance_id(&self) -> InstanceId {
        self.id
    }

    async fn next_sequence(&self) -> Result<u64, StoreError> {
        let mut seq = self.seq.lock();
        *seq += 1;
        Ok(*seq)
    }

    fn current_sequence(&self) -> u64 {
        *self.seq.lock()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityRecord {
    instance_id: InstanceId,
    seq: u64,
}

/// Identity persisted as a small JSON file
///
/// The id survives restarts and the sequence never goes backwards.
#[derive(Debug)]
pub struct FileIdentity {
    path: PathBuf,
    record: Mutex<IdentityRecord>,
}

impl FileIdentity {
    /// Load identity from `path`, creating it if the file does not exist
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or created
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let record = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::malformed(&path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let record = IdentityRecord {
                    instance_id: InstanceId::generate(),
                    seq: 0,
                };
                write_atomic(&path, &serde_json::to_vec_pretty(&record)?).await?;
                tracing::info!("Created instance identity {} at {}", record.instance_id, path.display());
                record
            }
            Err(e) => return Err(StoreError::io_error(&path, e)),
        };
        Ok(Self {
            path,
            record: Mutex::new(record),
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FileIdentity {
    fn instance_id(&self) -> InstanceId {
        self.record.lock().instance_id
    }

    async fn next_sequence(&self) -> Result<u64, StoreError> {
        let next = {
            let current = *self.record.lock();
            IdentityRecord {
                seq: current.seq + 1,
                ..current
            }
        };
        write_atomic(&self.path, &serde_json::to_vec_pretty(&next)?).await?;
        *self.record.lock() = next;
        Ok(next.seq)
    }

    fn current_sequence(&self) -> u64 {
        self.record.lock().seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_identity_counts_up() {
        let identity = StaticIdentity::new();
        assert_eq!(identity.current_sequence(), 0);
        assert_eq!(identity.next_sequence().await.unwrap(), 1);
        assert_eq!(identity.next_sequence().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn file_identity_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");

        let first = FileIdentity::open(&path).await.unwrap();
        first.next_sequence().await.unwrap();
        first.next_sequence().await.unwrap();
        let id = first.instance_id();
        drop(first);

        let reopened = FileIdentity::open(&path).await.unwrap();
        assert_eq!(reopened.instance_id(), id);
        assert_eq!(reopened.current_sequence(), 2);
        assert_eq!(reopened.next_sequence().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn file_identity_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        assert!(matches!(FileIdentity::open(&path).await, Err(StoreError::Malformed { .. })));
    }

    #[test]
    fn instance_id_string_round_trip() {
        let id = InstanceId::generate();
        assert_eq!(id.to_string().parse::<InstanceId>().unwrap(), id);
    }
}
