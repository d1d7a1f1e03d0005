//! Fragment storage interface and instance markers

use crate::error::StoreError;
use crate::identity::InstanceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trellis_chunk::{Chunk, ChunkId};

/// Written by an instance after every successful fragment write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceMarker {
    /// Writer
    pub instance_id: InstanceId,
    /// Writer's sequence number at the time of the write
    pub seq: u64,
    /// Wall-clock time of the write
    pub written_at: DateTime<Utc>,
    /// Highest sequence of each foreign instance the writer has absorbed
    #[serde(default)]
    pub observed: BTreeMap<InstanceId, u64>,
}

impl InstanceMarker {
    /// Check if this marker announces a write `observed` has not seen
    #[must_use]
    pub fn is_unseen_by(&self, observed: &BTreeMap<InstanceId, u64>) -> bool {
        self.seq > observed.get(&self.instance_id).copied().unwrap_or(0)
    }
}

/// Shared storage of per-instance fragment sets
///
/// Each instance owns one fragment set and one marker. Instances only ever
/// write their own set, and read the others'.
#[async_trait::async_trait]
pub trait FragmentStore: Send + Sync {
    /// Ids of every fragment stored for `instance`
    async fn list_fragments(&self, instance: InstanceId) -> Result<Vec<ChunkId>, StoreError>;

    /// One fragment, verified against its checksum
    async fn read_fragment(&self, instance: InstanceId, id: &ChunkId) -> Result<Option<Chunk>, StoreError>;

    /// Insert or overwrite fragments of `instance`
    async fn write_fragments(&self, instance: InstanceId, chunks: &[Chunk]) -> Result<(), StoreError>;

    /// Make `chunks` the complete fragment set of `instance`
    async fn replace_fragments(&self, instance: InstanceId, chunks: &[Chunk]) -> Result<(), StoreError>;

    /// Markers of every instance that has written
    async fn read_instance_markers(&self) -> Result<Vec<InstanceMarker>, StoreError>;

    /// Publish the marker of `marker.instance_id`
    async fn write_instance_marker(&self, marker: &InstanceMarker) -> Result<(), StoreError>;

    /// Every fragment of `instance`
    async fn read_all_fragments(&self, instance: InstanceId) -> Result<Vec<Chunk>, StoreError> {
        let mut chunks = Vec::new();
        for id in self.list_fragments(instance).await? {
            if let Some(chunk) = self.read_fragment(instance, &id).await? {
                chunks.push(chunk);
            }
        }
        Ok(chunks)
    }
}
