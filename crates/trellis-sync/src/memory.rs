//! In-process fragment store

use crate::error::StoreError;
use crate::fragment::{FragmentStore, InstanceMarker};
use crate::identity::InstanceId;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use trellis_chunk::{Chunk, ChunkId};

#[derive(Debug, Default)]
struct Shelves {
    fragments: BTreeMap<InstanceId, BTreeMap<ChunkId, Chunk>>,
    markers: BTreeMap<InstanceId, InstanceMarker>,
}

/// Fragment store held in memory
///
/// Clones share the same contents, so several simulated instances can talk
/// through one store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shelves: Arc<Mutex<Shelves>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail until switched back
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of fragments stored for `instance`
    #[must_use]
    pub fn fragment_count(&self, instance: InstanceId) -> usize {
        self.shelves
            .lock()
            .fragments
            .get(&instance)
            .map_or(0, BTreeMap::len)
    }

    /// Overwrite a stored fragment without any checks
    pub fn tamper(&self, instance: InstanceId, chunk: Chunk) {
        self.shelves
            .lock()
            .fragments
            .entry(instance)
            .or_default()
            .insert(chunk.address.clone(), chunk);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("writes disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl FragmentStore for MemoryStore {
    async fn list_fragments(&self, instance: InstanceId) -> Result<Vec<ChunkId>, StoreError> {
        Ok(self
            .shelves
            .lock()
            .fragments
            .get(&instance)
            .map(|set| set.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn read_fragment(&self, instance: InstanceId, id: &ChunkId) -> Result<Option<Chunk>, StoreError> {
        let chunk = self
            .shelves
            .lock()
            .fragments
            .get(&instance)
            .and_then(|set| set.get(id).cloned());
        if let Some(chunk) = &chunk {
            chunk.verify().map_err(|source| StoreError::Corrupt {
                instance,
                id: id.to_string(),
                source,
            })?;
        }
        Ok(chunk)
    }

    async fn write_fragments(&self, instance: InstanceId, chunks: &[Chunk]) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut shelves = self.shelves.lock();
        let set = shelves.fragments.entry(instance).or_default();
        for chunk in chunks {
            set.insert(chunk.address.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn replace_fragments(&self, instance: InstanceId, chunks: &[Chunk]) -> Result<(), StoreError> {
        self.check_writable()?;
        let set = chunks
            .iter()
            .map(|chunk| (chunk.address.clone(), chunk.clone()))
            .collect();
        self.shelves.lock().fragments.insert(instance, set);
        Ok(())
    }

    async fn read_instance_markers(&self) -> Result<Vec<InstanceMarker>, StoreError> {
        Ok(self.shelves.lock().markers.values().cloned().collect())
    }

    async fn write_instance_marker(&self, marker: &InstanceMarker) -> Result<(), StoreError> {
        self.check_writable()?;
        self.shelves
            .lock()
            .markers
            .insert(marker.instance_id, marker.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_model::Field;

    fn chunk(key: u64) -> Chunk {
        Chunk::new(ChunkId::entry(Field::TextItems, key), Some(serde_json::json!({ "text": "x" }))).unwrap()
    }

    #[tokio::test]
    async fn clones_share_contents() {
        let store = MemoryStore::new();
        let other = store.clone();
        let me = InstanceId::generate();
        store.write_fragments(me, &[chunk(1), chunk(2)]).await.unwrap();
        assert_eq!(other.list_fragments(me).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn replace_drops_old_fragments() {
        let store = MemoryStore::new();
        let me = InstanceId::generate();
        store.write_fragments(me, &[chunk(1), chunk(2)]).await.unwrap();
        store.replace_fragments(me, &[chunk(3)]).await.unwrap();
        assert_eq!(store.list_fragments(me).await.unwrap(), vec![ChunkId::entry(Field::TextItems, 3)]);
    }

    #[tokio::test]
    async fn failing_writes_change_nothing() {
        let store = MemoryStore::new();
        let me = InstanceId::generate();
        store.set_fail_writes(true);
        assert!(store.write_fragments(me, &[chunk(1)]).await.is_err());
        assert_eq!(store.fragment_count(me), 0);
    }

    #[tokio::test]
    async fn tampered_fragment_reads_as_corrupt() {
        let store = MemoryStore::new();
        let me = InstanceId::generate();
        let mut bad = chunk(1);
        bad.payload = Some(serde_json::json!({ "text": "changed" }));
        store.tamper(me, bad);
        let result = store.read_fragment(me, &ChunkId::entry(Field::TextItems, 1)).await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }
}
